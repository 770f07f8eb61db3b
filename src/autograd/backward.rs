//! Backward operation trait

use super::Tensor;

/// Trait for backward pass operations
///
/// An op only moves its result gradient into its direct inputs; the graph
/// walk in [`backward`](super::backward) decides the order.
pub trait BackwardOp {
    /// Tensors this op propagates gradient into
    fn inputs(&self) -> Vec<Tensor>;

    /// Perform backward pass for this node
    fn backward(&self);
}
