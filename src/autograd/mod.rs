//! Tape-based autograd engine
//!
//! Provides reverse-mode automatic differentiation over shaped tensors.
//! Every op records a [`BackwardOp`] on its result; [`backward`] walks the
//! recorded graph from the loss in topological order.

mod backward;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use ops::*;
pub use tensor::Tensor;

use std::collections::HashSet;

/// Perform backward pass on a tensor
///
/// Seeds the gradient of `tensor` (ones when `grad_output` is `None`) and runs
/// every reachable backward op exactly once, parents before children, so a
/// tensor consumed by several ops receives the sum of their contributions.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        // Initialize with ones for scalar loss
        let ones = ndarray::Array1::ones(tensor.data().len());
        tensor.set_grad(ones);
    }

    for node in topological_order(tensor) {
        if let Some(op) = node.backward_op() {
            op.backward();
        }
    }
}

/// Nodes reachable from `root`, each listed before any of its inputs
fn topological_order(root: &Tensor) -> Vec<Tensor> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.node_id()) {
            continue;
        }
        let inputs = node.backward_op().map(|op| op.inputs()).unwrap_or_default();
        stack.push((node, true));
        for input in inputs {
            if !visited.contains(&input.node_id()) {
                stack.push((input, false));
            }
        }
    }

    order.reverse();
    order
}
