//! Shaped tensor with gradient tracking
//!
//! Data is stored as a flat row-major buffer; the shape is carried alongside
//! so ops can broadcast over batch and sample axes.

use super::BackwardOp;
use ndarray::{Array1, ArrayD, IxDyn};
use std::cell::RefCell;
use std::rc::Rc;

/// Shaped `f32` tensor that records how it was computed
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    shape: Vec<usize>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a new 1-D tensor with data
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        let shape = vec![data.len()];
        Self::with_shape(data, shape, requires_grad)
    }

    /// Create a tensor from flat row-major data and an explicit shape
    ///
    /// # Panics
    /// Panics if the element count does not match the shape.
    pub fn with_shape(data: Array1<f32>, shape: Vec<usize>, requires_grad: bool) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "Data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Self {
            data,
            shape,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a tensor from an n-dimensional array, keeping its shape
    pub fn from_array(array: ArrayD<f32>, requires_grad: bool) -> Self {
        let shape = array.shape().to_vec();
        let data: Array1<f32> = array.iter().copied().collect();
        Self::with_shape(data, shape, requires_grad)
    }

    /// Create a 0-dimensional tensor holding one value
    pub fn scalar(value: f32) -> Self {
        Self::with_shape(Array1::from(vec![value]), Vec::new(), false)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(size), requires_grad)
    }

    /// Create a tensor filled with ones
    pub fn ones(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::ones(size), requires_grad)
    }

    /// Get reference to data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Get mutable reference to data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Shape of the tensor (empty for a scalar)
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Copy the data out as an n-dimensional array
    pub fn to_array(&self) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.to_vec())
            .unwrap_or_else(|_| unreachable!("shape and length are checked at construction"))
    }

    /// Value of a single-element tensor
    ///
    /// # Panics
    /// Panics if the tensor holds more than one element.
    pub fn item(&self) -> f32 {
        assert_eq!(self.len(), 1, "item() requires a single-element tensor");
        self.data[0]
    }

    /// Copy of this tensor cut off from the graph
    pub fn detach(&self) -> Self {
        Self::with_shape(self.data.clone(), self.shape.clone(), false)
    }

    /// Copy of the gradient, `None` until a backward pass reaches this tensor
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Set gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add `grad` to the stored gradient, initializing it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing = &*existing + &grad;
        } else {
            *grad_ref = Some(grad);
        }
    }

    /// Zero out gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Whether backward passes propagate into this tensor
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Shared gradient cell; backward ops write into it
    pub fn grad_cell(&self) -> Rc<RefCell<Option<Array1<f32>>>> {
        self.grad.clone()
    }

    /// Set backward operation
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Op that produced this tensor, if it is not a leaf
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Identity of the graph node; clones share it
    pub(crate) fn node_id(&self) -> usize {
        Rc::as_ptr(&self.grad) as *const () as usize
    }

    /// Get size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .field("grad", &self.grad.borrow())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
