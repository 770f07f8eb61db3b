//! Fully-connected affine layer

use crate::autograd::{add_bias, matmul};
use crate::Tensor;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weight initialization scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// U(-1/√d_in, 1/√d_in) for weights and biases
    #[default]
    KaimingUniform,
    /// All parameters zero; the layer outputs zeros for any input
    Zeros,
}

/// Affine map `y = x W + b` applied to each row of a `[n, d_in]` batch
///
/// `W` is stored row-major as `[d_in * d_out]`, `b` as `[d_out]`.
pub struct Linear {
    weight: Tensor,
    bias: Tensor,
    d_in: usize,
    d_out: usize,
}

impl Linear {
    /// Create a layer with freshly initialized, trainable parameters
    pub fn new<R: Rng>(d_in: usize, d_out: usize, init: WeightInit, rng: &mut R) -> Self {
        let (weight, bias) = match init {
            WeightInit::KaimingUniform => {
                let bound = 1.0 / (d_in.max(1) as f32).sqrt();
                let weight: Vec<f32> = (0..d_in * d_out)
                    .map(|_| rng.random_range(-bound..bound))
                    .collect();
                let bias: Vec<f32> = (0..d_out).map(|_| rng.random_range(-bound..bound)).collect();
                (weight, bias)
            }
            WeightInit::Zeros => (vec![0.0; d_in * d_out], vec![0.0; d_out]),
        };

        Self {
            weight: Tensor::with_shape(weight.into(), vec![d_in, d_out], true),
            bias: Tensor::with_shape(bias.into(), vec![d_out], true),
            d_in,
            d_out,
        }
    }

    /// Build a layer from existing parameter tensors
    ///
    /// # Panics
    /// Panics if the tensor sizes do not match `d_in` and `d_out`.
    pub fn from_parameters(weight: Tensor, bias: Tensor, d_in: usize, d_out: usize) -> Self {
        assert_eq!(weight.len(), d_in * d_out, "Weight size must match d_in * d_out");
        assert_eq!(bias.len(), d_out, "Bias size must match d_out");
        Self {
            weight,
            bias,
            d_in,
            d_out,
        }
    }

    /// Forward pass on a `[n, d_in]` batch, returning `[n, d_out]`
    pub fn forward(&self, x: &Tensor) -> Tensor {
        assert_eq!(
            x.shape().last().copied(),
            Some(self.d_in),
            "Input trailing dimension must match d_in"
        );
        let rows = x.len() / self.d_in;
        let xw = matmul(x, &self.weight, rows, self.d_in, self.d_out);
        add_bias(&xw, &self.bias)
    }

    /// Weight matrix `[d_in, d_out]`
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Mutable weight access (for optimizer updates)
    pub fn weight_mut(&mut self) -> &mut Tensor {
        &mut self.weight
    }

    /// Bias vector `[d_out]`
    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// Mutable bias access (for optimizer updates)
    pub fn bias_mut(&mut self) -> &mut Tensor {
        &mut self.bias
    }

    /// Trainable parameters (weight, bias)
    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    /// Mutable trainable parameters, same order as [`Linear::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }

    /// Get input dimension
    pub fn d_in(&self) -> usize {
        self.d_in
    }

    /// Get output dimension
    pub fn d_out(&self) -> usize {
        self.d_out
    }
}
