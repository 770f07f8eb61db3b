//! Dimension-preserving two-layer transform (encoder/decoder body)
//!
//! Maps `[..., d_in] -> [..., d_out]`: every leading (batch, sample) axis is
//! kept, only the trailing feature axis is transformed.

use super::linear::{Linear, WeightInit};
use crate::autograd::{relu, reshape, sigmoid};
use crate::Tensor;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Output nonlinearity of a [`FeatureMapper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Rectified linear output (unbounded, non-negative)
    Relu,
    /// Logistic sigmoid output, bounded to (0, 1)
    Sigmoid,
}

impl Activation {
    /// Resolve an activation by name
    ///
    /// `"relu"` selects [`Activation::Relu`]; every other name selects
    /// [`Activation::Sigmoid`].
    pub fn from_name(name: &str) -> Self {
        if name == "relu" {
            Activation::Relu
        } else {
            Activation::Sigmoid
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
        }
    }

    fn apply(&self, x: &Tensor) -> Tensor {
        match self {
            Activation::Relu => relu(x),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

/// Two affine layers with a ReLU between them and a selectable output activation
pub struct FeatureMapper {
    fc1: Linear,
    fc2: Linear,
    activation: Activation,
}

impl FeatureMapper {
    /// Create a new mapper `d_in -> d_h -> d_out`
    pub fn new<R: Rng>(
        d_in: usize,
        d_h: usize,
        d_out: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        Self {
            fc1: Linear::new(d_in, d_h, init, rng),
            fc2: Linear::new(d_h, d_out, init, rng),
            activation,
        }
    }

    /// Build a mapper from existing layers
    ///
    /// # Panics
    /// Panics if `fc1`'s output width differs from `fc2`'s input width.
    pub fn from_layers(fc1: Linear, fc2: Linear, activation: Activation) -> Self {
        assert_eq!(fc1.d_out(), fc2.d_in(), "Hidden widths must agree");
        Self {
            fc1,
            fc2,
            activation,
        }
    }

    /// Apply the transform to `[..., d_in]`, returning `[..., d_out]`
    ///
    /// # Panics
    /// Panics if the trailing dimension of `x` is not `d_in`.
    pub fn apply(&self, x: &Tensor) -> Tensor {
        let (&d, lead) = x
            .shape()
            .split_last()
            .unwrap_or_else(|| panic!("FeatureMapper input must have a feature axis"));
        assert_eq!(d, self.d_in(), "Input trailing dimension must match d_in");

        let rows = lead.iter().product::<usize>();
        let flat = reshape(x, &[rows, d]);

        let hidden = relu(&self.fc1.forward(&flat));
        let out = self.activation.apply(&self.fc2.forward(&hidden));

        let mut out_shape = lead.to_vec();
        out_shape.push(self.d_out());
        reshape(&out, &out_shape)
    }

    /// Output activation
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Input layer
    pub fn fc1(&self) -> &Linear {
        &self.fc1
    }

    /// Output layer
    pub fn fc2(&self) -> &Linear {
        &self.fc2
    }

    /// Trainable parameters in layer order
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.fc1.parameters();
        params.extend(self.fc2.parameters());
        params
    }

    /// Mutable trainable parameters in layer order
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.fc1.parameters_mut();
        params.extend(self.fc2.parameters_mut());
        params
    }

    /// Get input dimension
    pub fn d_in(&self) -> usize {
        self.fc1.d_in()
    }

    /// Get hidden dimension
    pub fn d_h(&self) -> usize {
        self.fc1.d_out()
    }

    /// Get output dimension
    pub fn d_out(&self) -> usize {
        self.fc2.d_out()
    }
}
