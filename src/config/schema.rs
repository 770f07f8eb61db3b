//! YAML schema for model configuration

use crate::nn::WeightInit;
use serde::{Deserialize, Serialize};

/// Hidden width of the encoder and decoder bodies
pub const DEFAULT_HIDDEN_DIM: usize = 256;

fn default_hidden_dim() -> usize {
    DEFAULT_HIDDEN_DIM
}

fn default_n_samples() -> usize {
    1
}

/// Variational autoencoder configuration
///
/// ```yaml
/// dim_in: 784
/// dim_latent: 2
/// image_shape: [28, 28]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaeConfig {
    /// Flattened observation length
    pub dim_in: usize,

    /// Latent dimensionality
    pub dim_latent: usize,

    /// Hidden width of encoder and decoder
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,

    /// Default number of latent draws per observation
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,

    /// 2-D layout `[height, width]` used for image diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_shape: Option<[usize; 2]>,

    /// Parameter initialization
    #[serde(default)]
    pub init: WeightInit,
}

impl VaeConfig {
    /// Create a configuration with default hidden width and one sample
    pub fn new(dim_in: usize, dim_latent: usize) -> Self {
        Self {
            dim_in,
            dim_latent,
            hidden_dim: DEFAULT_HIDDEN_DIM,
            n_samples: 1,
            image_shape: None,
            init: WeightInit::default(),
        }
    }

    /// Set the hidden width
    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    /// Set the default number of latent draws
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Set the image layout used for diagnostics
    pub fn with_image_shape(mut self, height: usize, width: usize) -> Self {
        self.image_shape = Some([height, width]);
        self
    }

    /// Set parameter initialization
    pub fn with_init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }
}
