//! Declarative YAML configuration
//!
//! # Example
//!
//! ```yaml
//! dim_in: 784
//! dim_latent: 2
//! hidden_dim: 256
//! n_samples: 1
//! image_shape: [28, 28]
//! init: kaiming_uniform
//! ```

mod load;
mod schema;
mod validate;

#[cfg(test)]
mod tests;

pub use crate::nn::WeightInit;
pub use load::load_config;
pub use schema::{VaeConfig, DEFAULT_HIDDEN_DIM};
pub use validate::{validate_config, ValidationError};
