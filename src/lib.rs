//! # Latente: Variational Autoencoder Core
//!
//! Latente implements the probabilistic forward pass of a variational
//! autoencoder on a small tape-based autograd engine: encode observations
//! into a diagonal-Gaussian posterior, sample it with the reparameterization
//! trick, decode, and score the result with the evidence lower bound.
//!
//! ## Architecture
//!
//! - **autograd**: Shaped tensors and reverse-mode differentiation
//! - **nn**: Linear layers, the two-layer feature mapper, the latent Gaussian layer
//! - **vae**: The assembled model: ELBO, loss, unconditional generation
//! - **noise**: Random sources for reparameterization and prior draws
//! - **monitor**: Diagnostics and the sinks that record them
//! - **config**: Declarative YAML configuration
//! - **io**: Checkpoint saving and loading (JSON, YAML formats)
//!
//! ## Example
//!
//! ```
//! use latente::noise::GaussianNoise;
//! use latente::{backward, Tensor, Vae, VaeConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let vae = Vae::new(VaeConfig::new(8, 2).with_hidden_dim(16), &mut StdRng::seed_from_u64(0))?;
//! let x = Tensor::with_shape(vec![0.25; 4 * 8].into(), vec![4, 8], false);
//!
//! let mut out = vae.forward(&x, 1, true, &mut GaussianNoise::seeded(7))?;
//! backward(&mut out.loss, None);
//!
//! assert!(vae.parameters().iter().all(|p| p.grad().is_some()));
//! # Ok::<(), latente::Error>(())
//! ```

pub mod autograd;
pub mod config;
pub mod io;
pub mod monitor;
pub mod nn;
pub mod noise;
pub mod vae;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use config::VaeConfig;
pub use error::{Error, Result};
pub use vae::{ElboOutput, Vae, VaeOutput};
