//! Variational autoencoder
//!
//! [`Vae`] wires a ReLU-headed encoder, a [`LatentGaussianLayer`] and a
//! sigmoid-headed decoder together and evaluates the evidence lower bound
//!
//! ```text
//! ELBO(x) = -Σ_d BCE(p_d, x_d) - KL(q(z|x) ‖ N(0, I))
//! ```
//!
//! per observation and latent draw. [`Vae::forward`] turns it into a training
//! loss. Stepping parameters is left to the caller.
//!
//! # Example
//!
//! ```
//! use latente::noise::GaussianNoise;
//! use latente::{Tensor, Vae, VaeConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let config = VaeConfig::new(16, 2).with_hidden_dim(32).with_image_shape(4, 4);
//! let vae = Vae::new(config, &mut StdRng::seed_from_u64(0))?;
//!
//! let x = Tensor::with_shape(vec![0.5; 3 * 16].into(), vec![3, 16], false);
//! let out = vae.elbo(&x, 2, &mut GaussianNoise::seeded(1))?;
//!
//! assert_eq!(out.elbo.shape(), &[3, 2]);
//! assert_eq!(out.diagnostics.image.dim(), (4, 4));
//! # Ok::<(), latente::Error>(())
//! ```
//!
//! [`LatentGaussianLayer`]: crate::nn::LatentGaussianLayer

mod model;
mod output;

#[cfg(test)]
mod tests;

pub use model::Vae;
pub use output::{ElboOutput, VaeOutput};
