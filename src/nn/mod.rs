//! Neural building blocks for the variational autoencoder
//!
//! - **Linear**: affine map on row batches
//! - **FeatureMapper**: two-layer, dimension-preserving transform
//! - **LatentGaussianLayer**: posterior heads, reparameterized sampling, KL

mod feature_mapper;
mod gaussian;
mod linear;

pub use feature_mapper::{Activation, FeatureMapper};
pub use gaussian::{LatentGaussianLayer, LatentSample, Posterior};
pub use linear::{Linear, WeightInit};
