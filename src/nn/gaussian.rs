//! Diagonal-Gaussian latent layer with reparameterized sampling
//!
//! Maps encoder features to the parameters of q(z|x) = N(μ, diag(σ²)) and
//! draws z = μ + σ·ε with ε ~ N(0, I). The variance is parameterized in log
//! space, σ = exp(0.5·log σ²), so any real-valued layer output is a valid
//! (strictly positive) variance.
//!
//! The posterior parameters are returned to the caller with the samples; the
//! layer itself holds nothing between calls, and the KL term is a pure
//! function of the returned [`Posterior`].

use super::linear::{Linear, WeightInit};
use crate::autograd::{add, broadcast_samples, exp, gaussian_kl, mul, scale};
use crate::noise::NoiseSource;
use crate::Tensor;
use rand::Rng;

/// Parameters of a diagonal Gaussian posterior, both `[B, L]`
#[derive(Debug, Clone)]
pub struct Posterior {
    /// Posterior mean μ
    pub mean: Tensor,
    /// Posterior log-variance log σ²
    pub log_var: Tensor,
}

impl Posterior {
    /// Standard deviation σ = exp(0.5·log σ²)
    pub fn std_dev(&self) -> Tensor {
        exp(&scale(&self.log_var, 0.5))
    }

    /// KL(q ‖ N(0, I)) per observation, shape `[B]`
    pub fn kl_divergence(&self) -> Tensor {
        gaussian_kl(&self.mean, &self.log_var)
    }

    /// Batch size B
    pub fn batch_size(&self) -> usize {
        self.mean.shape()[0]
    }

    /// Latent dimension L
    pub fn latent_dim(&self) -> usize {
        self.mean.shape()[1]
    }
}

/// Reparameterized draws together with the posterior that produced them
#[derive(Debug, Clone)]
pub struct LatentSample {
    /// Samples `[B, n_samples, L]`
    pub z: Tensor,
    /// Posterior parameters `[B, L]`
    pub posterior: Posterior,
}

/// Linear heads for μ and log σ² over shared input features
pub struct LatentGaussianLayer {
    mean_layer: Linear,
    log_var_layer: Linear,
}

impl LatentGaussianLayer {
    /// Create a new layer `d_in -> (μ, log σ²) ∈ ℝ^dim_latent × ℝ^dim_latent`
    pub fn new<R: Rng>(d_in: usize, dim_latent: usize, init: WeightInit, rng: &mut R) -> Self {
        Self {
            mean_layer: Linear::new(d_in, dim_latent, init, rng),
            log_var_layer: Linear::new(d_in, dim_latent, init, rng),
        }
    }

    /// Build a layer from existing heads
    ///
    /// # Panics
    /// Panics if the two heads disagree on input or output width.
    pub fn from_layers(mean_layer: Linear, log_var_layer: Linear) -> Self {
        assert_eq!(mean_layer.d_in(), log_var_layer.d_in(), "Heads must share d_in");
        assert_eq!(mean_layer.d_out(), log_var_layer.d_out(), "Heads must share dim_latent");
        Self {
            mean_layer,
            log_var_layer,
        }
    }

    /// Compute the posterior parameters for `x: [B, d_in]`
    pub fn posterior(&self, x: &Tensor) -> Posterior {
        Posterior {
            mean: self.mean_layer.forward(x),
            log_var: self.log_var_layer.forward(x),
        }
    }

    /// Draw `n_samples` reparameterized latents per observation
    ///
    /// Returns samples `[B, n_samples, L]` and the posterior they came from.
    pub fn sample<N: NoiseSource + ?Sized>(
        &self,
        x: &Tensor,
        n_samples: usize,
        noise: &mut N,
    ) -> LatentSample {
        let posterior = self.posterior(x);
        let shape = vec![posterior.batch_size(), n_samples, posterior.latent_dim()];
        let count = shape.iter().product::<usize>();
        let epsilon = Tensor::with_shape(noise.standard_normal(count), shape, false);

        let z = Self::reparameterize(&posterior, &epsilon);
        LatentSample { z, posterior }
    }

    /// z = μ[:, None, :] + σ[:, None, :]·ε for `ε: [B, n, L]`
    ///
    /// Gradient flows through μ and σ; ε is treated as a constant.
    ///
    /// # Panics
    /// Panics if ε's batch or latent axis disagrees with the posterior.
    pub fn reparameterize(posterior: &Posterior, epsilon: &Tensor) -> Tensor {
        assert_eq!(epsilon.ndim(), 3, "epsilon must be [B, n, L]");
        assert_eq!(epsilon.shape()[0], posterior.batch_size(), "epsilon batch mismatch");
        assert_eq!(epsilon.shape()[2], posterior.latent_dim(), "epsilon latent mismatch");
        let n = epsilon.shape()[1];

        let mean = broadcast_samples(&posterior.mean, n);
        let dev = broadcast_samples(&posterior.std_dev(), n);
        add(&mean, &mul(&dev, epsilon))
    }

    /// KL divergence of `posterior` against N(0, I), shape `[B]`
    pub fn kl_divergence(posterior: &Posterior) -> Tensor {
        posterior.kl_divergence()
    }

    /// Mean head
    pub fn mean_layer(&self) -> &Linear {
        &self.mean_layer
    }

    /// Log-variance head
    pub fn log_var_layer(&self) -> &Linear {
        &self.log_var_layer
    }

    /// Trainable parameters (mean head, then log-variance head)
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.mean_layer.parameters();
        params.extend(self.log_var_layer.parameters());
        params
    }

    /// Mutable trainable parameters, same order as [`LatentGaussianLayer::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.mean_layer.parameters_mut();
        params.extend(self.log_var_layer.parameters_mut());
        params
    }

    /// Input feature width
    pub fn d_in(&self) -> usize {
        self.mean_layer.d_in()
    }

    /// Latent dimension
    pub fn dim_latent(&self) -> usize {
        self.mean_layer.d_out()
    }
}
