//! Encoder, latent layer and decoder assembled into one model

use super::output::{ElboOutput, VaeOutput};
use crate::autograd::{
    add, binary_cross_entropy, broadcast_samples, mean, reshape, scale, sum_last_axis,
};
use crate::config::{validate_config, VaeConfig};
use crate::error::{Error, Result};
use crate::monitor::Diagnostics;
use crate::nn::{Activation, FeatureMapper, LatentGaussianLayer, LatentSample, WeightInit};
use crate::noise::NoiseSource;
use crate::Tensor;
use ndarray::Array2;
use rand::Rng;

/// Parameter names in [`Vae::parameters`] order
const PARAMETER_NAMES: [&str; 12] = [
    "encoder.fc1.weight",
    "encoder.fc1.bias",
    "encoder.fc2.weight",
    "encoder.fc2.bias",
    "gaussian.mean.weight",
    "gaussian.mean.bias",
    "gaussian.log_var.weight",
    "gaussian.log_var.bias",
    "decoder.fc1.weight",
    "decoder.fc1.bias",
    "decoder.fc2.weight",
    "decoder.fc2.bias",
];

/// Variational autoencoder with a diagonal-Gaussian posterior and a
/// Bernoulli decoder
///
/// ```text
/// x ─► encoder (ReLU head) ─► μ, log σ² ─► z = μ + σ·ε ─► decoder (sigmoid head) ─► p
/// ```
pub struct Vae {
    config: VaeConfig,
    encoder: FeatureMapper,
    gaussian: LatentGaussianLayer,
    decoder: FeatureMapper,
}

impl Vae {
    /// Build a model from a validated configuration
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] when the configuration is invalid.
    pub fn new<R: Rng>(config: VaeConfig, rng: &mut R) -> Result<Self> {
        validate_config(&config).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

        let hidden = config.hidden_dim;
        let init = config.init;
        let encoder = FeatureMapper::new(
            config.dim_in,
            hidden,
            hidden,
            Activation::Relu,
            init,
            rng,
        );
        let gaussian = LatentGaussianLayer::new(hidden, config.dim_latent, init, rng);
        let decoder = FeatureMapper::new(
            config.dim_latent,
            hidden,
            config.dim_in,
            Activation::Sigmoid,
            init,
            rng,
        );

        Ok(Self {
            config,
            encoder,
            gaussian,
            decoder,
        })
    }

    /// Evaluate the per-sample ELBO of a batch
    ///
    /// `x` has shape `[B, ...]` with the trailing axes holding `dim_in`
    /// values in [0, 1]. Each observation gets `n_samples` latent draws.
    ///
    /// # Errors
    /// - [`Error::ShapeMismatch`] if an observation does not hold `dim_in` values
    /// - [`Error::InvalidParameter`] if `n_samples` is zero or the batch is empty
    pub fn elbo<N: NoiseSource + ?Sized>(
        &self,
        x: &Tensor,
        n_samples: usize,
        noise: &mut N,
    ) -> Result<ElboOutput> {
        if n_samples == 0 {
            return Err(Error::InvalidParameter(
                "n_samples must be at least 1".to_string(),
            ));
        }
        let (batch, dim_in) = self.check_input(x)?;

        let flat = reshape(x, &[batch, dim_in]);
        let org = flat.detach();

        let features = self.encoder.apply(&flat);
        let LatentSample { z, posterior } = self.gaussian.sample(&features, n_samples, noise);
        let reconstruction = self.decoder.apply(&z);

        let target = broadcast_samples(&org, n_samples);
        let recon_error = sum_last_axis(&binary_cross_entropy(&reconstruction, &target));

        let kl = posterior.kl_divergence();
        let kl_per_sample = reshape(
            &broadcast_samples(&reshape(&kl, &[batch, 1]), n_samples),
            &[batch, n_samples],
        );
        let elbo = scale(&add(&recon_error, &kl_per_sample), -1.0);

        let diagnostics = self.diagnostics(x, &org, &reconstruction, &recon_error, &kl, noise)?;
        tracing::debug!(
            batch,
            n_samples,
            bce = diagnostics.bce,
            kl = diagnostics.kl,
            "elbo evaluated"
        );

        Ok(ElboOutput {
            elbo,
            reconstruction,
            recon_error,
            kl,
            posterior,
            diagnostics,
        })
    }

    /// Training loss: the negative ELBO
    ///
    /// With `reduce` the loss is the scalar mean over every batch and sample
    /// entry; otherwise it keeps shape `[B, n_samples]`.
    pub fn forward<N: NoiseSource + ?Sized>(
        &self,
        x: &Tensor,
        n_samples: usize,
        reduce: bool,
        noise: &mut N,
    ) -> Result<VaeOutput> {
        let out = self.elbo(x, n_samples, noise)?;
        let negative = scale(&out.elbo, -1.0);
        let loss = if reduce { mean(&negative) } else { negative };

        Ok(VaeOutput {
            loss,
            diagnostics: out.diagnostics,
        })
    }

    /// [`Vae::elbo`] with the configured number of latent draws
    pub fn elbo_default<N: NoiseSource + ?Sized>(
        &self,
        x: &Tensor,
        noise: &mut N,
    ) -> Result<ElboOutput> {
        self.elbo(x, self.config.n_samples, noise)
    }

    /// [`Vae::forward`] with the configured number of latent draws
    pub fn forward_default<N: NoiseSource + ?Sized>(
        &self,
        x: &Tensor,
        reduce: bool,
        noise: &mut N,
    ) -> Result<VaeOutput> {
        self.forward(x, self.config.n_samples, reduce, noise)
    }

    /// Decode `count` draws from the standard Gaussian prior, `[count, dim_in]`
    pub fn generate<N: NoiseSource + ?Sized>(&self, count: usize, noise: &mut N) -> Tensor {
        let latent = self.config.dim_latent;
        let z = Tensor::with_shape(
            noise.standard_normal(count * latent),
            vec![count, latent],
            false,
        );
        self.decoder.apply(&z)
    }

    /// Returns `(batch, dim_in)` for a well-formed input
    fn check_input(&self, x: &Tensor) -> Result<(usize, usize)> {
        let dim_in = self.config.dim_in;
        let (&batch, rest) = x.shape().split_first().ok_or_else(|| Error::ShapeMismatch {
            expected: vec![0, dim_in],
            got: Vec::new(),
        })?;

        // A rank-1 batch holds one feature per observation
        if rest.iter().product::<usize>() != dim_in {
            return Err(Error::ShapeMismatch {
                expected: vec![batch, dim_in],
                got: x.shape().to_vec(),
            });
        }
        if batch == 0 {
            return Err(Error::InvalidParameter("batch must not be empty".to_string()));
        }
        Ok((batch, dim_in))
    }

    /// 2-D layout for image diagnostics
    ///
    /// Uses the input's last two axes when they cover `dim_in`, then the
    /// configured image shape, then a single row.
    pub fn image_layout(&self, input_shape: &[usize]) -> (usize, usize) {
        let dim_in = self.config.dim_in;
        if let [.., h, w] = *input_shape {
            if input_shape.len() >= 3 && h * w == dim_in {
                return (h, w);
            }
        }
        match self.config.image_shape {
            Some([h, w]) => (h, w),
            None => (1, dim_in),
        }
    }

    fn diagnostics<N: NoiseSource + ?Sized>(
        &self,
        x: &Tensor,
        org: &Tensor,
        reconstruction: &Tensor,
        recon_error: &Tensor,
        kl: &Tensor,
        noise: &mut N,
    ) -> Result<Diagnostics> {
        let layout = self.image_layout(x.shape());
        let dim_in = self.config.dim_in;

        // First observation, first sample
        let image = to_image(org.data().iter().take(dim_in).copied().collect(), layout)?;
        let pred = to_image(
            reconstruction.data().iter().take(dim_in).copied().collect(),
            layout,
        )?;
        let generated = self.generate(1, noise);
        let gen = to_image(generated.data().to_vec(), layout)?;

        Ok(Diagnostics {
            image,
            pred,
            bce: recon_error.data().mean().unwrap_or(0.0),
            kl: kl.data().mean().unwrap_or(0.0),
            gen,
        })
    }

    /// Configuration the model was built from
    pub fn config(&self) -> &VaeConfig {
        &self.config
    }

    /// Record the initialization scheme of restored parameters
    pub(crate) fn set_init(&mut self, init: WeightInit) {
        self.config.init = init;
    }

    /// Encoder body `dim_in -> hidden`
    pub fn encoder(&self) -> &FeatureMapper {
        &self.encoder
    }

    /// Posterior heads and sampler
    pub fn gaussian(&self) -> &LatentGaussianLayer {
        &self.gaussian
    }

    /// Decoder body `dim_latent -> dim_in`
    pub fn decoder(&self) -> &FeatureMapper {
        &self.decoder
    }

    /// All trainable parameters: encoder, latent heads, decoder
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.encoder.parameters();
        params.extend(self.gaussian.parameters());
        params.extend(self.decoder.parameters());
        params
    }

    /// Mutable trainable parameters, same order as [`Vae::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.encoder.parameters_mut();
        params.extend(self.gaussian.parameters_mut());
        params.extend(self.decoder.parameters_mut());
        params
    }

    /// Parameters paired with dotted names such as `encoder.fc1.weight`
    pub fn named_parameters(&self) -> Vec<(&'static str, &Tensor)> {
        PARAMETER_NAMES.into_iter().zip(self.parameters()).collect()
    }

    /// Mutable parameters paired with their names
    pub fn named_parameters_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        PARAMETER_NAMES
            .into_iter()
            .zip(self.parameters_mut())
            .collect()
    }

    /// Total number of trainable scalars
    pub fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// Clear every parameter gradient
    pub fn zero_grad(&self) {
        for p in self.parameters() {
            p.zero_grad();
        }
    }
}

fn to_image(values: Vec<f32>, (h, w): (usize, usize)) -> Result<Array2<f32>> {
    let len = values.len();
    Array2::from_shape_vec((h, w), values).map_err(|_| Error::ShapeMismatch {
        expected: vec![h, w],
        got: vec![len],
    })
}
