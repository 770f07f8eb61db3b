//! Results of an ELBO evaluation

use crate::monitor::Diagnostics;
use crate::nn::Posterior;
use crate::Tensor;

/// Everything computed by [`Vae::elbo`](super::Vae::elbo)
///
/// `B` is the batch size, `N` the number of latent draws per observation.
#[derive(Debug, Clone)]
pub struct ElboOutput {
    /// Per-sample evidence lower bound `[B, N]`
    pub elbo: Tensor,
    /// Decoder output `[B, N, dim_in]`, values in (0, 1)
    pub reconstruction: Tensor,
    /// Binary cross-entropy summed over features `[B, N]`
    pub recon_error: Tensor,
    /// KL divergence per observation `[B]`
    pub kl: Tensor,
    /// Posterior the latents were drawn from
    pub posterior: Posterior,
    /// Loggable summary; never feeds back into the loss
    pub diagnostics: Diagnostics,
}

/// Training loss and diagnostics from [`Vae::forward`](super::Vae::forward)
#[derive(Debug, Clone)]
pub struct VaeOutput {
    /// Negative ELBO: a scalar mean when reduced, `[B, N]` otherwise
    pub loss: Tensor,
    pub diagnostics: Diagnostics,
}
