//! Configuration validation

use super::schema::VaeConfig;

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid input dimension: {0} (must be > 0)")]
    InvalidInputDim(usize),

    #[error("Invalid latent dimension: {0} (must be > 0)")]
    InvalidLatentDim(usize),

    #[error("Invalid hidden dimension: {0} (must be > 0)")]
    InvalidHiddenDim(usize),

    #[error("Invalid sample count: {0} (must be > 0)")]
    InvalidSampleCount(usize),

    #[error("Image shape {height}x{width} does not cover dim_in {dim_in}")]
    ImageShapeMismatch {
        height: usize,
        width: usize,
        dim_in: usize,
    },
}

/// Validate a model configuration
///
/// Checks that every dimension is positive and that the image layout, when
/// given, covers exactly `dim_in` features.
pub fn validate_config(config: &VaeConfig) -> Result<(), ValidationError> {
    if config.dim_in == 0 {
        return Err(ValidationError::InvalidInputDim(config.dim_in));
    }

    if config.dim_latent == 0 {
        return Err(ValidationError::InvalidLatentDim(config.dim_latent));
    }

    if config.hidden_dim == 0 {
        return Err(ValidationError::InvalidHiddenDim(config.hidden_dim));
    }

    if config.n_samples == 0 {
        return Err(ValidationError::InvalidSampleCount(config.n_samples));
    }

    if let Some([height, width]) = config.image_shape {
        if height * width != config.dim_in {
            return Err(ValidationError::ImageShapeMismatch {
                height,
                width,
                dim_in: config.dim_in,
            });
        }
    }

    Ok(())
}
