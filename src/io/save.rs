//! Checkpoint saving

use super::checkpoint::VaeCheckpoint;
use super::format::{CheckpointFormat, SaveConfig};
use crate::error::{Error, Result};
use crate::vae::Vae;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write a checkpoint to `path`
///
/// # Errors
/// Returns [`Error::Serialization`] when the path's extension names a
/// different format than `config.format`.
pub fn save_checkpoint(
    checkpoint: &VaeCheckpoint,
    path: impl AsRef<Path>,
    config: &SaveConfig,
) -> Result<()> {
    if let Some(detected) = CheckpointFormat::from_path(path.as_ref()) {
        if detected != config.format {
            return Err(Error::Serialization(format!(
                "Path {} has a {} extension but the save format is {}",
                path.as_ref().display(),
                detected.extension(),
                config.format.extension()
            )));
        }
    }

    let data = match config.format {
        CheckpointFormat::Json => {
            if config.pretty {
                serde_json::to_string_pretty(checkpoint)
            } else {
                serde_json::to_string(checkpoint)
            }
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
        }
        CheckpointFormat::Yaml => serde_yaml::to_string(checkpoint)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
    };

    let mut file = File::create(path.as_ref())?;
    file.write_all(data.as_bytes())?;

    tracing::info!(
        path = %path.as_ref().display(),
        parameters = checkpoint.parameters.len(),
        "checkpoint saved"
    );
    Ok(())
}

/// Snapshot `vae` and write it to `path`
///
/// # Example
///
/// ```no_run
/// use latente::io::{save_model, SaveConfig};
/// use latente::{Vae, VaeConfig};
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let vae = Vae::new(VaeConfig::new(784, 2), &mut StdRng::seed_from_u64(0))?;
/// save_model(&vae, "vae.json", &SaveConfig::default())?;
/// # Ok::<(), latente::Error>(())
/// ```
pub fn save_model(vae: &Vae, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    save_checkpoint(&VaeCheckpoint::from_model(vae), path, config)
}
