//! Checkpoint loading

use super::checkpoint::VaeCheckpoint;
use super::format::CheckpointFormat;
use crate::error::{Error, Result};
use crate::vae::Vae;
use std::fs;
use std::path::Path;

/// Read a checkpoint, detecting the format from the file extension
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<VaeCheckpoint> {
    let path = path.as_ref();

    let format = CheckpointFormat::from_path(path).ok_or_else(|| {
        Error::Serialization(format!(
            "Unsupported checkpoint extension: {}",
            path.display()
        ))
    })?;

    let content = fs::read_to_string(path)?;

    let checkpoint = match format {
        CheckpointFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?,
        CheckpointFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))?,
    };

    Ok(checkpoint)
}

/// Read a checkpoint and rebuild the model it describes
pub fn load_model(path: impl AsRef<Path>) -> Result<Vae> {
    let vae = load_checkpoint(path.as_ref())?.into_model()?;
    tracing::info!(
        path = %path.as_ref().display(),
        parameters = vae.num_parameters(),
        "checkpoint loaded"
    );
    Ok(vae)
}
