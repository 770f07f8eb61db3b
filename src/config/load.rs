//! Loading configuration from YAML

use super::schema::VaeConfig;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

impl VaeConfig {
    /// Parse and validate a configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: VaeConfig = serde_yaml::from_str(yaml)
            .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?;

        validate_config(&config).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))
    }
}

/// Load and validate a model configuration from a YAML file
///
/// # Example
///
/// ```no_run
/// use latente::config::load_config;
///
/// let config = load_config("vae.yaml")?;
/// println!("latent dim: {}", config.dim_latent);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<VaeConfig> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    VaeConfig::from_yaml_str(&yaml_content)
}
