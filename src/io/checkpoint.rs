//! Serializable model state

use crate::config::{VaeConfig, WeightInit};
use crate::error::{Error, Result};
use crate::vae::Vae;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Format version written into every checkpoint
pub const CHECKPOINT_VERSION: u32 = 1;

/// One named parameter with its shape and row-major values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Dotted name, e.g. `decoder.fc2.bias`
    pub name: String,

    /// Parameter shape
    pub shape: Vec<usize>,

    /// Flattened values
    pub data: Vec<f32>,
}

/// Configuration plus parameters of a [`Vae`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaeCheckpoint {
    pub version: u32,
    pub config: VaeConfig,
    pub parameters: Vec<ParameterRecord>,
}

impl VaeCheckpoint {
    /// Snapshot a model's configuration and current parameter values
    pub fn from_model(vae: &Vae) -> Self {
        let parameters = vae
            .named_parameters()
            .into_iter()
            .map(|(name, tensor)| ParameterRecord {
                name: name.to_string(),
                shape: tensor.shape().to_vec(),
                data: tensor.data().to_vec(),
            })
            .collect();

        Self {
            version: CHECKPOINT_VERSION,
            config: vae.config().clone(),
            parameters,
        }
    }

    /// Get a parameter record by name
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterRecord> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Rebuild the model
    ///
    /// # Errors
    /// Fails on an unknown version, an invalid configuration, or a missing
    /// or misshapen parameter.
    pub fn into_model(self) -> Result<Vae> {
        if self.version != CHECKPOINT_VERSION {
            return Err(Error::Serialization(format!(
                "Unsupported checkpoint version {} (expected {CHECKPOINT_VERSION})",
                self.version
            )));
        }

        // Parameters are overwritten below, so skip random initialization
        let init = self.config.init;
        let config = self.config.with_init(WeightInit::Zeros);
        let mut vae = Vae::new(config, &mut StdRng::seed_from_u64(0))?;

        let mut records: HashMap<String, ParameterRecord> = self
            .parameters
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        for (name, tensor) in vae.named_parameters_mut() {
            let record = records.remove(name).ok_or_else(|| {
                Error::Serialization(format!("Checkpoint is missing parameter {name}"))
            })?;
            if record.shape != tensor.shape() || record.data.len() != tensor.len() {
                return Err(Error::ShapeMismatch {
                    expected: tensor.shape().to_vec(),
                    got: record.shape,
                });
            }
            *tensor.data_mut() = Array1::from(record.data);
        }

        if let Some(extra) = records.keys().next() {
            return Err(Error::Serialization(format!(
                "Checkpoint has unknown parameter {extra}"
            )));
        }

        vae.set_init(init);
        Ok(vae)
    }
}
