//! Checkpoint I/O - saving and restoring trained models
//!
//! A checkpoint stores the [`VaeConfig`](crate::VaeConfig) together with every
//! named parameter, so a model can be rebuilt without its original RNG.
//! JSON and YAML are supported; the format follows the file extension.

mod checkpoint;
mod format;
mod load;
mod save;


pub use checkpoint::{ParameterRecord, VaeCheckpoint, CHECKPOINT_VERSION};
pub use format::{CheckpointFormat, SaveConfig};
pub use load::{load_checkpoint, load_model};
pub use save::{save_checkpoint, save_model};
