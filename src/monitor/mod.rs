//! Diagnostics produced by a forward pass and the sinks that receive them
//!
//! The model never writes to an output channel itself. Every ELBO evaluation
//! returns a [`Diagnostics`] record; the caller forwards it to whichever
//! [`DiagnosticsSink`] it wants (memory, `tracing`, a JSONL file).
//!
//! # Example
//!
//! ```
//! use latente::monitor::{keys, DiagnosticsSink, InMemorySink, LoggedValue};
//!
//! let mut sink = InMemorySink::new();
//! sink.update(keys::BCE, LoggedValue::Scalar(120.5));
//! sink.update(keys::BCE, LoggedValue::Scalar(98.0));
//!
//! assert_eq!(sink.scalar(keys::BCE), Some(98.0));
//! assert_eq!(sink.stats(keys::BCE).unwrap().count, 2);
//! ```

mod jsonl;
mod memory;
mod stats;
mod tracing_sink;

pub use jsonl::{DiagnosticsLogEntry, ImageSummary, JsonlSink};
pub use memory::InMemorySink;
pub use stats::ScalarStats;
pub use tracing_sink::TracingSink;

use crate::error::Result;
use ndarray::Array2;

/// Names under which diagnostics are reported
pub mod keys {
    /// First observation, reshaped to its 2-D layout
    pub const IMAGE: &str = "image";
    /// Reconstruction of the first observation (first sample)
    pub const PRED: &str = "pred";
    /// Mean reconstruction error (summed BCE per sample)
    pub const BCE: &str = "bce";
    /// Mean KL divergence
    pub const KL: &str = "kl";
    /// Decoded draw from the standard Gaussian prior
    pub const GEN: &str = "gen";
}

/// A value reported to a sink
#[derive(Debug, Clone, PartialEq)]
pub enum LoggedValue {
    /// Scalar metric
    Scalar(f32),
    /// 2-D image `[height, width]`
    Image(Array2<f32>),
}

impl LoggedValue {
    /// Scalar payload, if any
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            LoggedValue::Scalar(v) => Some(*v),
            LoggedValue::Image(_) => None,
        }
    }

    /// Image payload, if any
    pub fn as_image(&self) -> Option<&Array2<f32>> {
        match self {
            LoggedValue::Scalar(_) => None,
            LoggedValue::Image(img) => Some(img),
        }
    }
}

/// Receiver of named diagnostic values
pub trait DiagnosticsSink {
    /// Record `value` under `key`
    fn update(&mut self, key: &str, value: LoggedValue);

    /// Persist anything buffered since the last flush
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Loggable quantities of one ELBO evaluation
///
/// Purely observational: none of these values feed back into the loss.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    /// First observation in its 2-D layout
    pub image: Array2<f32>,
    /// Its reconstruction (first sample) in the same layout
    pub pred: Array2<f32>,
    /// Mean reconstruction error over batch and samples
    pub bce: f32,
    /// Mean KL divergence over the batch
    pub kl: f32,
    /// One unconditional sample decoded from a prior draw
    pub gen: Array2<f32>,
}

impl Diagnostics {
    /// Forward every value to `sink` under its standard key, then flush it
    pub fn emit<S: DiagnosticsSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.update(keys::IMAGE, LoggedValue::Image(self.image.clone()));
        sink.update(keys::PRED, LoggedValue::Image(self.pred.clone()));
        sink.update(keys::BCE, LoggedValue::Scalar(self.bce));
        sink.update(keys::KL, LoggedValue::Scalar(self.kl));
        sink.update(keys::GEN, LoggedValue::Image(self.gen.clone()));
        sink.flush()
    }
}
