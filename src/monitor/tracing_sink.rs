//! Diagnostics sink that emits `tracing` events

use super::{DiagnosticsSink, LoggedValue};

/// Forwards scalars as `INFO` events and image summaries as `DEBUG` events
///
/// Events use the `latente::diagnostics` target and carry the step counter,
/// which advances on every flush.
#[derive(Debug, Default)]
pub struct TracingSink {
    step: usize,
}

impl TracingSink {
    /// Create a sink starting at step 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed flushes
    pub fn step(&self) -> usize {
        self.step
    }
}

impl DiagnosticsSink for TracingSink {
    fn update(&mut self, key: &str, value: LoggedValue) {
        match value {
            LoggedValue::Scalar(v) => {
                tracing::info!(target: "latente::diagnostics", step = self.step, key, value = v);
            }
            LoggedValue::Image(img) => {
                let (height, width) = img.dim();
                let mean = img.mean().unwrap_or(0.0);
                tracing::debug!(
                    target: "latente::diagnostics",
                    step = self.step,
                    key,
                    height,
                    width,
                    mean
                );
            }
        }
    }

    fn flush(&mut self) -> crate::Result<()> {
        self.step += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_step_advances_on_flush() {
        let mut sink = TracingSink::new();
        sink.update("bce", LoggedValue::Scalar(1.0));
        sink.update("gen", LoggedValue::Image(arr2(&[[0.2, 0.4]])));
        assert_eq!(sink.step(), 0);

        sink.flush().unwrap();
        assert_eq!(sink.step(), 1);
    }
}
