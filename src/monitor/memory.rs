//! In-memory diagnostics sink

use super::stats::{RunningStats, ScalarStats};
use super::{DiagnosticsSink, LoggedValue};
use ndarray::Array2;
use std::collections::HashMap;

/// Keeps the latest value per key, the full scalar history, and running
/// statistics per scalar key
#[derive(Debug, Default)]
pub struct InMemorySink {
    latest: HashMap<String, LoggedValue>,
    history: HashMap<String, Vec<f32>>,
    running: HashMap<String, RunningStats>,
    updates: usize,
}

impl InMemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&LoggedValue> {
        self.latest.get(key)
    }

    /// Latest scalar recorded under `key`
    pub fn scalar(&self, key: &str) -> Option<f32> {
        self.latest.get(key).and_then(LoggedValue::as_scalar)
    }

    /// Latest image recorded under `key`
    pub fn image(&self, key: &str) -> Option<&Array2<f32>> {
        self.latest.get(key).and_then(LoggedValue::as_image)
    }

    /// Every scalar recorded under `key`, oldest first
    pub fn history(&self, key: &str) -> &[f32] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Summary statistics of the scalars recorded under `key`
    pub fn stats(&self, key: &str) -> Option<ScalarStats> {
        self.running.get(key).map(RunningStats::to_stats)
    }

    /// Keys seen so far
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }

    /// Total number of updates received
    pub fn len(&self) -> usize {
        self.updates
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.updates == 0
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.latest.clear();
        self.history.clear();
        self.running.clear();
        self.updates = 0;
    }
}

impl DiagnosticsSink for InMemorySink {
    fn update(&mut self, key: &str, value: LoggedValue) {
        if let LoggedValue::Scalar(v) = value {
            self.history.entry(key.to_string()).or_default().push(v);
            self.running
                .entry(key.to_string())
                .or_default()
                .update(f64::from(v));
        }
        self.latest.insert(key.to_string(), value);
        self.updates += 1;
    }
}
