//! Running summary statistics for scalar diagnostics

use serde::{Deserialize, Serialize};

/// Summary of every value recorded under one key
///
/// Mean and variance use Welford's online update; non-finite values are
/// flagged instead of folded into the moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarStats {
    /// Number of finite values
    pub count: usize,
    /// Mean of finite values
    pub mean: f64,
    /// Sample standard deviation (0 for fewer than two values)
    pub std: f64,
    /// Minimum finite value
    pub min: f64,
    /// Maximum finite value
    pub max: f64,
    /// Whether any NaN was recorded
    pub has_nan: bool,
    /// Whether any ±Inf was recorded
    pub has_inf: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    has_nan: bool,
    has_inf: bool,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            has_nan: false,
            has_inf: false,
        }
    }
}

impl RunningStats {
    pub(crate) fn update(&mut self, value: f64) {
        if value.is_nan() {
            self.has_nan = true;
            return;
        }
        if value.is_infinite() {
            self.has_inf = true;
            return;
        }

        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub(crate) fn to_stats(&self) -> ScalarStats {
        let std = if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        };
        ScalarStats {
            count: self.count,
            mean: self.mean,
            std,
            min: self.min,
            max: self.max,
            has_nan: self.has_nan,
            has_inf: self.has_inf,
        }
    }
}
