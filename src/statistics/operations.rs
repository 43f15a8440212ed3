//! Core statistical operations and types
//!
//! This module defines the statistics computed by the summary check and a
//! missing-aware accumulator for them.

use ndarray::ArrayD;

/// Supported summary statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Arithmetic mean
    Mean,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Population standard deviation
    Std,
}

impl StatOperation {
    pub const ALL: [StatOperation; 4] = [Self::Mean, Self::Min, Self::Max, Self::Std];

    /// Get the string representation of the operation, as used in file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
        }
    }
}

/// Streaming mean/min/max/std over valid values (Welford's update)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = self.count as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Value of `op`, NaN when no valid value was pushed
    #[must_use]
    pub fn get(&self, op: StatOperation) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        match op {
            StatOperation::Mean => self.mean,
            StatOperation::Min => self.min,
            StatOperation::Max => self.max,
            #[allow(clippy::cast_precision_loss)]
            StatOperation::Std => (self.m2 / self.count as f64).sqrt(),
        }
    }
}

/// A derived summary series ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySeries {
    /// Name used in output file names (`mean`, `std`, `std_profile`, ...)
    pub name: String,
    /// The statistic held by the series
    pub statistic: StatOperation,
    /// Name of the field the series summarises
    pub field_name: String,
    /// Dimension names of `values` (the group axis first)
    pub dims: Vec<String>,
    /// Label of each group (timestamp or year)
    pub labels: Vec<String>,
    pub values: ArrayD<f64>,
}

impl SummarySeries {
    /// Get the shape of the series data
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// True when every entry is exactly zero
    #[must_use]
    pub fn is_identically_zero(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(|&v| v == 0.0)
    }
}
