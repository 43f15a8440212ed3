//! Summary statistics and outlier detection
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: Statistic kinds, the running accumulator and summary series
//! - [`parallel`]: Parallel grouped reductions
//! - [`summary`]: Grouped summaries and the zero-field check
//! - [`outliers`]: Smoothed-residual outlier detection

pub mod operations;
pub mod outliers;
pub mod parallel;
pub mod summary;

// Re-export the main types and functions for convenience
pub use operations::{RunningStats, StatOperation, SummarySeries};
pub use outliers::{check_outliers, detect_outliers, smooth, OutlierConfig, SmoothingKind};
pub use parallel::{parallel_group_stats, GroupStats};
pub use summary::{
    check_statistics, compute_summary, Granularity, StatisticsConfig, SummaryStatistics,
};
