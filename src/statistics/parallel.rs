//! Parallel computation of grouped statistics
//!
//! Groups of timesteps are reduced independently on the rayon pool.

use super::operations::RunningStats;
use crate::field::is_missing;
use ndarray::{Array4, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Statistics of one group of timesteps
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    /// Over every spatial point of the group
    pub total: RunningStats,
    /// Over the horizontal points of each depth level
    pub per_level: Vec<RunningStats>,
}

/// Reduces a `(time, z, y, x)` array over each group of time indices,
/// skipping missing entries.
pub fn parallel_group_stats(data: &Array4<f64>, groups: &[Vec<usize>], spval: f64) -> Vec<GroupStats> {
    let nz = data.dim().1;
    debug!(
        "reducing {} groups across {} threads",
        groups.len(),
        rayon::current_num_threads()
    );

    groups
        .par_iter()
        .map(|steps| {
            let mut total = RunningStats::default();
            let mut per_level = vec![RunningStats::default(); nz];
            for &t in steps {
                let record = data.index_axis(Axis(0), t);
                for (level_stats, level) in per_level.iter_mut().zip(record.axis_iter(Axis(0))) {
                    for &v in level.iter().filter(|&&v| !is_missing(v, spval)) {
                        total.push(v);
                        level_stats.push(v);
                    }
                }
            }
            GroupStats { total, per_level }
        })
        .collect()
}
