//! Thread pool configuration for the grouped reductions
//!
//! The checks themselves are single-threaded; only the reductions in
//! [`statistics::parallel`](crate::statistics::parallel) fan out over rayon's
//! global pool, which is configured here once per process.

use crate::errors::{AutoQcError, Result};
use rayon::ThreadPoolBuilder;
use tracing::{debug, info};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Use every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Set up the global rayon thread pool.
    ///
    /// Without an explicit thread count rayon's default pool is left alone.
    /// Fails when the global pool was already built.
    pub fn setup_global_pool(&self) -> Result<()> {
        let Some(num_threads) = self.num_threads else {
            debug!(
                threads = rayon::current_num_threads(),
                "using default thread pool"
            );
            return Ok(());
        };
        if num_threads == 0 {
            return Err(AutoQcError::ThreadPoolError(
                "thread count must be at least 1".to_string(),
            ));
        }
        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                AutoQcError::ThreadPoolError(format!(
                    "Failed to initialize thread pool with {} threads: {}",
                    num_threads, e
                ))
            })?;
        info!(
            threads = num_threads,
            cores = num_cpus::get(),
            "configured parallel processing"
        );
        Ok(())
    }

    /// Number of threads the reductions will actually use
    #[must_use]
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        let result = ParallelConfig::new(Some(0)).setup_global_pool();
        assert!(matches!(result, Err(AutoQcError::ThreadPoolError(_))));
    }

    #[test]
    fn default_pool_is_left_alone() {
        assert!(ParallelConfig::default().setup_global_pool().is_ok());
        assert!(ParallelConfig::default().current_threads() >= 1);
    }

    #[test]
    fn all_cores_uses_cpu_count() {
        assert_eq!(ParallelConfig::all_cores().num_threads, Some(num_cpus::get()));
    }
}
