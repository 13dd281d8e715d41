//! Worker pool sizing

use rastile_core::{Error, Result};
use rayon::prelude::*;

/// Processing mode for per-tile work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// `Some(n)` pins the pool width, `None` uses every core.
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            Some(1) => ProcessingMode::Sequential,
            Some(n) if n > 1 => ProcessingMode::ParallelWith(n),
            _ => ProcessingMode::Parallel,
        }
    }

    /// Number of workers this mode runs with
    pub fn num_threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => (*n).max(1),
        }
    }

    /// Dedicated pool of [`ProcessingMode::num_threads`] workers
    pub fn build_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads())
            .thread_name(|i| format!("rastile-worker-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("failed to build thread pool: {}", e)))
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(range.map(f).collect()),
            _ => {
                let pool = self.build_pool()?;
                Ok(pool.install(|| range.into_par_iter().map(f).collect()))
            }
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_threads() {
        assert_eq!(ProcessingMode::from_threads(None), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(Some(1)), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_threads(Some(3)).num_threads(), 3);
        assert_eq!(ProcessingMode::from_threads(Some(0)), ProcessingMode::Parallel);
    }

    #[test]
    fn test_par_map_keeps_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.par_map(0..100, |i| i * i).unwrap();
            assert_eq!(out, (0..100).map(|i| i * i).collect::<Vec<_>>());
        }
    }
}
