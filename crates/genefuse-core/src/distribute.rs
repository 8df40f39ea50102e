//! Running one job per case.
//!
//! A [`WorkDistributor`] only schedules. Jobs own their error handling and
//! report through logging or shared counters; nothing is collected here.

use rayon::prelude::*;
use tracing::info;

use crate::ranking::CaseIdentifier;

/// Default worker count for [`PooledDistributor`].
pub const DEFAULT_THREADS: usize = 32;

pub trait WorkDistributor {
    /// Run `job` once per case and return when every run has finished.
    ///
    /// No ordering between cases is guaranteed.
    fn distribute<F>(&self, cases: &[CaseIdentifier], job: F)
    where
        F: Fn(&CaseIdentifier) + Sync + Send;
}

/// Fixed-size rayon thread pool.
#[derive(Debug)]
pub struct PooledDistributor {
    pool: rayon::ThreadPool,
}

impl PooledDistributor {
    /// Build a pool with `threads` workers. `0` lets rayon pick one per core.
    ///
    /// # Errors
    ///
    /// Returns the rayon error when the OS refuses to spawn the threads.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("genefuse-worker-{idx}"))
            .build()?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl WorkDistributor for PooledDistributor {
    fn distribute<F>(&self, cases: &[CaseIdentifier], job: F)
    where
        F: Fn(&CaseIdentifier) + Sync + Send,
    {
        info!(cases = cases.len(), threads = self.threads(), "distributing cases");
        self.pool.install(|| cases.par_iter().for_each(&job));
    }
}

/// In-order loop on the calling thread, for debugging and small runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialDistributor;

impl WorkDistributor for SerialDistributor {
    fn distribute<F>(&self, cases: &[CaseIdentifier], job: F)
    where
        F: Fn(&CaseIdentifier) + Sync + Send,
    {
        let total = cases.len();
        for (idx, case) in cases.iter().enumerate() {
            info!("case {} of {total}: {case}", idx + 1);
            job(case);
        }
    }
}
