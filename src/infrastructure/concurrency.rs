//! Concurrency management for Assert Probe.
//! Configures the thread pool used to classify files in parallel.

use anyhow::Result;
use tracing::info;

/// Number of workers used when none is requested: half the cores, at least one.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool with `jobs` workers, or
/// `default_workers()` when `jobs` is `None`.
pub fn init_thread_pool(jobs: Option<usize>) -> Result<()> {
    let cores = num_cpus::get();
    let workers = jobs.filter(|&j| j > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    info!("initialized thread pool: {} workers (system has {} cores)", workers, cores);

    Ok(())
}
