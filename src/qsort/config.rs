use tracing::warn;

use super::error::ConfigError;

/// Environment variable consulted by [`SortConfig::from_env`].
pub const MAX_WORKERS_ENV: &str = "FQSORT_MAX_WORKERS";

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME: &str = "fqsort-worker";

/// Default stack for the driver and worker threads. Chunks stolen while
/// waiting nest one sort on the stealing thread's stack.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for a parallel sort session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    /// Cap on background worker threads. `None` derives it from hardware
    /// parallelism; `Some(0)` leaves every chunk to the calling thread.
    pub max_workers: Option<usize>,
    /// Worker threads are named `<thread_name>-<index>`.
    pub thread_name: String,
    /// Stack size for the driver and worker threads. `None` sorts on the
    /// calling thread and gives workers the platform default stack.
    pub stack_size: Option<usize>,
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            max_workers: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: Some(DEFAULT_STACK_SIZE),
        }
    }
}

impl SortConfig {
    pub fn with_max_workers(max_workers: usize) -> Self {
        SortConfig {
            max_workers: Some(max_workers),
            ..SortConfig::default()
        }
    }

    /// Default configuration, with the worker cap taken from
    /// `FQSORT_MAX_WORKERS` when it is set to a valid count.
    pub fn from_env() -> Self {
        let mut config = SortConfig::default();
        if let Ok(val) = std::env::var(MAX_WORKERS_ENV) {
            match parse_worker_count(&val) {
                Ok(n) => config.max_workers = Some(n),
                Err(err) => warn!(%err, "ignoring {}", MAX_WORKERS_ENV),
            }
        }
        config
    }

    /// The worker cap this configuration resolves to.
    pub fn worker_cap(&self) -> usize {
        self.max_workers.unwrap_or_else(default_worker_cap)
    }
}

/// Hardware parallelism minus the calling thread, never below zero.
pub fn default_worker_cap() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
}

/// Parse a worker count such as `"3"` (surrounding blanks allowed).
pub fn parse_worker_count(s: &str) -> Result<usize, ConfigError> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidWorkerCount(s.to_string()))
}
