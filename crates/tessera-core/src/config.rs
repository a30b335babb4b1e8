//! Process-wide configuration: the default backend and the parallel threshold
//!
//! The default backend is read whenever a series is constructed without an
//! explicit backend. It is initialised at most once; afterwards it is
//! immutable for the lifetime of the process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::backend::{ArrowBackend, BackendRef};
use crate::error::{SeriesError, SeriesResult};

/// Default threshold for parallel backend kernels (10,000 rows)
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

static DEFAULT_BACKEND: OnceLock<BackendRef> = OnceLock::new();

/// The backend new series use unless one is passed explicitly
///
/// Falls back to [`ArrowBackend`] when nothing was configured.
#[must_use]
pub fn default_backend() -> BackendRef {
    Arc::clone(DEFAULT_BACKEND.get_or_init(|| Arc::new(ArrowBackend::new())))
}

/// Install the process-wide default backend
///
/// # Errors
/// Returns an error if a default backend was already installed or already
/// read by a series construction.
pub fn set_default_backend(backend: BackendRef) -> SeriesResult<()> {
    DEFAULT_BACKEND.set(backend).map_err(|rejected| {
        let current = DEFAULT_BACKEND.get().map_or("unknown", |b| b.name());
        SeriesError::invalid_option(
            "set_default_backend",
            format!(
                "default backend already initialised to {current}, cannot switch to {}",
                rejected.name()
            ),
        )
    })
}

/// Get the current parallel threshold
#[must_use]
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel threshold
///
/// Backend kernels over more rows than this threshold run on the Rayon pool.
/// Set to 0 to always parallelize, or `usize::MAX` to disable parallelization.
pub fn set_parallel_threshold(threshold: usize) {
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

/// Check if the given row count should trigger parallel execution
#[must_use]
pub fn should_parallelize(num_rows: usize) -> bool {
    num_rows > parallel_threshold()
}

/// Configuration builder applied once at process start
#[derive(Debug, Clone)]
pub struct SeriesConfig {
    /// Backend installed as the process default (None = keep Arrow)
    pub backend: Option<BackendRef>,
    /// Minimum rows to trigger parallel kernels
    pub parallel_threshold: usize,
    /// Number of Rayon threads (None = use Rayon default)
    pub num_threads: Option<usize>,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            backend: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            num_threads: None,
        }
    }
}

impl SeriesConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendRef) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Apply this configuration globally
    ///
    /// # Errors
    /// Returns an error if a different default backend is already in place.
    pub fn apply(&self) -> SeriesResult<()> {
        set_parallel_threshold(self.parallel_threshold);
        if let Some(threads) = self.num_threads {
            // The global pool can only be built once; a second attempt keeps the first
            let _ = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global();
        }
        if let Some(backend) = &self.backend {
            set_default_backend(Arc::clone(backend))?;
        }
        tracing::debug!(
            backend = default_backend().name(),
            parallel_threshold = self.parallel_threshold,
            "series configuration applied"
        );
        Ok(())
    }
}
