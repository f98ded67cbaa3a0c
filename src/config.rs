//! Engine configuration
//!
//! Explicit configuration handed to constructors - nothing in this crate reads
//! process-global settings. The defaults mirror a conservative deployment:
//! simulator backend, one library search path, bounded round counts.

use std::path::PathBuf;
use std::time::Duration;

/// Default ceiling on rounds per task
pub const DEFAULT_MAX_ROUNDS: u32 = 1_000;

/// Default ceiling on rows returned by listing queries
pub const DEFAULT_MAX_QUERY_LIMIT: usize = 1_000;

/// Default per-call delay of the simulated backend, standing in for compute time
pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(1);

/// Crypto backend selection mode
///
/// Fixed at engine construction. `Native` attempts to load liboqs and
/// degrades to the simulator when no candidate library loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    /// Load the native library if possible, otherwise fall back to the simulator
    Native,
    /// Always use the deterministic simulator
    #[default]
    Simulated,
}

/// Engine configuration
///
/// Construct via [`EngineConfig::builder`] or use [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    backend_mode: BackendMode,
    library_paths: Vec<PathBuf>,
    max_rounds: u32,
    max_query_limit: usize,
    simulated_delay: Duration,
}

impl EngineConfig {
    /// Create a builder for constructing a configuration.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Get the backend selection mode.
    #[must_use]
    pub const fn backend_mode(&self) -> BackendMode {
        self.backend_mode
    }

    /// Get the directories searched for the native library.
    #[must_use]
    pub fn library_paths(&self) -> &[PathBuf] {
        &self.library_paths
    }

    /// Get the maximum rounds accepted per task.
    #[must_use]
    pub const fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Get the maximum rows returned by listing queries.
    #[must_use]
    pub const fn max_query_limit(&self) -> usize {
        self.max_query_limit
    }

    /// Get the per-call delay applied by the simulated backend.
    #[must_use]
    pub const fn simulated_delay(&self) -> Duration {
        self.simulated_delay
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_mode: BackendMode::default(),
            library_paths: vec![PathBuf::from("/usr/local/lib")],
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_query_limit: DEFAULT_MAX_QUERY_LIMIT,
            simulated_delay: DEFAULT_SIMULATED_DELAY,
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    backend_mode: Option<BackendMode>,
    library_paths: Option<Vec<PathBuf>>,
    max_rounds: Option<u32>,
    max_query_limit: Option<usize>,
    simulated_delay: Option<Duration>,
}

impl EngineConfigBuilder {
    /// Set the backend selection mode.
    #[must_use]
    pub const fn backend_mode(mut self, mode: BackendMode) -> Self {
        self.backend_mode = Some(mode);
        self
    }

    /// Replace the native library search paths.
    #[must_use]
    pub fn library_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.library_paths = Some(paths);
        self
    }

    /// Append one native library search path.
    #[must_use]
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths
            .get_or_insert_with(Vec::new)
            .push(path.into());
        self
    }

    /// Set the maximum rounds accepted per task.
    #[must_use]
    pub const fn max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Set the maximum rows returned by listing queries.
    #[must_use]
    pub const fn max_query_limit(mut self, limit: usize) -> Self {
        self.max_query_limit = Some(limit);
        self
    }

    /// Set the per-call delay of the simulated backend.
    ///
    /// `Duration::ZERO` disables the delay entirely, which keeps test suites
    /// fast at the cost of less realistic wall-clock behavior.
    #[must_use]
    pub const fn simulated_delay(mut self, delay: Duration) -> Self {
        self.simulated_delay = Some(delay);
        self
    }

    /// Build the [`EngineConfig`], filling unset fields with defaults.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            backend_mode: self.backend_mode.unwrap_or(defaults.backend_mode),
            library_paths: self.library_paths.unwrap_or(defaults.library_paths),
            max_rounds: self.max_rounds.unwrap_or(defaults.max_rounds),
            max_query_limit: self.max_query_limit.unwrap_or(defaults.max_query_limit),
            simulated_delay: self.simulated_delay.unwrap_or(defaults.simulated_delay),
        }
    }
}
