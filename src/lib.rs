//! # pqbench: Post-Quantum Cryptography Benchmarking Engine
//!
//! pqbench measures key encapsulation mechanisms and signature schemes
//! through a pluggable crypto backend: native liboqs loaded at runtime,
//! or a deterministic simulator when the library is absent. Benchmark
//! work is organized as persistent tasks whose per-round samples feed
//! summary statistics, cross-algorithm comparisons, metric histories and
//! value distributions.
//!
//! ## Design
//!
//! - **Graceful degradation**: native backend falls back to the simulator
//!   instead of failing engine construction
//! - **Single-owner execution**: task status transitions are
//!   compare-and-set, so duplicate runs and stop races have one winner
//! - **Fixed metric schema**: every backend reports the same metric
//!   names, units and rounds, keeping aggregation backend-agnostic
//!
//! ## Example
//!
//! ```rust
//! use pqbench::Engine;
//!
//! # fn main() -> pqbench::Result<()> {
//! let engine = Engine::builder().with_default_catalog(true).build();
//!
//! let kyber = engine.algorithm_by_name("Kyber768").expect("catalog seeded");
//! let task = engine.create_task(kyber.id(), "kyber-smoke", 10)?;
//! let finished = engine.run_task(task.id())?;
//!
//! let summary = engine.summarize(finished.id())?.expect("samples recorded");
//! println!("keygen mean: {:.3} ms", summary["keygen_time"].mean());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod stats;
pub mod store;

pub use backend::{BenchmarkResult, CryptoBackend, SupportedAlgorithms};
pub use config::{BackendMode, EngineConfig, EngineConfigBuilder};
pub use error::{Error, Result};
pub use executor::dispatcher::Dispatcher;
pub use executor::{TaskExecutor, TaskStatusReport};
pub use model::{
    default_catalog, Algorithm, AlgorithmBuilder, AlgorithmCategory, AlgorithmSource, Sample,
    SampleBuilder, Task, TaskBuilder, TaskStatus,
};
pub use stats::{
    AlgorithmComparison, ComparisonEntry, HistoryPoint, MetricComparison, MetricComparisonEntry,
    MetricDistribution, MetricHistory, ResultAggregator, SummaryStatistics,
};
pub use store::{BenchStore, TaskFilter};

use std::sync::Arc;

use tracing::info;

/// Benchmark engine facade.
///
/// Owns the store, the selected crypto backend, the executor and the
/// aggregation layer, and exposes the catalog, task lifecycle and
/// reporting operations as one surface. Cloning is cheap; clones share
/// the same store and backend.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    store: Arc<BenchStore>,
    backend: Arc<CryptoBackend>,
    executor: Arc<TaskExecutor>,
    aggregator: ResultAggregator,
}

impl Engine {
    /// Create an engine from a configuration.
    ///
    /// Never fails: backend selection degrades to the simulator when
    /// native mode is requested but liboqs cannot be loaded.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let store = Arc::new(BenchStore::new());
        let backend = Arc::new(CryptoBackend::from_config(&config));
        let executor = Arc::new(TaskExecutor::new(
            Arc::clone(&store),
            Arc::clone(&backend),
        ));
        let aggregator = ResultAggregator::new(Arc::clone(&store));
        info!(backend = backend.kind(), "benchmark engine ready");
        Self {
            config,
            store,
            backend,
            executor,
            aggregator,
        }
    }

    /// Create an engine builder.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Short name of the selected backend, `"native"` or `"simulated"`.
    #[must_use]
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Whether benchmarks run against a loaded native library.
    #[must_use]
    pub fn is_native_backend(&self) -> bool {
        self.backend.is_native()
    }

    /// Algorithms the selected backend accepts, grouped by category.
    #[must_use]
    pub fn supported_algorithms(&self) -> SupportedAlgorithms {
        self.backend.list_supported()
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Insert the default NIST catalog, skipping names already present.
    /// Returns how many algorithms were inserted.
    pub fn seed_default_catalog(&self) -> usize {
        self.store.seed_default_catalog()
    }

    /// Validate and register a custom algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed record and
    /// [`Error::Conflict`] for a duplicate name.
    pub fn register_algorithm(&self, algorithm: Algorithm) -> Result<Algorithm> {
        self.store.register_algorithm(algorithm)
    }

    /// Look up an algorithm by id.
    #[must_use]
    pub fn algorithm(&self, id: u64) -> Option<Algorithm> {
        self.store.get_algorithm(id)
    }

    /// Look up an algorithm by its unique name.
    #[must_use]
    pub fn algorithm_by_name(&self, name: &str) -> Option<Algorithm> {
        self.store.get_algorithm_by_name(name)
    }

    /// List algorithms ordered by id, optionally narrowed to one category
    /// and to active entries.
    #[must_use]
    pub fn list_algorithms(
        &self,
        category: Option<AlgorithmCategory>,
        active_only: bool,
    ) -> Vec<Algorithm> {
        self.store.list_algorithms(category, active_only)
    }

    /// Mark an algorithm inactive; its tasks and samples stay queryable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn deactivate_algorithm(&self, id: u64) -> Result<Algorithm> {
        self.store.deactivate_algorithm(id)
    }

    // ------------------------------------------------------------------
    // Task lifecycle
    // ------------------------------------------------------------------

    /// Create a benchmark task in `PENDING` status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty name, zero rounds or a
    /// round count above the configured maximum, and [`Error::NotFound`]
    /// when the algorithm does not exist or is deactivated.
    pub fn create_task(&self, algorithm_id: u64, name: &str, rounds: u32) -> Result<Task> {
        self.validate_task_request(name, rounds)?;
        self.store
            .insert_task(TaskBuilder::new(algorithm_id, name, rounds).build())
    }

    /// Create a benchmark task carrying raw JSON parameter text.
    ///
    /// The text is stored as-is and parsed when the task runs; malformed
    /// parameters fail the task at that point, not here.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::create_task`].
    pub fn create_task_with_parameters(
        &self,
        algorithm_id: u64,
        name: &str,
        rounds: u32,
        parameters_json: &str,
    ) -> Result<Task> {
        self.validate_task_request(name, rounds)?;
        self.store.insert_task(
            TaskBuilder::new(algorithm_id, name, rounds)
                .parameters_json(parameters_json)
                .build(),
        )
    }

    /// Run a task to a terminal status on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task. Execution
    /// problems fail the task instead of surfacing here.
    pub fn run_task(&self, task_id: u64) -> Result<Task> {
        self.executor.run(task_id)
    }

    /// Request a stop for a running task. Pending tasks are cancelled by
    /// deleting them instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task and
    /// [`Error::Conflict`] when it is not running.
    pub fn stop_task(&self, task_id: u64) -> Result<Task> {
        self.executor.stop(task_id)
    }

    /// Look up a task snapshot by id.
    #[must_use]
    pub fn task(&self, task_id: u64) -> Option<Task> {
        self.store.get_task(task_id)
    }

    /// Task snapshot combined with its live progress estimate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    pub fn task_status(&self, task_id: u64) -> Result<TaskStatusReport> {
        self.executor.status(task_id)
    }

    /// List tasks newest first, skipping `offset` matches. The limit
    /// clamps to the configured query maximum.
    #[must_use]
    pub fn list_tasks(&self, filter: &TaskFilter, offset: usize, limit: usize) -> Vec<Task> {
        let limit = limit.clamp(1, self.config.max_query_limit());
        self.store.list_tasks(filter, offset, limit)
    }

    /// Delete a non-running task together with its samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task and
    /// [`Error::Conflict`] while it is running.
    pub fn delete_task(&self, task_id: u64) -> Result<()> {
        self.store.delete_task(task_id)
    }

    /// All samples a task has produced, in insertion order.
    #[must_use]
    pub fn task_samples(&self, task_id: u64) -> Vec<Sample> {
        self.store.samples_for_task(task_id)
    }

    /// Samples of one metric for a task, in insertion order.
    #[must_use]
    pub fn metric_samples(&self, task_id: u64, metric: &str) -> Vec<Sample> {
        self.store.samples_for_metric(task_id, metric)
    }

    // ------------------------------------------------------------------
    // Background execution
    // ------------------------------------------------------------------

    /// Spawn a background dispatcher with default capacity over this
    /// engine's executor. Must be called within a Tokio runtime.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::spawn(Arc::clone(&self.executor))
    }

    /// Spawn a background dispatcher with an explicit worker pool size
    /// and queue depth. Must be called within a Tokio runtime.
    #[must_use]
    pub fn dispatcher_with_capacity(&self, workers: usize, queue_depth: usize) -> Dispatcher {
        Dispatcher::with_capacity(Arc::clone(&self.executor), workers, queue_depth)
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Per-metric summary statistics for a task's samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    pub fn summarize(
        &self,
        task_id: u64,
    ) -> Result<Option<rustc_hash::FxHashMap<String, SummaryStatistics>>> {
        self.aggregator.summarize(task_id)
    }

    /// Headline value per metric for a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    pub fn performance_metrics(
        &self,
        task_id: u64,
    ) -> Result<Option<rustc_hash::FxHashMap<String, f64>>> {
        self.aggregator.performance_metrics(task_id)
    }

    /// Latest completed results of several algorithms, side by side.
    #[must_use]
    pub fn compare_algorithms(&self, algorithm_ids: &[u64]) -> AlgorithmComparison {
        self.aggregator.compare_algorithms(algorithm_ids)
    }

    /// Latest completed results of several algorithms, narrowed to one
    /// metric. Algorithms without a completed task carrying the metric
    /// are skipped.
    #[must_use]
    pub fn compare_metric(&self, algorithm_ids: &[u64], metric: &str) -> MetricComparison {
        self.aggregator.compare_metric(algorithm_ids, metric)
    }

    /// Trend of one metric across an algorithm's completed tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown algorithm.
    pub fn history(&self, algorithm_id: u64, metric: &str, days: i64) -> Result<MetricHistory> {
        self.aggregator.history(algorithm_id, metric, days)
    }

    /// Histogram of one metric's values for a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    pub fn metric_distribution(
        &self,
        task_id: u64,
        metric: &str,
        bins: usize,
    ) -> Result<Option<MetricDistribution>> {
        self.aggregator.metric_distribution(task_id, metric, bins)
    }

    fn validate_task_request(&self, name: &str, rounds: u32) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::Validation("task name must not be empty".to_string()));
        }
        if rounds == 0 {
            return Err(Error::Validation("rounds must be at least 1".to_string()));
        }
        if rounds > self.config.max_rounds() {
            return Err(Error::Validation(format!(
                "rounds {rounds} exceeds the maximum of {}",
                self.config.max_rounds()
            )));
        }
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Engine builder.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    seed_catalog: bool,
}

impl EngineBuilder {
    /// Use an explicit configuration instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Seed the default NIST catalog during construction.
    #[must_use]
    pub const fn with_default_catalog(mut self, seed: bool) -> Self {
        self.seed_catalog = seed;
        self
    }

    /// Build the engine.
    #[must_use]
    pub fn build(self) -> Engine {
        let engine = Engine::new(self.config.unwrap_or_default());
        if self.seed_catalog {
            engine.seed_default_catalog();
        }
        engine
    }
}
