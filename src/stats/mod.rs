//! Result aggregation and reporting
//!
//! Read-side queries over persisted samples: per-task summaries, headline
//! performance numbers, cross-algorithm comparison, metric history
//! windows and value distributions. Per-metric groups are independent, so
//! the heavier queries fan out over Rayon.

pub mod summary;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::sample::{metric, unit};
use crate::model::{AlgorithmCategory, Sample, Task};
use crate::store::BenchStore;

pub use summary::{compute_summary, sample_std_dev, SummaryStatistics};

/// Shortest history window honored, in days
const MIN_HISTORY_DAYS: i64 = 1;
/// Longest history window honored, in days
const MAX_HISTORY_DAYS: i64 = 365;
/// Smallest histogram bin count honored
const MIN_BINS: usize = 1;
/// Largest histogram bin count honored
const MAX_BINS: usize = 100;

/// One algorithm's latest completed results inside a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    algorithm_id: u64,
    algorithm_name: String,
    category: AlgorithmCategory,
    task_id: u64,
    finished_at: DateTime<Utc>,
    metrics: FxHashMap<String, f64>,
}

impl ComparisonEntry {
    /// Id of the compared algorithm.
    #[must_use]
    pub const fn algorithm_id(&self) -> u64 {
        self.algorithm_id
    }

    /// Name of the compared algorithm.
    #[must_use]
    pub fn algorithm_name(&self) -> &str {
        &self.algorithm_name
    }

    /// Category of the compared algorithm.
    #[must_use]
    pub const fn category(&self) -> AlgorithmCategory {
        self.category
    }

    /// Task the entry's numbers came from.
    #[must_use]
    pub const fn task_id(&self) -> u64 {
        self.task_id
    }

    /// When that task finished.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Headline value per metric name.
    #[must_use]
    pub const fn metrics(&self) -> &FxHashMap<String, f64> {
        &self.metrics
    }
}

/// Side-by-side metrics from each algorithm's latest completed task.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmComparison {
    entries: Vec<ComparisonEntry>,
    requested: usize,
}

impl AlgorithmComparison {
    /// Entries in the order the algorithms were requested.
    #[must_use]
    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    /// How many algorithms the caller asked to compare.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.requested
    }
}

/// One algorithm's summary of a single metric inside a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct MetricComparisonEntry {
    algorithm_id: u64,
    algorithm_name: String,
    task_id: u64,
    finished_at: DateTime<Utc>,
    summary: SummaryStatistics,
}

impl MetricComparisonEntry {
    /// Id of the compared algorithm.
    #[must_use]
    pub const fn algorithm_id(&self) -> u64 {
        self.algorithm_id
    }

    /// Name of the compared algorithm.
    #[must_use]
    pub fn algorithm_name(&self) -> &str {
        &self.algorithm_name
    }

    /// Task the entry's numbers came from.
    #[must_use]
    pub const fn task_id(&self) -> u64 {
        self.task_id
    }

    /// When that task finished.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Summary of the compared metric within that task.
    #[must_use]
    pub const fn summary(&self) -> &SummaryStatistics {
        &self.summary
    }
}

/// Cross-algorithm comparison narrowed to one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    metric: String,
    entries: Vec<MetricComparisonEntry>,
    requested: usize,
}

impl MetricComparison {
    /// Metric the comparison covers.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Entries in the order the algorithms were requested.
    #[must_use]
    pub fn entries(&self) -> &[MetricComparisonEntry] {
        &self.entries
    }

    /// How many algorithms the caller asked to compare.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.requested
    }
}

/// One task's contribution to a metric history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    task_id: u64,
    finished_at: DateTime<Utc>,
    mean: f64,
    sample_count: usize,
}

impl HistoryPoint {
    /// Task the point was computed from.
    #[must_use]
    pub const fn task_id(&self) -> u64 {
        self.task_id
    }

    /// When the task finished.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Mean of the metric's values within the task.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// How many values contributed to the mean.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Trend of one metric across an algorithm's completed tasks.
#[derive(Debug, Clone, Serialize)]
pub struct MetricHistory {
    algorithm_id: u64,
    metric: String,
    window_days: i64,
    points: Vec<HistoryPoint>,
}

impl MetricHistory {
    /// Algorithm the history belongs to.
    #[must_use]
    pub const fn algorithm_id(&self) -> u64 {
        self.algorithm_id
    }

    /// Metric the history tracks.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Window actually used, after clamping.
    #[must_use]
    pub const fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Points ordered by finish time ascending.
    #[must_use]
    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }
}

/// Histogram of one metric's sample values.
///
/// Bin `i` covers `[min + i * bin_width, min + (i + 1) * bin_width)`,
/// with the last bin closed on the right. Identical minimum and maximum
/// collapse to a single bin with zero width.
#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    metric: String,
    min: f64,
    max: f64,
    bin_width: f64,
    counts: Vec<u64>,
    sample_count: usize,
}

impl MetricDistribution {
    /// Metric the histogram covers.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Smallest observed value.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Largest observed value.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Width of each bin, zero for a collapsed single bin.
    #[must_use]
    pub const fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Occupancy per bin.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Total values binned.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Read-side aggregation over a shared store.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    store: Arc<BenchStore>,
}

impl ResultAggregator {
    /// Create an aggregator over a shared store.
    #[must_use]
    pub fn new(store: Arc<BenchStore>) -> Self {
        Self { store }
    }

    /// Per-metric summary statistics for one task's samples.
    ///
    /// Returns `Ok(None)` when the task exists but has produced no
    /// samples yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    pub fn summarize(&self, task_id: u64) -> Result<Option<FxHashMap<String, SummaryStatistics>>> {
        self.require_task(task_id)?;
        let samples = self.store.samples_for_task(task_id);
        if samples.is_empty() {
            return Ok(None);
        }

        let summaries: FxHashMap<String, SummaryStatistics> = group_by_metric(&samples)
            .into_par_iter()
            .filter_map(|(name, values)| compute_summary(&values).map(|summary| (name, summary)))
            .collect();
        Ok(Some(summaries))
    }

    /// Headline value per metric for one task: mean for timings, largest
    /// for sizes, most recent for the success rate. The success rate key
    /// is always present, zero when never recorded.
    ///
    /// Returns `Ok(None)` when the task has no samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    pub fn performance_metrics(&self, task_id: u64) -> Result<Option<FxHashMap<String, f64>>> {
        self.require_task(task_id)?;
        let samples = self.store.samples_for_task(task_id);
        if samples.is_empty() {
            return Ok(None);
        }

        let mut metrics = FxHashMap::default();
        for (name, (unit_name, values)) in group_with_units(&samples) {
            let value = match unit_name.as_str() {
                unit::BYTES => max_value(&values),
                unit::PERCENT => values.last().copied().unwrap_or(0.0),
                _ => mean(&values),
            };
            metrics.insert(name, value);
        }
        metrics
            .entry(metric::SUCCESS_RATE.to_string())
            .or_insert(0.0);
        Ok(Some(metrics))
    }

    /// Latest completed results of several algorithms, side by side.
    ///
    /// Algorithms that are unknown or have no completed task are omitted
    /// rather than failing the whole report; `requested` preserves how
    /// many were asked for.
    #[must_use]
    pub fn compare_algorithms(&self, algorithm_ids: &[u64]) -> AlgorithmComparison {
        let entries: Vec<ComparisonEntry> = algorithm_ids
            .par_iter()
            .filter_map(|&algorithm_id| self.comparison_entry(algorithm_id))
            .collect();
        debug!(
            requested = algorithm_ids.len(),
            compared = entries.len(),
            "built algorithm comparison"
        );
        AlgorithmComparison {
            entries,
            requested: algorithm_ids.len(),
        }
    }

    /// Comparison narrowed to the summary of one metric per algorithm.
    ///
    /// Algorithms that are unknown, have no completed task or never
    /// recorded the metric are omitted, like in
    /// [`ResultAggregator::compare_algorithms`].
    #[must_use]
    pub fn compare_metric(&self, algorithm_ids: &[u64], metric_name: &str) -> MetricComparison {
        let entries: Vec<MetricComparisonEntry> = algorithm_ids
            .par_iter()
            .filter_map(|&algorithm_id| self.metric_comparison_entry(algorithm_id, metric_name))
            .collect();
        debug!(
            requested = algorithm_ids.len(),
            compared = entries.len(),
            metric = metric_name,
            "built metric comparison"
        );
        MetricComparison {
            metric: metric_name.to_string(),
            entries,
            requested: algorithm_ids.len(),
        }
    }

    /// Trend of one metric across an algorithm's completed tasks inside a
    /// day window, ordered by finish time ascending.
    ///
    /// The window clamps to [1, 365] days. Tasks without samples for the
    /// metric are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown algorithm.
    pub fn history(
        &self,
        algorithm_id: u64,
        metric_name: &str,
        days: i64,
    ) -> Result<MetricHistory> {
        if self.store.get_algorithm(algorithm_id).is_none() {
            return Err(Error::NotFound(format!(
                "algorithm {algorithm_id} not found"
            )));
        }

        let window_days = days.clamp(MIN_HISTORY_DAYS, MAX_HISTORY_DAYS);
        let cutoff = Utc::now() - Duration::days(window_days);
        let points: Vec<HistoryPoint> = self
            .store
            .completed_tasks_since(algorithm_id, cutoff)
            .iter()
            .filter_map(|task| self.history_point(task, metric_name))
            .collect();

        Ok(MetricHistory {
            algorithm_id,
            metric: metric_name.to_string(),
            window_days,
            points,
        })
    }

    /// Histogram of one metric's values for a task.
    ///
    /// The bin count clamps to [1, 100]. Returns `Ok(None)` when the task
    /// has no samples for the metric.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn metric_distribution(
        &self,
        task_id: u64,
        metric_name: &str,
        bins: usize,
    ) -> Result<Option<MetricDistribution>> {
        self.require_task(task_id)?;
        let values: Vec<f64> = self
            .store
            .samples_for_metric(task_id, metric_name)
            .iter()
            .map(Sample::value)
            .collect();
        if values.is_empty() {
            return Ok(None);
        }

        let bins = bins.clamp(MIN_BINS, MAX_BINS);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if (max - min).abs() < f64::EPSILON {
            return Ok(Some(MetricDistribution {
                metric: metric_name.to_string(),
                min,
                max,
                bin_width: 0.0,
                counts: vec![values.len() as u64],
                sample_count: values.len(),
            }));
        }

        let bin_width = (max - min) / bins as f64;
        let mut counts = vec![0_u64; bins];
        for value in &values {
            let index = (((value - min) / bin_width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Ok(Some(MetricDistribution {
            metric: metric_name.to_string(),
            min,
            max,
            bin_width,
            counts,
            sample_count: values.len(),
        }))
    }

    fn require_task(&self, task_id: u64) -> Result<Task> {
        self.store
            .get_task(task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))
    }

    fn comparison_entry(&self, algorithm_id: u64) -> Option<ComparisonEntry> {
        let algorithm = self.store.get_algorithm(algorithm_id)?;
        let task = self.store.latest_completed_task(algorithm_id)?;
        let metrics = match self.performance_metrics(task.id()) {
            Ok(Some(metrics)) => metrics,
            Ok(None) | Err(_) => return None,
        };
        Some(ComparisonEntry {
            algorithm_id,
            algorithm_name: algorithm.name().to_string(),
            category: algorithm.category(),
            task_id: task.id(),
            finished_at: task.finished_at()?,
            metrics,
        })
    }

    fn metric_comparison_entry(
        &self,
        algorithm_id: u64,
        metric_name: &str,
    ) -> Option<MetricComparisonEntry> {
        let algorithm = self.store.get_algorithm(algorithm_id)?;
        let task = self.store.latest_completed_task(algorithm_id)?;
        let values: Vec<f64> = self
            .store
            .samples_for_metric(task.id(), metric_name)
            .iter()
            .map(Sample::value)
            .collect();
        let summary = compute_summary(&values)?;
        Some(MetricComparisonEntry {
            algorithm_id,
            algorithm_name: algorithm.name().to_string(),
            task_id: task.id(),
            finished_at: task.finished_at()?,
            summary,
        })
    }

    fn history_point(&self, task: &Task, metric_name: &str) -> Option<HistoryPoint> {
        let values: Vec<f64> = self
            .store
            .samples_for_metric(task.id(), metric_name)
            .iter()
            .map(Sample::value)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(HistoryPoint {
            task_id: task.id(),
            finished_at: task.finished_at()?,
            mean: mean(&values),
            sample_count: values.len(),
        })
    }
}

fn group_by_metric(samples: &[Sample]) -> Vec<(String, Vec<f64>)> {
    let mut groups: FxHashMap<String, Vec<f64>> = FxHashMap::default();
    for sample in samples {
        groups
            .entry(sample.metric().to_string())
            .or_default()
            .push(sample.value());
    }
    groups.into_iter().collect()
}

fn group_with_units(samples: &[Sample]) -> FxHashMap<String, (String, Vec<f64>)> {
    let mut groups: FxHashMap<String, (String, Vec<f64>)> = FxHashMap::default();
    for sample in samples {
        let entry = groups
            .entry(sample.metric().to_string())
            .or_insert_with(|| (sample.unit().to_string(), Vec::new()));
        entry.1.push(sample.value());
    }
    groups
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn max_value(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CryptoBackend;
    use crate::config::EngineConfig;
    use crate::executor::TaskExecutor;
    use crate::model::{SampleBuilder, TaskBuilder};
    use std::time::Duration as StdDuration;

    fn fixture() -> (Arc<BenchStore>, TaskExecutor, ResultAggregator) {
        let store = Arc::new(BenchStore::new());
        store.seed_default_catalog();
        let config = EngineConfig::builder()
            .simulated_delay(StdDuration::ZERO)
            .build();
        let backend = Arc::new(CryptoBackend::from_config(&config));
        let executor = TaskExecutor::new(Arc::clone(&store), backend);
        let aggregator = ResultAggregator::new(Arc::clone(&store));
        (store, executor, aggregator)
    }

    fn completed_task(store: &BenchStore, executor: &TaskExecutor, name: &str, rounds: u32) -> u64 {
        let algorithm = store.get_algorithm_by_name(name).unwrap();
        let task = store
            .insert_task(TaskBuilder::new(algorithm.id(), "bench", rounds).build())
            .unwrap();
        executor.run(task.id()).unwrap();
        task.id()
    }

    #[test]
    fn test_summarize_groups_by_metric() {
        let (store, executor, aggregator) = fixture();
        let task_id = completed_task(&store, &executor, "Kyber512", 5);

        let summaries = aggregator.summarize(task_id).unwrap().unwrap();
        // 3 timings, 3 sizes, success rate
        assert_eq!(summaries.len(), 7);

        let keygen = &summaries[metric::KEYGEN_TIME];
        assert_eq!(keygen.sample_count(), 5);
        assert!(keygen.mean() > 0.0);
        assert!(keygen.min() <= keygen.median() && keygen.median() <= keygen.max());

        let rate = &summaries[metric::SUCCESS_RATE];
        assert_eq!(rate.sample_count(), 1);
        assert!((rate.mean() - 100.0).abs() < f64::EPSILON);
        assert!((rate.std_dev() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_unknown_task() {
        let (_store, _executor, aggregator) = fixture();
        let err = aggregator.summarize(404).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_summarize_task_without_samples() {
        let (store, _executor, aggregator) = fixture();
        let algorithm = store.get_algorithm_by_name("Kyber512").unwrap();
        let task = store
            .insert_task(TaskBuilder::new(algorithm.id(), "pending", 5).build())
            .unwrap();
        assert!(aggregator.summarize(task.id()).unwrap().is_none());
    }

    #[test]
    fn test_performance_metrics_by_unit() {
        let (store, executor, aggregator) = fixture();
        let task_id = completed_task(&store, &executor, "Kyber512", 4);

        let metrics = aggregator.performance_metrics(task_id).unwrap().unwrap();
        // Sizes report the recorded value, not an average
        assert!((metrics[metric::PUBLIC_KEY_SIZE] - 800.0).abs() < f64::EPSILON);
        assert!((metrics[metric::CIPHERTEXT_SIZE] - 768.0).abs() < f64::EPSILON);
        assert!((metrics[metric::SUCCESS_RATE] - 100.0).abs() < f64::EPSILON);
        // Simulated Kyber512 keygen stays inside the noise envelope
        let keygen = metrics[metric::KEYGEN_TIME];
        assert!(keygen >= 0.4 && keygen <= 0.6, "mean keygen {keygen}");
    }

    #[test]
    fn test_performance_metrics_success_rate_defaults_to_zero() {
        let (store, _executor, aggregator) = fixture();
        let algorithm = store.get_algorithm_by_name("Kyber512").unwrap();
        let task = store
            .insert_task(TaskBuilder::new(algorithm.id(), "partial", 3).build())
            .unwrap();
        store
            .append_samples(
                task.id(),
                vec![SampleBuilder::new(task.id(), metric::KEYGEN_TIME, 0.5, unit::MS)
                    .round(1)
                    .build()],
            )
            .unwrap();

        let metrics = aggregator.performance_metrics(task.id()).unwrap().unwrap();
        assert!((metrics[metric::SUCCESS_RATE] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compare_omits_algorithms_without_results() {
        let (store, executor, aggregator) = fixture();
        let kyber = store.get_algorithm_by_name("Kyber512").unwrap();
        let falcon = store.get_algorithm_by_name("Falcon512").unwrap();
        let idle = store.get_algorithm_by_name("Dilithium2").unwrap();

        completed_task(&store, &executor, "Kyber512", 3);
        completed_task(&store, &executor, "Falcon512", 3);

        let comparison =
            aggregator.compare_algorithms(&[kyber.id(), falcon.id(), idle.id(), 9999]);
        assert_eq!(comparison.requested(), 4);
        assert_eq!(comparison.entries().len(), 2);
        assert_eq!(comparison.entries()[0].algorithm_name(), "Kyber512");
        assert_eq!(comparison.entries()[1].algorithm_name(), "Falcon512");
        assert_eq!(
            comparison.entries()[1].category(),
            AlgorithmCategory::Signature
        );
    }

    #[test]
    fn test_compare_uses_latest_completed_task() {
        let (store, executor, aggregator) = fixture();
        let kyber = store.get_algorithm_by_name("Kyber512").unwrap();

        completed_task(&store, &executor, "Kyber512", 2);
        let second = completed_task(&store, &executor, "Kyber512", 2);

        let comparison = aggregator.compare_algorithms(&[kyber.id()]);
        assert_eq!(comparison.entries()[0].task_id(), second);
    }

    #[test]
    fn test_history_orders_points_and_clamps_window() {
        let (store, executor, aggregator) = fixture();
        let kyber = store.get_algorithm_by_name("Kyber512").unwrap();
        let first = completed_task(&store, &executor, "Kyber512", 3);
        let second = completed_task(&store, &executor, "Kyber512", 3);

        let history = aggregator
            .history(kyber.id(), metric::KEYGEN_TIME, 0)
            .unwrap();
        assert_eq!(history.window_days(), 1);
        assert_eq!(history.points().len(), 2);
        assert_eq!(history.points()[0].task_id(), first);
        assert_eq!(history.points()[1].task_id(), second);
        assert_eq!(history.points()[0].sample_count(), 3);
        assert!(history.points()[0].finished_at() <= history.points()[1].finished_at());

        let clamped = aggregator
            .history(kyber.id(), metric::KEYGEN_TIME, 10_000)
            .unwrap();
        assert_eq!(clamped.window_days(), 365);
    }

    #[test]
    fn test_history_skips_tasks_without_the_metric() {
        let (store, executor, aggregator) = fixture();
        let kyber = store.get_algorithm_by_name("Kyber512").unwrap();
        completed_task(&store, &executor, "Kyber512", 3);

        let history = aggregator.history(kyber.id(), metric::SIGN_TIME, 7).unwrap();
        assert!(history.points().is_empty());

        let err = aggregator
            .history(12_345, metric::KEYGEN_TIME, 7)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_distribution_bins_values() {
        let (store, _executor, aggregator) = fixture();
        let algorithm = store.get_algorithm_by_name("Kyber512").unwrap();
        let task = store
            .insert_task(TaskBuilder::new(algorithm.id(), "hist", 5).build())
            .unwrap();
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let samples = values
            .iter()
            .enumerate()
            .map(|(round, value)| {
                SampleBuilder::new(task.id(), metric::KEYGEN_TIME, *value, unit::MS)
                    .round(round as u32 + 1)
                    .build()
            })
            .collect();
        store.append_samples(task.id(), samples).unwrap();

        let distribution = aggregator
            .metric_distribution(task.id(), metric::KEYGEN_TIME, 4)
            .unwrap()
            .unwrap();
        assert!((distribution.min() - 1.0).abs() < f64::EPSILON);
        assert!((distribution.max() - 5.0).abs() < f64::EPSILON);
        assert!((distribution.bin_width() - 1.0).abs() < f64::EPSILON);
        // Maximum lands in the last bin, not past it
        assert_eq!(distribution.counts(), &[1, 1, 1, 2]);
        assert_eq!(distribution.sample_count(), 5);
    }

    #[test]
    fn test_distribution_collapses_constant_values() {
        let (store, _executor, aggregator) = fixture();
        let algorithm = store.get_algorithm_by_name("Kyber512").unwrap();
        let task = store
            .insert_task(TaskBuilder::new(algorithm.id(), "flat", 3).build())
            .unwrap();
        let samples = (1..=3)
            .map(|round| {
                SampleBuilder::new(task.id(), metric::KEYGEN_TIME, 2.0, unit::MS)
                    .round(round)
                    .build()
            })
            .collect();
        store.append_samples(task.id(), samples).unwrap();

        let distribution = aggregator
            .metric_distribution(task.id(), metric::KEYGEN_TIME, 10)
            .unwrap()
            .unwrap();
        assert_eq!(distribution.counts(), &[3]);
        assert!((distribution.bin_width() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distribution_clamps_bins_and_handles_missing() {
        let (store, executor, aggregator) = fixture();
        let task_id = completed_task(&store, &executor, "Kyber512", 2);

        let wide = aggregator
            .metric_distribution(task_id, metric::KEYGEN_TIME, 100_000)
            .unwrap()
            .unwrap();
        assert!(wide.counts().len() <= 100);

        assert!(aggregator
            .metric_distribution(task_id, metric::SIGN_TIME, 10)
            .unwrap()
            .is_none());
        let err = aggregator
            .metric_distribution(777, metric::KEYGEN_TIME, 10)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
