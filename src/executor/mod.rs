//! Benchmark task execution
//!
//! [`TaskExecutor`] drives one task from claim to terminal status: parse
//! parameters, run the round loop against the crypto backend, persist
//! samples, finish through the store's status transitions. Stop requests
//! act purely through the store CAS; the loop checks the persisted status
//! at round boundaries, and the store itself rejects sample batches for
//! terminal tasks under the same entry lock the stop takes, so a stopped
//! task never gains samples after its `finished_at` timestamp.

pub mod dispatcher;
pub mod progress;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{BenchmarkResult, CryptoBackend};
use crate::error::{Error, Result};
use crate::model::sample::{metric, unit};
use crate::model::{Algorithm, AlgorithmCategory, Sample, Task, TaskStatus};
use crate::store::BenchStore;

/// Error message recorded when a user stop fails a task
pub const STOP_MESSAGE: &str = "stopped by user";

/// Outcome of the round loop, before the terminal transition.
enum RunOutcome {
    Finished,
    Stopped,
}

/// Snapshot of a task combined with its live progress estimate.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusReport {
    task: Task,
    progress: u8,
    sample_count: usize,
}

impl TaskStatusReport {
    /// The task snapshot this report was built from.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Estimated completion percentage, 0 to 100.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Samples persisted for the task so far.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Runs benchmark tasks against a crypto backend and persists the samples.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    store: Arc<BenchStore>,
    backend: Arc<CryptoBackend>,
}

impl TaskExecutor {
    /// Create an executor over a shared store and backend.
    #[must_use]
    pub fn new(store: Arc<BenchStore>, backend: Arc<CryptoBackend>) -> Self {
        Self { store, backend }
    }

    /// Claim a `PENDING` task and run it to a terminal status.
    ///
    /// Idempotent under concurrent calls: the claim succeeds for exactly
    /// one caller; every other caller gets the task's current snapshot
    /// back without side effects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the task does not exist. Execution
    /// problems do not surface as errors here; they fail the task and the
    /// `FAILED` snapshot is returned.
    pub fn run(&self, task_id: u64) -> Result<Task> {
        let task = match self.store.try_start_task(task_id) {
            Ok(task) => task,
            Err(Error::Conflict(_)) => {
                debug!(task_id, "task already claimed, returning snapshot");
                return self.snapshot(task_id);
            }
            Err(error) => return Err(error),
        };

        let Some(algorithm) = self.store.get_algorithm(task.algorithm_id()) else {
            return self
                .store
                .try_fail_task(task_id, &format!("algorithm {} not found", task.algorithm_id()));
        };

        match self.execute(&task, &algorithm) {
            Ok(RunOutcome::Finished) => match self.store.try_complete_task(task_id) {
                Ok(task) => Ok(task),
                Err(Error::Conflict(_)) => {
                    debug!(task_id, "completion lost to a concurrent stop");
                    self.snapshot(task_id)
                }
                Err(error) => Err(error),
            },
            Ok(RunOutcome::Stopped) => {
                info!(task_id, "execution ended by external stop");
                self.snapshot(task_id)
            }
            Err(error) => {
                warn!(task_id, %error, "task execution failed");
                match self.store.try_fail_task(task_id, &error.to_string()) {
                    Ok(task) => Ok(task),
                    Err(Error::Conflict(_)) => self.snapshot(task_id),
                    Err(error) => Err(error),
                }
            }
        }
    }

    /// Request a stop for a running task.
    ///
    /// The task fails immediately through the status CAS; the round loop
    /// observes the lost ownership at its next boundary and discards
    /// whatever it was measuring. A `PENDING` task cannot be stopped,
    /// deleting it is the way to cancel before execution starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task and
    /// [`Error::Conflict`] when the task is not `RUNNING`.
    pub fn stop(&self, task_id: u64) -> Result<Task> {
        let task = self.store.try_fail_task(task_id, STOP_MESSAGE)?;
        info!(task_id, "stop requested");
        Ok(task)
    }

    /// Build a status report with live progress for one task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the task does not exist.
    pub fn status(&self, task_id: u64) -> Result<TaskStatusReport> {
        let task = self.snapshot(task_id)?;
        let sample_count = self.store.sample_count(task_id);
        let progress = progress::estimate(&task, sample_count);
        Ok(TaskStatusReport {
            task,
            progress,
            sample_count,
        })
    }

    fn snapshot(&self, task_id: u64) -> Result<Task> {
        self.store
            .get_task(task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))
    }

    fn execute(&self, task: &Task, algorithm: &Algorithm) -> Result<RunOutcome> {
        let parameters = parse_parameters(task.parameters())?;
        if let Some(parameters) = &parameters {
            debug!(task_id = task.id(), %parameters, "task parameters");
        }

        let rounds = task.rounds();
        info!(
            task_id = task.id(),
            algorithm = algorithm.name(),
            category = %algorithm.category(),
            rounds,
            "starting benchmark run"
        );

        let mut succeeded: u32 = 0;
        for round in 1..=rounds {
            if !self.still_running(task.id()) {
                debug!(task_id = task.id(), round, "stop observed at round boundary");
                return Ok(RunOutcome::Stopped);
            }

            match self.run_round(algorithm) {
                Ok(result) => {
                    let mut samples = round_samples(task.id(), &result, round);
                    if round == 1 {
                        samples.extend(size_samples(task.id(), &result));
                    }
                    if result.success() {
                        succeeded += 1;
                    }
                    // The store rejects the batch once a stop has made the
                    // task terminal, so the round's measurements either
                    // persist before `finished_at` or not at all
                    if !self.persist(task.id(), samples)? {
                        return Ok(RunOutcome::Stopped);
                    }
                }
                Err(Error::BackendCall(message)) => {
                    warn!(task_id = task.id(), round, error = %message, "benchmark round failed");
                }
                Err(error) => return Err(error),
            }
        }

        let success_rate = if rounds == 0 {
            0.0
        } else {
            f64::from(succeeded) * 100.0 / f64::from(rounds)
        };
        let rate_sample =
            Sample::builder(task.id(), metric::SUCCESS_RATE, success_rate, unit::PERCENT).build();
        if !self.persist(task.id(), vec![rate_sample])? {
            return Ok(RunOutcome::Stopped);
        }
        info!(
            task_id = task.id(),
            succeeded, rounds, success_rate, "benchmark run finished"
        );
        Ok(RunOutcome::Finished)
    }

    fn run_round(&self, algorithm: &Algorithm) -> Result<BenchmarkResult> {
        match algorithm.category() {
            AlgorithmCategory::Kem => self
                .backend
                .test_kem_algorithm(algorithm.name(), algorithm.binding_name()),
            AlgorithmCategory::Signature => self
                .backend
                .test_signature_algorithm(algorithm.name(), algorithm.binding_name()),
        }
    }

    /// Append a batch of samples, treating a terminal task as a stop.
    ///
    /// Returns `false` when the store rejected the batch because the task
    /// is no longer `RUNNING`; the caller discards the round.
    fn persist(&self, task_id: u64, samples: Vec<Sample>) -> Result<bool> {
        match self.store.append_samples(task_id, samples) {
            Ok(_) => Ok(true),
            Err(Error::Conflict(_)) => {
                debug!(task_id, "stop observed, discarding unpersisted samples");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    fn still_running(&self, task_id: u64) -> bool {
        self.store
            .get_task(task_id)
            .is_some_and(|task| task.status() == TaskStatus::Running)
    }
}

fn parse_parameters(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|text| {
        serde_json::from_str(text)
            .map_err(|error| Error::Validation(format!("malformed task parameters: {error}")))
    })
    .transpose()
}

fn round_samples(task_id: u64, result: &BenchmarkResult, round: u32) -> Vec<Sample> {
    result
        .timings()
        .iter()
        .map(|(name, value)| {
            Sample::builder(task_id, name.clone(), *value, unit::MS)
                .round(round)
                .build()
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn size_samples(task_id: u64, result: &BenchmarkResult) -> Vec<Sample> {
    result
        .sizes()
        .iter()
        .map(|(name, value)| {
            Sample::builder(task_id, name.clone(), *value as f64, unit::BYTES).build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{AlgorithmBuilder, AlgorithmSource, TaskBuilder};
    use std::time::Duration;

    fn fixture() -> (Arc<BenchStore>, TaskExecutor) {
        let store = Arc::new(BenchStore::new());
        store.seed_default_catalog();
        let config = EngineConfig::builder()
            .simulated_delay(Duration::ZERO)
            .build();
        let backend = Arc::new(CryptoBackend::from_config(&config));
        let executor = TaskExecutor::new(Arc::clone(&store), backend);
        (store, executor)
    }

    fn create_task(store: &BenchStore, algorithm_name: &str, rounds: u32) -> Task {
        let algorithm = store.get_algorithm_by_name(algorithm_name).unwrap();
        store
            .insert_task(TaskBuilder::new(algorithm.id(), "bench", rounds).build())
            .unwrap()
    }

    #[test]
    fn test_run_produces_full_sample_schema() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Kyber512", 3);

        let finished = executor.run(task.id()).unwrap();
        assert_eq!(finished.status(), TaskStatus::Completed);
        assert!(finished.finished_at().is_some());

        // 3 rounds x 3 timings, 3 sizes from round one, 1 success rate
        assert_eq!(store.sample_count(task.id()), 13);

        let keygen = store.samples_for_metric(task.id(), metric::KEYGEN_TIME);
        assert_eq!(keygen.len(), 3);
        assert_eq!(keygen[0].round(), Some(1));
        assert_eq!(keygen[2].round(), Some(3));
        assert!(keygen.iter().all(|sample| sample.unit() == unit::MS));

        let sizes = store.samples_for_metric(task.id(), metric::PUBLIC_KEY_SIZE);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].round(), None);
        assert_eq!(sizes[0].unit(), unit::BYTES);

        let rate = store.samples_for_metric(task.id(), metric::SUCCESS_RATE);
        assert_eq!(rate.len(), 1);
        assert!((rate[0].value() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_signature_task_uses_signature_metrics() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Falcon512", 2);

        executor.run(task.id()).unwrap();

        assert_eq!(
            store.samples_for_metric(task.id(), metric::SIGN_TIME).len(),
            2
        );
        assert_eq!(
            store
                .samples_for_metric(task.id(), metric::SIGNATURE_SIZE)
                .len(),
            1
        );
        assert!(store
            .samples_for_metric(task.id(), metric::ENCAPS_TIME)
            .is_empty());
    }

    #[test]
    fn test_run_is_idempotent() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Kyber768", 2);

        executor.run(task.id()).unwrap();
        let count = store.sample_count(task.id());

        let again = executor.run(task.id()).unwrap();
        assert_eq!(again.status(), TaskStatus::Completed);
        assert_eq!(store.sample_count(task.id()), count);
    }

    #[test]
    fn test_unsupported_algorithm_completes_with_zero_rate() {
        let (store, executor) = fixture();
        let rsa = store
            .register_algorithm(
                AlgorithmBuilder::new(
                    "RSA-2048",
                    AlgorithmCategory::Kem,
                    AlgorithmSource::Liboqs,
                    "OQS_KEM_rsa_2048",
                )
                .build(),
            )
            .unwrap();
        let task = store
            .insert_task(TaskBuilder::new(rsa.id(), "classical", 4).build())
            .unwrap();

        let finished = executor.run(task.id()).unwrap();
        // Every round fails but the run itself finishes
        assert_eq!(finished.status(), TaskStatus::Completed);

        let samples = store.samples_for_task(task.id());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric(), metric::SUCCESS_RATE);
        assert!((samples[0].value() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_parameters_fail_the_task() {
        let (store, executor) = fixture();
        let algorithm = store.get_algorithm_by_name("Dilithium2").unwrap();
        let task = store
            .insert_task(
                TaskBuilder::new(algorithm.id(), "bad-params", 3)
                    .parameters_json("{not json")
                    .build(),
            )
            .unwrap();

        let finished = executor.run(task.id()).unwrap();
        assert_eq!(finished.status(), TaskStatus::Failed);
        assert!(finished.error().unwrap().contains("malformed task parameters"));
        assert_eq!(store.sample_count(task.id()), 0);
    }

    #[test]
    fn test_stop_pending_task_conflicts() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Kyber512", 5);

        let err = executor.stop(task.id()).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // The pending task stays runnable
        let finished = executor.run(task.id()).unwrap();
        assert_eq!(finished.status(), TaskStatus::Completed);
        assert!(store.sample_count(task.id()) > 0);
    }

    #[test]
    fn test_stop_terminal_task_conflicts() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Kyber512", 1);
        executor.run(task.id()).unwrap();

        let err = executor.stop(task.id()).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_status_report_progress() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Kyber512", 2);

        let report = executor.status(task.id()).unwrap();
        assert_eq!(report.progress(), 0);
        assert_eq!(report.sample_count(), 0);

        executor.run(task.id()).unwrap();
        let report = executor.status(task.id()).unwrap();
        assert_eq!(report.progress(), 100);
        assert_eq!(report.sample_count(), 10);
        assert_eq!(report.task().status(), TaskStatus::Completed);
    }

    #[test]
    fn test_zero_round_task_records_zero_rate() {
        let (store, executor) = fixture();
        let task = create_task(&store, "Kyber512", 0);

        let finished = executor.run(task.id()).unwrap();
        assert_eq!(finished.status(), TaskStatus::Completed);

        let samples = store.samples_for_task(task.id());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric(), metric::SUCCESS_RATE);
        assert!((samples[0].value() - 0.0).abs() < f64::EPSILON);
    }
}
