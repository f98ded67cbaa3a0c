//! Benchmark store - concurrent in-memory persistence
//!
//! Holds the algorithm catalog, tasks and samples behind `DashMap`s so the
//! executor, dispatcher workers and API readers share one store without a
//! global lock. Status transitions go through compare-and-set methods that
//! hold the task's shard entry while checking the current status, which is
//! what makes duplicate run claims and stop/finish races resolve to
//! exactly one winner.
//!
//! Data is lost on process restart. Tasks restored from an external
//! snapshot can be rebuilt through the model builders' restore setters.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{default_catalog, Algorithm, AlgorithmCategory, Sample, Task, TaskStatus};

/// Predicate for task listing queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    status: Option<TaskStatus>,
    algorithm_id: Option<u64>,
}

impl TaskFilter {
    /// Filter matching every task.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: None,
            algorithm_id: None,
        }
    }

    /// Restrict to tasks in the given status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to tasks of the given algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm_id: u64) -> Self {
        self.algorithm_id = Some(algorithm_id);
        self
    }

    fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status() == status)
            && self
                .algorithm_id
                .map_or(true, |id| task.algorithm_id() == id)
    }
}

/// Concurrent store for algorithms, tasks and their samples.
#[derive(Debug, Default)]
pub struct BenchStore {
    algorithms: DashMap<u64, Algorithm>,
    /// Name uniqueness index; an entry here is the registration claim.
    algorithm_names: DashMap<String, u64>,
    tasks: DashMap<u64, Task>,
    samples: DashMap<u64, Vec<Sample>>,
    next_algorithm_id: AtomicU64,
    next_task_id: AtomicU64,
}

impl BenchStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered algorithms.
    #[must_use]
    pub fn algorithm_count(&self) -> usize {
        self.algorithms.len()
    }

    /// Number of tasks, in any status.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Total number of persisted samples across all tasks.
    #[must_use]
    pub fn total_sample_count(&self) -> usize {
        self.samples.iter().map(|entry| entry.value().len()).sum()
    }

    // ------------------------------------------------------------------
    // Algorithm catalog
    // ------------------------------------------------------------------

    /// Validate an algorithm, assign its id and insert it.
    ///
    /// The name claim and the insert happen under the name entry's lock,
    /// so concurrent registrations of the same name resolve to exactly one
    /// winner. Deactivation keeps the claim: a retired name cannot be
    /// re-registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the record is malformed and
    /// [`Error::Conflict`] when the name is already registered.
    pub fn register_algorithm(&self, mut algorithm: Algorithm) -> Result<Algorithm> {
        algorithm.validate()?;
        let claim = match self.algorithm_names.entry(algorithm.name().to_string()) {
            Entry::Occupied(_) => {
                return Err(Error::Conflict(format!(
                    "algorithm {} is already registered",
                    algorithm.name()
                )));
            }
            Entry::Vacant(claim) => claim,
        };
        let id = self.next_algorithm_id.fetch_add(1, Ordering::Relaxed) + 1;
        algorithm.assign_id(id);
        info!(id, name = algorithm.name(), "registered algorithm");
        self.algorithms.insert(id, algorithm.clone());
        claim.insert(id);
        Ok(algorithm)
    }

    /// Look up an algorithm by id.
    #[must_use]
    pub fn get_algorithm(&self, id: u64) -> Option<Algorithm> {
        self.algorithms.get(&id).map(|entry| entry.value().clone())
    }

    /// Look up an algorithm by its unique name.
    #[must_use]
    pub fn get_algorithm_by_name(&self, name: &str) -> Option<Algorithm> {
        let id = *self.algorithm_names.get(name)?;
        self.get_algorithm(id)
    }

    /// List algorithms ordered by id, optionally narrowed to one category
    /// and to active entries.
    #[must_use]
    pub fn list_algorithms(
        &self,
        category: Option<AlgorithmCategory>,
        active_only: bool,
    ) -> Vec<Algorithm> {
        let mut algorithms: Vec<Algorithm> = self
            .algorithms
            .iter()
            .filter(|entry| {
                let algorithm = entry.value();
                category.map_or(true, |c| algorithm.category() == c)
                    && (!active_only || algorithm.is_active())
            })
            .map(|entry| entry.value().clone())
            .collect();
        algorithms.sort_by_key(Algorithm::id);
        algorithms
    }

    /// Mark an algorithm inactive. Existing tasks and samples stay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the id is unknown.
    pub fn deactivate_algorithm(&self, id: u64) -> Result<Algorithm> {
        let mut entry = self
            .algorithms
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("algorithm {id} not found")))?;
        entry.value_mut().deactivate();
        info!(id, name = entry.value().name(), "deactivated algorithm");
        Ok(entry.value().clone())
    }

    /// Insert the default NIST catalog, skipping names already present.
    ///
    /// Returns the number of algorithms inserted. Calling this twice is a
    /// no-op the second time.
    pub fn seed_default_catalog(&self) -> usize {
        let mut inserted = 0;
        for algorithm in default_catalog() {
            match self.register_algorithm(algorithm) {
                Ok(_) => inserted += 1,
                Err(Error::Conflict(_)) => {}
                Err(error) => warn!(%error, "default catalog entry rejected"),
            }
        }
        if inserted > 0 {
            info!(inserted, "seeded default algorithm catalog");
        }
        inserted
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Assign an id to a task and insert it in `PENDING` status.
    ///
    /// A deactivated algorithm is treated the same as a missing one: it no
    /// longer accepts new tasks, only queries against its history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the referenced algorithm does not
    /// exist or is deactivated.
    pub fn insert_task(&self, mut task: Task) -> Result<Task> {
        let algorithm = self.get_algorithm(task.algorithm_id()).ok_or_else(|| {
            Error::NotFound(format!("algorithm {} not found", task.algorithm_id()))
        })?;
        if !algorithm.is_active() {
            return Err(Error::NotFound(format!(
                "algorithm {} is deactivated",
                algorithm.name()
            )));
        }
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed) + 1;
        task.assign_id(id);
        debug!(
            id,
            algorithm = algorithm.name(),
            rounds = task.rounds(),
            "created task"
        );
        self.tasks.insert(id, task.clone());
        Ok(task)
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get_task(&self, id: u64) -> Option<Task> {
        self.tasks.get(&id).map(|entry| entry.value().clone())
    }

    /// List tasks matching `filter`, newest first, skipping `offset`
    /// matches and returning at most `limit`.
    #[must_use]
    pub fn list_tasks(&self, filter: &TaskFilter, offset: usize, limit: usize) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        tasks.into_iter().skip(offset).take(limit).collect()
    }

    /// Claim a `PENDING` task for execution, moving it to `RUNNING`.
    ///
    /// The check and the transition happen under the task's entry lock, so
    /// exactly one of several concurrent claims wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id and
    /// [`Error::Conflict`] when the task is not `PENDING`.
    pub fn try_start_task(&self, id: u64) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id} not found")))?;
        let task = entry.value_mut();
        if task.status() != TaskStatus::Pending {
            return Err(Error::Conflict(format!(
                "task {id} is {} and cannot be claimed",
                task.status()
            )));
        }
        task.start();
        debug!(id, "task claimed for execution");
        Ok(task.clone())
    }

    /// Move a `RUNNING` task to `COMPLETED`.
    ///
    /// Loses deliberately to a stop that already failed the task: the
    /// status is re-checked under the entry lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id and
    /// [`Error::Conflict`] when the task is not `RUNNING`.
    pub fn try_complete_task(&self, id: u64) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id} not found")))?;
        let task = entry.value_mut();
        if task.status() != TaskStatus::Running {
            return Err(Error::Conflict(format!(
                "task {id} is {} and cannot complete",
                task.status()
            )));
        }
        task.complete();
        info!(id, "task completed");
        Ok(task.clone())
    }

    /// Move a `RUNNING` task to `FAILED` with an error message. Used both
    /// for execution errors and for user stops.
    ///
    /// `PENDING` tasks cannot fail: they have no owner yet, and deleting
    /// them is the way to cancel before execution starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id and
    /// [`Error::Conflict`] when the task is not `RUNNING`.
    pub fn try_fail_task(&self, id: u64, message: &str) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id} not found")))?;
        let task = entry.value_mut();
        if task.status() != TaskStatus::Running {
            return Err(Error::Conflict(format!(
                "task {id} is {} and cannot fail",
                task.status()
            )));
        }
        task.fail(message);
        info!(id, error = message, "task failed");
        Ok(task.clone())
    }

    /// Delete a non-running task and every sample it produced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id and
    /// [`Error::Conflict`] when the task is currently `RUNNING`.
    pub fn delete_task(&self, id: u64) -> Result<()> {
        let removed = self
            .tasks
            .remove_if(&id, |_, task| task.status() != TaskStatus::Running);
        if removed.is_some() {
            let samples = self
                .samples
                .remove(&id)
                .map_or(0, |(_, samples)| samples.len());
            debug!(id, samples, "deleted task");
            return Ok(());
        }
        if self.tasks.contains_key(&id) {
            Err(Error::Conflict(format!(
                "task {id} is running and cannot be deleted"
            )))
        } else {
            Err(Error::NotFound(format!("task {id} not found")))
        }
    }

    // ------------------------------------------------------------------
    // Samples
    // ------------------------------------------------------------------

    /// Append a batch of samples to a task's series.
    ///
    /// Holds the task entry for the duration of the append, so a concurrent
    /// delete cannot leave orphaned samples behind and a stop or completion
    /// cannot land between the status check and the write: the batch either
    /// persists before the task turns terminal or is rejected outright.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the task does not exist and
    /// [`Error::Conflict`] when the task is already terminal.
    pub fn append_samples(&self, task_id: u64, samples: Vec<Sample>) -> Result<usize> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))?;
        if task.status().is_terminal() {
            return Err(Error::Conflict(format!(
                "task {task_id} is {} and no longer accepts samples",
                task.status()
            )));
        }
        let count = samples.len();
        self.samples.entry(task_id).or_default().extend(samples);
        drop(task);
        Ok(count)
    }

    /// All samples recorded for a task, in insertion order.
    #[must_use]
    pub fn samples_for_task(&self, task_id: u64) -> Vec<Sample> {
        self.samples
            .get(&task_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Samples recorded for one metric of a task, in insertion order.
    #[must_use]
    pub fn samples_for_metric(&self, task_id: u64, metric: &str) -> Vec<Sample> {
        self.samples
            .get(&task_id)
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|sample| sample.metric() == metric)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of samples recorded for a task.
    #[must_use]
    pub fn sample_count(&self, task_id: u64) -> usize {
        self.samples
            .get(&task_id)
            .map_or(0, |entry| entry.value().len())
    }

    // ------------------------------------------------------------------
    // Aggregation queries
    // ------------------------------------------------------------------

    /// Most recently finished `COMPLETED` task for an algorithm.
    #[must_use]
    pub fn latest_completed_task(&self, algorithm_id: u64) -> Option<Task> {
        self.tasks
            .iter()
            .filter(|entry| {
                let task = entry.value();
                task.algorithm_id() == algorithm_id && task.status() == TaskStatus::Completed
            })
            .map(|entry| entry.value().clone())
            .max_by(|a, b| {
                a.finished_at()
                    .cmp(&b.finished_at())
                    .then_with(|| a.id().cmp(&b.id()))
            })
    }

    /// `COMPLETED` tasks for an algorithm that finished at or after
    /// `cutoff`, ordered by finish time ascending.
    #[must_use]
    pub fn completed_tasks_since(&self, algorithm_id: u64, cutoff: DateTime<Utc>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| {
                let task = entry.value();
                task.algorithm_id() == algorithm_id
                    && task.status() == TaskStatus::Completed
                    && task.finished_at().is_some_and(|finished| finished >= cutoff)
            })
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by(|a, b| {
            a.finished_at()
                .cmp(&b.finished_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        tasks
    }
}
