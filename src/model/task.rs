//! Task - one benchmark execution request and its lifecycle

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task.
///
/// Transitions are monotone: `Pending -> Running -> {Completed | Failed}`.
/// Terminal states never re-enter `Running`; a finished benchmark is re-run
/// by creating a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Task is created but not yet started.
    Pending,
    /// Task is currently executing rounds.
    Running,
    /// Task executed all rounds and recorded its success rate.
    Completed,
    /// Task hit an unrecoverable error or was stopped.
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        })
    }
}

/// Task represents a single benchmark request against one algorithm.
///
/// A task is created `Pending`, mutated only by the executor while `Running`
/// or by a stop request, and owns its samples: deleting the task removes them.
///
/// Parameters are kept as raw JSON text the way an external store would hold
/// them; the executor parses them when the task runs and fails the task on
/// malformed input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    id: u64,
    algorithm_id: u64,
    name: String,
    rounds: u32,
    parameters: Option<String>,
    status: TaskStatus,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new task in `Pending` status.
    ///
    /// The id is 0 until the store assigns one at insertion.
    ///
    /// # Arguments
    ///
    /// * `algorithm_id` - Catalog ID of the algorithm to benchmark
    /// * `name` - Human-readable task name
    /// * `rounds` - Requested number of benchmark rounds
    #[must_use]
    pub fn new(algorithm_id: u64, name: impl Into<String>, rounds: u32) -> Self {
        Self::builder(algorithm_id, name, rounds).build()
    }

    /// Create a builder for constructing a task with optional fields.
    #[must_use]
    pub fn builder(algorithm_id: u64, name: impl Into<String>, rounds: u32) -> TaskBuilder {
        TaskBuilder::new(algorithm_id, name, rounds)
    }

    /// Get the store-assigned ID (0 until inserted).
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the benchmarked algorithm's catalog ID.
    #[must_use]
    pub const fn algorithm_id(&self) -> u64 {
        self.algorithm_id
    }

    /// Get the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the requested round count.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Get the raw JSON parameter text, if any.
    #[must_use]
    pub fn parameters(&self) -> Option<&str> {
        self.parameters.as_deref()
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Get the recorded error message, if the task failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the start timestamp, if the task has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the finish timestamp, if the task has reached a terminal state.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Start the task, transitioning `Pending -> Running`.
    ///
    /// Sets `started_at` to now. Callers must have checked the current
    /// status; the store's compare-and-set operations do.
    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Complete the task, transitioning `Running -> Completed`.
    ///
    /// Sets `finished_at` to now.
    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Fail the task, recording the error message and `finished_at`.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Builder for [`Task`].
///
/// The status and timestamp setters exist for restoring tasks from an
/// external store; new work should go through [`Task::new`] and the
/// lifecycle methods.
#[derive(Debug)]
pub struct TaskBuilder {
    algorithm_id: u64,
    name: String,
    rounds: u32,
    parameters: Option<String>,
    status: TaskStatus,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(algorithm_id: u64, name: impl Into<String>, rounds: u32) -> Self {
        Self {
            algorithm_id,
            name: name.into(),
            rounds,
            parameters: None,
            status: TaskStatus::Pending,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Set the raw JSON parameter text.
    #[must_use]
    pub fn parameters_json(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Set the status (restore path).
    #[must_use]
    pub const fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the recorded error message (restore path).
    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Set a custom creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set the start timestamp (restore path).
    #[must_use]
    pub const fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Set the finish timestamp (restore path).
    #[must_use]
    pub const fn finished_at(mut self, finished_at: DateTime<Utc>) -> Self {
        self.finished_at = Some(finished_at);
        self
    }

    /// Build the [`Task`].
    #[must_use]
    pub fn build(self) -> Task {
        Task {
            id: 0,
            algorithm_id: self.algorithm_id,
            name: self.name,
            rounds: self.rounds,
            parameters: self.parameters,
            status: self.status,
            error: self.error,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_starts_pending() {
        let task = Task::new(1, "kyber-baseline", 100);
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.rounds(), 100);
        assert!(task.started_at().is_none());
        assert!(task.finished_at().is_none());
    }

    #[test]
    fn test_task_lifecycle_completed() {
        let mut task = Task::new(1, "kyber-baseline", 10);
        task.start();
        assert_eq!(task.status(), TaskStatus::Running);
        assert!(task.started_at().is_some());

        task.complete();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(task.finished_at().is_some());
        assert!(task.error().is_none());
    }

    #[test]
    fn test_task_lifecycle_failed() {
        let mut task = Task::new(1, "kyber-baseline", 10);
        task.start();
        task.fail("stopped by user");
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("stopped by user"));
        assert!(task.finished_at().is_some());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serde_uppercase() {
        let json = serde_json::to_string(&TaskStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        let back: TaskStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(back, TaskStatus::Failed);
    }

    #[test]
    fn test_builder_restore_path() {
        let task = Task::builder(3, "restored", 5)
            .parameters_json(r#"{"message_size":1024}"#)
            .status(TaskStatus::Failed)
            .error("backend call failed")
            .build();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.parameters(), Some(r#"{"message_size":1024}"#));
        assert_eq!(task.error(), Some("backend call failed"));
    }
}
