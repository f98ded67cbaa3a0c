//! Sample - one persisted metric observation for a task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric names emitted by the benchmark round loop.
///
/// The schema is fixed: timing metrics carry unit "ms" and a round number,
/// size metrics carry unit "bytes" and no round, `success_rate` carries
/// unit "%" and no round.
pub mod metric {
    /// Key generation wall time (ms, per round)
    pub const KEYGEN_TIME: &str = "keygen_time";
    /// KEM encapsulation wall time (ms, per round)
    pub const ENCAPS_TIME: &str = "encaps_time";
    /// KEM decapsulation wall time (ms, per round)
    pub const DECAPS_TIME: &str = "decaps_time";
    /// Signature creation wall time (ms, per round)
    pub const SIGN_TIME: &str = "sign_time";
    /// Signature verification wall time (ms, per round)
    pub const VERIFY_TIME: &str = "verify_time";
    /// Public key length (bytes, once per task)
    pub const PUBLIC_KEY_SIZE: &str = "public_key_size";
    /// Secret key length (bytes, once per task)
    pub const PRIVATE_KEY_SIZE: &str = "private_key_size";
    /// Ciphertext length (bytes, once per task)
    pub const CIPHERTEXT_SIZE: &str = "ciphertext_size";
    /// Signature length (bytes, once per task)
    pub const SIGNATURE_SIZE: &str = "signature_size";
    /// Percentage of successful rounds (%, once per task)
    pub const SUCCESS_RATE: &str = "success_rate";
}

/// Measurement units used by the fixed metric schema.
pub mod unit {
    /// Milliseconds
    pub const MS: &str = "ms";
    /// Bytes
    pub const BYTES: &str = "bytes";
    /// Percent
    pub const PERCENT: &str = "%";
}

/// Sample represents a single metric observation.
///
/// Samples are append-only: they are created while their task is running and
/// never mutated afterward. They are owned by the task and removed with it.
///
/// ## Time-Series Queries
///
/// Per-round timing samples carry their round number as the sort key; size
/// and `success_rate` samples are round-invariant and carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    task_id: u64,
    metric: String,
    value: f64,
    unit: String,
    round: Option<u32>,
    created_at: DateTime<Utc>,
}

impl Sample {
    /// Create a new round-invariant sample.
    ///
    /// # Arguments
    ///
    /// * `task_id` - ID of the owning task
    /// * `metric` - Metric name (see [`metric`])
    /// * `value` - Observed value
    /// * `unit` - Measurement unit (see [`unit`])
    #[must_use]
    pub fn new(
        task_id: u64,
        metric: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            metric: metric.into(),
            value,
            unit: unit.into(),
            round: None,
            created_at: Utc::now(),
        }
    }

    /// Create a builder for constructing a sample with optional fields.
    #[must_use]
    pub fn builder(
        task_id: u64,
        metric: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> SampleBuilder {
        SampleBuilder::new(task_id, metric, value, unit)
    }

    /// Get the owning task ID.
    #[must_use]
    pub const fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Get the metric name.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Get the observed value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the measurement unit.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Get the round number, if this is a per-round observation.
    #[must_use]
    pub const fn round(&self) -> Option<u32> {
        self.round
    }

    /// Get the timestamp when the sample was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builder for [`Sample`].
#[derive(Debug)]
pub struct SampleBuilder {
    task_id: u64,
    metric: String,
    value: f64,
    unit: String,
    round: Option<u32>,
    created_at: DateTime<Utc>,
}

impl SampleBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        task_id: u64,
        metric: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            metric: metric.into(),
            value,
            unit: unit.into(),
            round: None,
            created_at: Utc::now(),
        }
    }

    /// Tag the sample with a round number.
    #[must_use]
    pub const fn round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    /// Set a custom timestamp (useful for restoring persisted samples).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the [`Sample`].
    #[must_use]
    pub fn build(self) -> Sample {
        Sample {
            task_id: self.task_id,
            metric: self.metric,
            value: self.value,
            unit: self.unit,
            round: self.round,
            created_at: self.created_at,
        }
    }
}
