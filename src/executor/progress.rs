//! Progress estimation for benchmark tasks
//!
//! Progress is inferred from how many samples a task has persisted against
//! the count a full run would produce, so it needs no side channel from
//! the round loop. Estimates cap at 95 percent: only an actual
//! `COMPLETED` status reports 100. A `FAILED` task keeps its last
//! estimate, since its sample series stops growing.

use crate::model::{Task, TaskStatus};

/// Timing samples persisted per round
const ROUND_METRICS: u64 = 3;
/// One-time samples persisted outside the round loop
const ONE_TIME_METRICS: u64 = 3;
/// Estimates never report done; completion comes from the status
const ESTIMATE_CAP: u64 = 95;

/// Samples a full run of `rounds` rounds is expected to produce.
#[must_use]
pub fn expected_samples(rounds: u32) -> u64 {
    u64::from(rounds) * ROUND_METRICS + ONE_TIME_METRICS
}

/// Estimate completion percentage from a task's persisted sample count.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn estimate(task: &Task, observed_samples: usize) -> u8 {
    match task.status() {
        TaskStatus::Pending => 0,
        TaskStatus::Completed => 100,
        TaskStatus::Running | TaskStatus::Failed => {
            let expected = expected_samples(task.rounds());
            let ratio = (observed_samples as u64).saturating_mul(100) / expected;
            ratio.min(ESTIMATE_CAP) as u8
        }
    }
}
