//! Summary statistics over metric samples
//!
//! Mean, median and standard deviation for one metric's sample values.
//! The standard deviation is the sample form (n - 1 denominator); asking
//! for it with fewer than two samples is a [`Error::Statistics`] at this
//! level, which callers recover to zero when a single round is all a task
//! produced.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Headline statistics for one metric of one task.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStatistics {
    mean: f64,
    median: f64,
    std_dev: f64,
    min: f64,
    max: f64,
    sample_count: usize,
}

impl SummaryStatistics {
    /// Arithmetic mean.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Middle value; the average of the two middle values for an even
    /// sample count.
    #[must_use]
    pub const fn median(&self) -> f64 {
        self.median
    }

    /// Sample standard deviation, zero when fewer than two samples exist.
    #[must_use]
    pub const fn std_dev(&self) -> f64 {
        self.std_dev
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

    /// Number of values the statistics were computed from.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Sample standard deviation (n - 1 denominator) around a known mean.
///
/// # Errors
///
/// Returns [`Error::Statistics`] for fewer than two values; dispersion is
/// undefined there.
#[allow(clippy::cast_precision_loss)]
pub fn sample_std_dev(values: &[f64], mean: f64) -> Result<f64> {
    if values.len() < 2 {
        return Err(Error::Statistics(format!(
            "sample standard deviation needs at least 2 values, got {}",
            values.len()
        )));
    }
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Compute summary statistics for one metric's values.
///
/// Returns `None` for an empty slice. A single value yields a summary
/// with zero standard deviation; the underlying [`Error::Statistics`] is
/// logged and recovered here because one completed round is still a
/// reportable result.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_summary(values: &[f64]) -> Option<SummaryStatistics> {
    if values.is_empty() {
        return None;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let std_dev = match sample_std_dev(values, mean) {
        Ok(std_dev) => std_dev,
        Err(error) => {
            debug!(%error, "standard deviation unavailable, reporting zero");
            0.0
        }
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if sorted.len() % 2 == 0 {
        let mid = sorted.len() / 2;
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    Some(SummaryStatistics {
        mean,
        median,
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        sample_count: values.len(),
    })
}
