//! Benchmark Schema
//!
//! Data structures shared by the store, the executor and the aggregator.
//!
//! ## Schema Overview
//!
//! ```text
//! Algorithm (1) ──< Task (N)
//!                     │
//!                     └──< Sample (N) [append-only, cascade-deleted]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pqbench::model::{Algorithm, AlgorithmCategory, AlgorithmSource, Sample, Task, TaskStatus};
//! use pqbench::model::sample::{metric, unit};
//!
//! // Catalog entry
//! let algorithm = Algorithm::new(
//!     "Kyber512",
//!     AlgorithmCategory::Kem,
//!     AlgorithmSource::Liboqs,
//!     "OQS_KEM_kyber_512",
//! );
//!
//! // One benchmark request against it
//! let mut task = Task::new(algorithm.id(), "kyber-baseline", 100);
//! task.start();
//! assert_eq!(task.status(), TaskStatus::Running);
//!
//! // A per-round observation
//! let sample = Sample::builder(task.id(), metric::KEYGEN_TIME, 0.52, unit::MS)
//!     .round(1)
//!     .build();
//! assert_eq!(sample.round(), Some(1));
//! ```

pub mod algorithm;
pub mod sample;
pub mod task;

pub use algorithm::{
    default_catalog, Algorithm, AlgorithmBuilder, AlgorithmCategory, AlgorithmSource,
};
pub use sample::{Sample, SampleBuilder};
pub use task::{Task, TaskBuilder, TaskStatus};
