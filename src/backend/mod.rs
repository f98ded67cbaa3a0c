//! Crypto backend selection and dispatch
//!
//! Two interchangeable backends produce [`BenchmarkResult`]s: the native
//! liboqs backend (compiled under the `native` feature) and the
//! deterministic simulator. Selection happens once at engine construction
//! and never fails. When native mode is requested but the library cannot
//! be loaded, the engine degrades to the simulator and says so in the
//! logs, so a benchmark run works the same on a developer laptop and a
//! host with liboqs installed.

pub mod simulated;
pub mod sizes;

#[cfg(feature = "native")]
pub mod native;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{BackendMode, EngineConfig};
use crate::error::Result;
use crate::model::AlgorithmCategory;

#[cfg(feature = "native")]
pub use native::NativeBackend;
pub use simulated::SimulatedBackend;

/// Outcome of a single benchmark round.
///
/// Timings are milliseconds keyed by metric name; sizes are bytes. The
/// executor flattens these into persisted samples, so the pairs keep the
/// order the backend produced them in.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    success: bool,
    timings: Vec<(String, f64)>,
    sizes: Vec<(String, u64)>,
}

impl BenchmarkResult {
    /// Create a result from a backend round.
    #[must_use]
    pub const fn new(
        success: bool,
        timings: Vec<(String, f64)>,
        sizes: Vec<(String, u64)>,
    ) -> Self {
        Self {
            success,
            timings,
            sizes,
        }
    }

    /// Whether the round's correctness check passed.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// All timing measurements in milliseconds.
    #[must_use]
    pub fn timings(&self) -> &[(String, f64)] {
        &self.timings
    }

    /// All artifact sizes in bytes.
    #[must_use]
    pub fn sizes(&self) -> &[(String, u64)] {
        &self.sizes
    }

    /// Look up one timing by metric name.
    #[must_use]
    pub fn timing(&self, name: &str) -> Option<f64> {
        self.timings
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|&(_, value)| value)
    }

    /// Look up one size by metric name.
    #[must_use]
    pub fn size(&self, name: &str) -> Option<u64> {
        self.sizes
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|&(_, value)| value)
    }
}

/// Algorithm names a backend accepts, grouped by category.
#[derive(Debug, Clone, Serialize)]
pub struct SupportedAlgorithms {
    kems: Vec<String>,
    signatures: Vec<String>,
    native: bool,
}

impl SupportedAlgorithms {
    /// Supported key encapsulation mechanisms.
    #[must_use]
    pub fn kems(&self) -> &[String] {
        &self.kems
    }

    /// Supported signature schemes.
    #[must_use]
    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    /// Whether the list came from a native library probe.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        self.native
    }
}

/// The crypto backend an engine runs benchmarks against.
#[derive(Debug)]
pub enum CryptoBackend {
    /// liboqs loaded at runtime
    #[cfg(feature = "native")]
    Native(NativeBackend),
    /// Deterministic performance model
    Simulated(SimulatedBackend),
}

impl CryptoBackend {
    /// Select a backend for the given configuration.
    ///
    /// Never fails: native-mode selection falls back to the simulator when
    /// no liboqs candidate loads (or when the `native` feature is off).
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.backend_mode() {
            BackendMode::Native => {
                #[cfg(feature = "native")]
                {
                    if let Some(backend) = NativeBackend::load(config.library_paths()) {
                        debug!(path = %backend.path().display(), "selected native backend");
                        return Self::Native(backend);
                    }
                    warn!("native liboqs not found, falling back to simulated backend");
                }
                #[cfg(not(feature = "native"))]
                warn!("native backend support not compiled in, using simulated backend");
                Self::Simulated(SimulatedBackend::new(config.simulated_delay()))
            }
            BackendMode::Simulated => {
                debug!("selected simulated backend");
                Self::Simulated(SimulatedBackend::new(config.simulated_delay()))
            }
        }
    }

    /// Benchmark one KEM round (keygen, encapsulate, decapsulate).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BackendCall`] when the backend rejects the
    /// algorithm or a native call fails.
    pub fn test_kem_algorithm(&self, name: &str, binding_name: &str) -> Result<BenchmarkResult> {
        match self {
            #[cfg(feature = "native")]
            Self::Native(backend) => backend.test_kem(name, binding_name),
            Self::Simulated(backend) => {
                let _ = binding_name;
                backend.test_kem(name)
            }
        }
    }

    /// Benchmark one signature round (keygen, sign, verify).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BackendCall`] when the backend rejects the
    /// algorithm or a native call fails.
    pub fn test_signature_algorithm(
        &self,
        name: &str,
        binding_name: &str,
    ) -> Result<BenchmarkResult> {
        match self {
            #[cfg(feature = "native")]
            Self::Native(backend) => backend.test_signature(name, binding_name),
            Self::Simulated(backend) => {
                let _ = binding_name;
                backend.test_signature(name)
            }
        }
    }

    /// Whether this backend accepts `name` in the given category.
    #[must_use]
    pub fn test_availability(&self, name: &str, category: AlgorithmCategory) -> bool {
        match self {
            #[cfg(feature = "native")]
            Self::Native(backend) => match category {
                AlgorithmCategory::Kem => backend.probe_kem(name),
                AlgorithmCategory::Signature => backend.probe_signature(name),
            },
            Self::Simulated(_) => match category {
                AlgorithmCategory::Kem => SimulatedBackend::supports_kem(name),
                AlgorithmCategory::Signature => SimulatedBackend::supports_signature(name),
            },
        }
    }

    /// Enumerate the algorithms this backend accepts.
    #[must_use]
    pub fn list_supported(&self) -> SupportedAlgorithms {
        match self {
            #[cfg(feature = "native")]
            Self::Native(backend) => SupportedAlgorithms {
                kems: backend.supported_kems(),
                signatures: backend.supported_signatures(),
                native: true,
            },
            Self::Simulated(_) => SupportedAlgorithms {
                kems: SimulatedBackend::supported_kems()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                signatures: SimulatedBackend::supported_signatures()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                native: false,
            },
        }
    }

    /// Whether benchmark calls go through a loaded native library.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        match self {
            #[cfg(feature = "native")]
            Self::Native(_) => true,
            Self::Simulated(_) => false,
        }
    }

    /// Short backend name for logs and reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "native")]
            Self::Native(_) => "native",
            Self::Simulated(_) => "simulated",
        }
    }
}

impl std::fmt::Display for CryptoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}
