//! Simulated crypto backend
//!
//! Produces synthetic timings that are deterministic in distribution: a
//! fixed per-algorithm base time, scaled by a security-level multiplier and
//! perturbed by bounded multiplicative noise. Sizes come straight from the
//! size table and every call reports success. This keeps development and CI
//! machines without liboqs fully functional.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::trace;

use super::sizes::{kem_sizes, sig_sizes};
use super::BenchmarkResult;
use crate::error::{Error, Result};
use crate::model::sample::metric;

/// KEM base times in ms at multiplier 1.0 (keygen, encaps, decaps)
const KEM_BASE_MS: [f64; 3] = [0.5, 0.3, 0.3];

/// Signature base times in ms at multiplier 1.0 (keygen, sign, verify)
const SIG_BASE_MS: [f64; 3] = [0.8, 0.6, 0.2];

/// Multiplicative noise bounds applied to every synthetic timing
const NOISE_LOW: f64 = 0.8;
const NOISE_HIGH: f64 = 1.2;

/// KEM algorithms the simulator understands
const SUPPORTED_KEMS: [&str; 3] = ["Kyber512", "Kyber768", "Kyber1024"];

/// Signature algorithms the simulator understands
const SUPPORTED_SIGNATURES: [&str; 5] = [
    "Dilithium2",
    "Dilithium3",
    "Dilithium5",
    "Falcon512",
    "Falcon1024",
];

/// Deterministic-in-distribution synthetic backend.
///
/// The optional per-call delay stands in for native compute time so that
/// status polling and cooperative stop behave like they would against the
/// real library.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    delay: Duration,
}

impl SimulatedBackend {
    /// Create a simulated backend with the given per-call delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// KEM algorithms the simulator understands.
    #[must_use]
    pub const fn supported_kems() -> &'static [&'static str] {
        &SUPPORTED_KEMS
    }

    /// Signature algorithms the simulator understands.
    #[must_use]
    pub const fn supported_signatures() -> &'static [&'static str] {
        &SUPPORTED_SIGNATURES
    }

    /// Whether the simulator knows the named KEM.
    #[must_use]
    pub fn supports_kem(name: &str) -> bool {
        SUPPORTED_KEMS.contains(&name)
    }

    /// Whether the simulator knows the named signature scheme.
    #[must_use]
    pub fn supports_signature(name: &str) -> bool {
        SUPPORTED_SIGNATURES.contains(&name)
    }

    /// Run one synthetic KEM round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendCall`] for algorithms outside the supported
    /// set, which the executor counts as a failed round.
    pub fn test_kem(&self, name: &str) -> Result<BenchmarkResult> {
        if !Self::supports_kem(name) {
            return Err(Error::BackendCall(format!(
                "unsupported KEM algorithm: {name}"
            )));
        }
        self.simulate_compute();

        let multiplier = kem_multiplier(name);
        let mut rng = rand::thread_rng();
        let timings = vec![
            (
                metric::KEYGEN_TIME.to_string(),
                jitter(&mut rng, KEM_BASE_MS[0] * multiplier),
            ),
            (
                metric::ENCAPS_TIME.to_string(),
                jitter(&mut rng, KEM_BASE_MS[1] * multiplier),
            ),
            (
                metric::DECAPS_TIME.to_string(),
                jitter(&mut rng, KEM_BASE_MS[2] * multiplier),
            ),
        ];

        let sizes = kem_sizes(name);
        let size_values = vec![
            (metric::PUBLIC_KEY_SIZE.to_string(), sizes.public_key as u64),
            (
                metric::PRIVATE_KEY_SIZE.to_string(),
                sizes.secret_key as u64,
            ),
            (metric::CIPHERTEXT_SIZE.to_string(), sizes.ciphertext as u64),
        ];

        trace!(algorithm = name, multiplier, "simulated KEM round");
        Ok(BenchmarkResult::new(true, timings, size_values))
    }

    /// Run one synthetic signature round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendCall`] for algorithms outside the supported
    /// set.
    pub fn test_signature(&self, name: &str) -> Result<BenchmarkResult> {
        if !Self::supports_signature(name) {
            return Err(Error::BackendCall(format!(
                "unsupported signature algorithm: {name}"
            )));
        }
        self.simulate_compute();

        let multiplier = sig_multiplier(name);
        let mut rng = rand::thread_rng();
        let timings = vec![
            (
                metric::KEYGEN_TIME.to_string(),
                jitter(&mut rng, SIG_BASE_MS[0] * multiplier),
            ),
            (
                metric::SIGN_TIME.to_string(),
                jitter(&mut rng, SIG_BASE_MS[1] * multiplier),
            ),
            (
                metric::VERIFY_TIME.to_string(),
                jitter(&mut rng, SIG_BASE_MS[2] * multiplier),
            ),
        ];

        let sizes = sig_sizes(name);
        let size_values = vec![
            (metric::PUBLIC_KEY_SIZE.to_string(), sizes.public_key as u64),
            (
                metric::PRIVATE_KEY_SIZE.to_string(),
                sizes.secret_key as u64,
            ),
            (metric::SIGNATURE_SIZE.to_string(), sizes.signature as u64),
        ];

        trace!(algorithm = name, multiplier, "simulated signature round");
        Ok(BenchmarkResult::new(true, timings, size_values))
    }

    fn simulate_compute(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

fn jitter(rng: &mut impl Rng, base_ms: f64) -> f64 {
    base_ms * rng.gen_range(NOISE_LOW..=NOISE_HIGH)
}

/// Security-level multiplier for Kyber-style names.
fn kem_multiplier(name: &str) -> f64 {
    if name.contains("512") {
        1.0
    } else if name.contains("768") {
        1.5
    } else if name.contains("1024") {
        2.0
    } else {
        1.0
    }
}

/// Security-level multiplier for Dilithium and Falcon names.
fn sig_multiplier(name: &str) -> f64 {
    if name.contains("Dilithium") {
        if name.contains('2') {
            1.0
        } else if name.contains('3') {
            1.4
        } else if name.contains('5') {
            2.0
        } else {
            1.0
        }
    } else if name.contains("Falcon") {
        if name.contains("512") {
            0.8
        } else if name.contains("1024") {
            1.2
        } else {
            1.0
        }
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimulatedBackend {
        SimulatedBackend::new(Duration::ZERO)
    }

    #[test]
    fn test_kyber512_within_noise_bounds() {
        let result = backend().test_kem("Kyber512").unwrap();
        assert!(result.success());

        let keygen = result.timing(metric::KEYGEN_TIME).unwrap();
        assert!((0.4..=0.6).contains(&keygen), "keygen {keygen} out of bounds");
        let encaps = result.timing(metric::ENCAPS_TIME).unwrap();
        assert!((0.24..=0.36).contains(&encaps));
        let decaps = result.timing(metric::DECAPS_TIME).unwrap();
        assert!((0.24..=0.36).contains(&decaps));
    }

    #[test]
    fn test_kyber512_reports_table_sizes() {
        let result = backend().test_kem("Kyber512").unwrap();
        assert_eq!(result.size(metric::PUBLIC_KEY_SIZE), Some(800));
        assert_eq!(result.size(metric::PRIVATE_KEY_SIZE), Some(1632));
        assert_eq!(result.size(metric::CIPHERTEXT_SIZE), Some(768));
    }

    #[test]
    fn test_kyber1024_scales_by_multiplier() {
        // 100 draws all inside 2.0 * base * [0.8, 1.2]
        let backend = backend();
        for _ in 0..100 {
            let result = backend.test_kem("Kyber1024").unwrap();
            let keygen = result.timing(metric::KEYGEN_TIME).unwrap();
            assert!((0.8..=1.2).contains(&keygen), "keygen {keygen} out of bounds");
        }
    }

    #[test]
    fn test_falcon512_multiplier_below_one() {
        let result = backend().test_signature("Falcon512").unwrap();
        let verify = result.timing(metric::VERIFY_TIME).unwrap();
        // 0.2 * 0.8 * [0.8, 1.2]
        assert!((0.128..=0.192).contains(&verify), "verify {verify} out of bounds");
        assert_eq!(result.size(metric::SIGNATURE_SIZE), Some(690));
    }

    #[test]
    fn test_dilithium_signature_schema() {
        let result = backend().test_signature("Dilithium3").unwrap();
        assert!(result.success());
        assert!(result.timing(metric::SIGN_TIME).is_some());
        assert!(result.timing(metric::VERIFY_TIME).is_some());
        assert!(result.timing(metric::ENCAPS_TIME).is_none());
        assert!(result.size(metric::CIPHERTEXT_SIZE).is_none());
    }

    #[test]
    fn test_unknown_algorithm_is_backend_call_error() {
        let err = backend().test_kem("NTRU-HRSS-701").unwrap_err();
        assert!(matches!(err, Error::BackendCall(_)));
        let err = backend().test_signature("Kyber512").unwrap_err();
        assert!(matches!(err, Error::BackendCall(_)));
    }

    #[test]
    fn test_multiplier_tables() {
        assert!((kem_multiplier("Kyber512") - 1.0).abs() < f64::EPSILON);
        assert!((kem_multiplier("Kyber768") - 1.5).abs() < f64::EPSILON);
        assert!((kem_multiplier("Kyber1024") - 2.0).abs() < f64::EPSILON);
        assert!((sig_multiplier("Dilithium2") - 1.0).abs() < f64::EPSILON);
        assert!((sig_multiplier("Dilithium3") - 1.4).abs() < f64::EPSILON);
        assert!((sig_multiplier("Dilithium5") - 2.0).abs() < f64::EPSILON);
        assert!((sig_multiplier("Falcon512") - 0.8).abs() < f64::EPSILON);
        assert!((sig_multiplier("Falcon1024") - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_supported_sets() {
        assert!(SimulatedBackend::supports_kem("Kyber768"));
        assert!(!SimulatedBackend::supports_kem("Dilithium2"));
        assert!(SimulatedBackend::supports_signature("Falcon1024"));
        assert_eq!(SimulatedBackend::supported_kems().len(), 3);
        assert_eq!(SimulatedBackend::supported_signatures().len(), 5);
    }
}
