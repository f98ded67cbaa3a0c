//! Algorithm - catalog entry for a benchmarkable primitive

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::metric;
use crate::error::{Error, Result};

/// Primitive family of an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmCategory {
    /// Key encapsulation mechanism
    #[serde(rename = "KEM")]
    Kem,
    /// Digital signature scheme
    #[serde(rename = "SIGNATURE")]
    Signature,
}

impl AlgorithmCategory {
    /// Timing metrics emitted every round for this category.
    #[must_use]
    pub const fn timing_metrics(self) -> [&'static str; 3] {
        match self {
            Self::Kem => [metric::KEYGEN_TIME, metric::ENCAPS_TIME, metric::DECAPS_TIME],
            Self::Signature => [metric::KEYGEN_TIME, metric::SIGN_TIME, metric::VERIFY_TIME],
        }
    }

    /// Size metrics emitted once per task for this category.
    #[must_use]
    pub const fn size_metrics(self) -> [&'static str; 3] {
        match self {
            Self::Kem => [
                metric::PUBLIC_KEY_SIZE,
                metric::PRIVATE_KEY_SIZE,
                metric::CIPHERTEXT_SIZE,
            ],
            Self::Signature => [
                metric::PUBLIC_KEY_SIZE,
                metric::PRIVATE_KEY_SIZE,
                metric::SIGNATURE_SIZE,
            ],
        }
    }
}

impl fmt::Display for AlgorithmCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Kem => "KEM",
            Self::Signature => "SIGNATURE",
        })
    }
}

/// Library an algorithm binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmSource {
    /// Open Quantum Safe liboqs
    Liboqs,
    /// PQClean reference implementations
    Pqclean,
}

impl AlgorithmSource {
    /// Required prefix of binding names for this source.
    #[must_use]
    pub const fn binding_prefix(self) -> &'static str {
        match self {
            Self::Liboqs => "OQS_",
            Self::Pqclean => "PQCLEAN_",
        }
    }
}

impl fmt::Display for AlgorithmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Liboqs => "liboqs",
            Self::Pqclean => "pqclean",
        })
    }
}

/// Algorithm represents one entry in the benchmark catalog.
///
/// Entries are immutable while a task executes against them. Removal is a
/// soft delete: deactivated algorithms reject new tasks but keep their
/// recorded history queryable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Algorithm {
    id: u64,
    name: String,
    category: AlgorithmCategory,
    source: AlgorithmSource,
    binding_name: String,
    version: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Algorithm {
    /// Create a new active algorithm entry.
    ///
    /// The id is 0 until the store assigns one at registration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: AlgorithmCategory,
        source: AlgorithmSource,
        binding_name: impl Into<String>,
    ) -> Self {
        Self::builder(name, category, source, binding_name).build()
    }

    /// Create a builder for constructing an algorithm with optional fields.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        category: AlgorithmCategory,
        source: AlgorithmSource,
        binding_name: impl Into<String>,
    ) -> AlgorithmBuilder {
        AlgorithmBuilder::new(name, category, source, binding_name)
    }

    /// Get the store-assigned ID (0 until registered).
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the algorithm name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the primitive category.
    #[must_use]
    pub const fn category(&self) -> AlgorithmCategory {
        self.category
    }

    /// Get the binding library source.
    #[must_use]
    pub const fn source(&self) -> AlgorithmSource {
        self.source
    }

    /// Get the native binding name (e.g. `OQS_KEM_kyber_512`).
    #[must_use]
    pub fn binding_name(&self) -> &str {
        &self.binding_name
    }

    /// Get the algorithm version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the algorithm accepts new tasks.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last-modified timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Soft-delete the entry so it rejects new tasks.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Check the entry against the catalog rules.
    ///
    /// Rules: name at least 2 characters from `[A-Za-z0-9_+-]`; binding name
    /// carries the source's prefix; version is `x.y` or `x.y.z`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.len() < 2 {
            return Err(Error::Validation(
                "algorithm name must be at least 2 characters".to_string(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_'))
        {
            return Err(Error::Validation(format!(
                "algorithm name '{name}' may only contain letters, digits, '-', '+' and '_'"
            )));
        }
        let prefix = self.source.binding_prefix();
        if !self.binding_name.starts_with(prefix) {
            return Err(Error::Validation(format!(
                "{} binding names must start with '{prefix}', got '{}'",
                self.source, self.binding_name
            )));
        }
        if !is_valid_version(&self.version) {
            return Err(Error::Validation(format!(
                "version '{}' must be x.y or x.y.z",
                self.version
            )));
        }
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Builder for [`Algorithm`].
#[derive(Debug)]
pub struct AlgorithmBuilder {
    name: String,
    category: AlgorithmCategory,
    source: AlgorithmSource,
    binding_name: String,
    version: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl AlgorithmBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: AlgorithmCategory,
        source: AlgorithmSource,
        binding_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            source,
            binding_name: binding_name.into(),
            version: "1.0".to_string(),
            description: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Set the version string.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set whether the entry starts active.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set a custom creation timestamp (useful for restoring persisted entries).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the [`Algorithm`].
    #[must_use]
    pub fn build(self) -> Algorithm {
        Algorithm {
            id: 0,
            name: self.name,
            category: self.category,
            source: self.source,
            binding_name: self.binding_name,
            version: self.version,
            description: self.description,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

fn is_valid_version(version: &str) -> bool {
    let segments: Vec<&str> = version.split('.').collect();
    (2..=3).contains(&segments.len())
        && segments
            .iter()
            .all(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
}

/// Stock liboqs catalog: the Kyber, Dilithium and Falcon parameter sets the
/// simulator also understands.
#[must_use]
pub fn default_catalog() -> Vec<Algorithm> {
    use AlgorithmCategory::{Kem, Signature};
    use AlgorithmSource::Liboqs;

    vec![
        Algorithm::builder("Kyber512", Kem, Liboqs, "OQS_KEM_kyber_512")
            .description("CRYSTALS-Kyber at NIST security level 1")
            .build(),
        Algorithm::builder("Kyber768", Kem, Liboqs, "OQS_KEM_kyber_768")
            .description("CRYSTALS-Kyber at NIST security level 3")
            .build(),
        Algorithm::builder("Kyber1024", Kem, Liboqs, "OQS_KEM_kyber_1024")
            .description("CRYSTALS-Kyber at NIST security level 5")
            .build(),
        Algorithm::builder("Dilithium2", Signature, Liboqs, "OQS_SIG_dilithium_2")
            .description("CRYSTALS-Dilithium at NIST security level 2")
            .build(),
        Algorithm::builder("Dilithium3", Signature, Liboqs, "OQS_SIG_dilithium_3")
            .description("CRYSTALS-Dilithium at NIST security level 3")
            .build(),
        Algorithm::builder("Dilithium5", Signature, Liboqs, "OQS_SIG_dilithium_5")
            .description("CRYSTALS-Dilithium at NIST security level 5")
            .build(),
        Algorithm::builder("Falcon512", Signature, Liboqs, "OQS_SIG_falcon_512")
            .description("Falcon over NTRU lattices, 512-bit parameter set")
            .build(),
        Algorithm::builder("Falcon1024", Signature, Liboqs, "OQS_SIG_falcon_1024")
            .description("Falcon over NTRU lattices, 1024-bit parameter set")
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_new_defaults() {
        let algorithm = Algorithm::new(
            "Kyber512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "OQS_KEM_kyber_512",
        );
        assert_eq!(algorithm.id(), 0);
        assert_eq!(algorithm.name(), "Kyber512");
        assert_eq!(algorithm.version(), "1.0");
        assert!(algorithm.is_active());
        assert!(algorithm.validate().is_ok());
    }

    #[test]
    fn test_deactivate_is_soft() {
        let mut algorithm = Algorithm::new(
            "Kyber512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "OQS_KEM_kyber_512",
        );
        algorithm.deactivate();
        assert!(!algorithm.is_active());
        assert_eq!(algorithm.name(), "Kyber512");
    }

    #[test]
    fn test_validate_rejects_short_name() {
        let algorithm = Algorithm::new(
            "K",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "OQS_KEM_k",
        );
        assert!(matches!(algorithm.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_bad_characters() {
        let algorithm = Algorithm::new(
            "Kyber 512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "OQS_KEM_kyber_512",
        );
        assert!(matches!(algorithm.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_accepts_sphincs_plus() {
        let algorithm = Algorithm::new(
            "SPHINCS+-SHA256-128f",
            AlgorithmCategory::Signature,
            AlgorithmSource::Liboqs,
            "OQS_SIG_sphincs_sha256_128f",
        );
        assert!(algorithm.validate().is_ok());
    }

    #[test]
    fn test_validate_binding_prefix_per_source() {
        let liboqs = Algorithm::new(
            "Kyber512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "PQCLEAN_KYBER512_CLEAN",
        );
        assert!(matches!(liboqs.validate(), Err(Error::Validation(_))));

        let pqclean = Algorithm::new(
            "Kyber512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Pqclean,
            "PQCLEAN_KYBER512_CLEAN",
        );
        assert!(pqclean.validate().is_ok());
    }

    #[test]
    fn test_validate_version_format() {
        let bad = Algorithm::builder(
            "Kyber512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "OQS_KEM_kyber_512",
        )
        .version("v1")
        .build();
        assert!(matches!(bad.validate(), Err(Error::Validation(_))));

        let good = Algorithm::builder(
            "Kyber512",
            AlgorithmCategory::Kem,
            AlgorithmSource::Liboqs,
            "OQS_KEM_kyber_512",
        )
        .version("0.8.0")
        .build();
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_category_metric_schema() {
        assert_eq!(
            AlgorithmCategory::Kem.timing_metrics(),
            ["keygen_time", "encaps_time", "decaps_time"]
        );
        assert_eq!(
            AlgorithmCategory::Signature.size_metrics(),
            ["public_key_size", "private_key_size", "signature_size"]
        );
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 8);
        for algorithm in &catalog {
            assert!(algorithm.validate().is_ok(), "{}", algorithm.name());
            assert!(algorithm.is_active());
        }
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&AlgorithmCategory::Signature).unwrap();
        assert_eq!(json, "\"SIGNATURE\"");
        let json = serde_json::to_string(&AlgorithmSource::Liboqs).unwrap();
        assert_eq!(json, "\"liboqs\"");
    }
}
