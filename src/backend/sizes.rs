//! Static per-algorithm buffer sizes
//!
//! Every buffer that crosses the native boundary is allocated from this
//! table, never from foreign or caller input. A size mismatch at the FFI
//! boundary is undefined behavior, so the table is the single source of
//! truth for both backends.

/// Buffer sizes for a KEM parameter set (bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KemSizes {
    /// Public key length
    pub public_key: usize,
    /// Secret key length
    pub secret_key: usize,
    /// Ciphertext length
    pub ciphertext: usize,
    /// Shared secret length
    pub shared_secret: usize,
}

/// Buffer sizes for a signature parameter set (bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigSizes {
    /// Public key length
    pub public_key: usize,
    /// Secret key length
    pub secret_key: usize,
    /// Maximum signature length
    pub signature: usize,
}

/// Look up KEM buffer sizes by algorithm name.
///
/// Unknown names fall back to generous defaults large enough for any
/// parameter set the probe lists accept.
#[must_use]
pub fn kem_sizes(name: &str) -> KemSizes {
    match name {
        "Kyber512" => KemSizes {
            public_key: 800,
            secret_key: 1632,
            ciphertext: 768,
            shared_secret: 32,
        },
        "Kyber768" => KemSizes {
            public_key: 1184,
            secret_key: 2400,
            ciphertext: 1088,
            shared_secret: 32,
        },
        "Kyber1024" => KemSizes {
            public_key: 1568,
            secret_key: 3168,
            ciphertext: 1568,
            shared_secret: 32,
        },
        _ => KemSizes {
            public_key: 1000,
            secret_key: 2000,
            ciphertext: 1000,
            shared_secret: 32,
        },
    }
}

/// Look up signature buffer sizes by algorithm name.
#[must_use]
pub fn sig_sizes(name: &str) -> SigSizes {
    match name {
        "Dilithium2" => SigSizes {
            public_key: 1312,
            secret_key: 2528,
            signature: 2420,
        },
        "Dilithium3" => SigSizes {
            public_key: 1952,
            secret_key: 4000,
            signature: 3293,
        },
        "Dilithium5" => SigSizes {
            public_key: 2592,
            secret_key: 4864,
            signature: 4595,
        },
        "Falcon512" | "Falcon-512" => SigSizes {
            public_key: 897,
            secret_key: 1281,
            signature: 690,
        },
        "Falcon1024" | "Falcon-1024" => SigSizes {
            public_key: 1793,
            secret_key: 2305,
            signature: 1330,
        },
        _ => SigSizes {
            public_key: 1000,
            secret_key: 2000,
            signature: 2000,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kyber512_sizes() {
        let sizes = kem_sizes("Kyber512");
        assert_eq!(sizes.public_key, 800);
        assert_eq!(sizes.secret_key, 1632);
        assert_eq!(sizes.ciphertext, 768);
        assert_eq!(sizes.shared_secret, 32);
    }

    #[test]
    fn test_kyber_family_grows_with_security_level() {
        let k512 = kem_sizes("Kyber512");
        let k768 = kem_sizes("Kyber768");
        let k1024 = kem_sizes("Kyber1024");
        assert!(k512.public_key < k768.public_key);
        assert!(k768.public_key < k1024.public_key);
        assert_eq!(k512.shared_secret, k1024.shared_secret);
    }

    #[test]
    fn test_unknown_kem_defaults() {
        let sizes = kem_sizes("NTRU-HPS-2048-509");
        assert_eq!(sizes.public_key, 1000);
        assert_eq!(sizes.secret_key, 2000);
        assert_eq!(sizes.ciphertext, 1000);
    }

    #[test]
    fn test_falcon_accepts_both_spellings() {
        assert_eq!(sig_sizes("Falcon512"), sig_sizes("Falcon-512"));
        assert_eq!(sig_sizes("Falcon1024"), sig_sizes("Falcon-1024"));
    }

    #[test]
    fn test_dilithium2_sizes() {
        let sizes = sig_sizes("Dilithium2");
        assert_eq!(sizes.public_key, 1312);
        assert_eq!(sizes.secret_key, 2528);
        assert_eq!(sizes.signature, 2420);
    }
}
