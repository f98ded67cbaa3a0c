//! Native liboqs backend
//!
//! Loads liboqs at runtime through `libloading` instead of linking against
//! it, so the crate builds and runs on machines without the library
//! installed. Load failure is not an error: [`NativeBackend::load`] reports
//! "unavailable" and the engine falls back to the simulator.
//!
//! Buffer discipline: every key, ciphertext, shared secret and signature
//! buffer is an owned allocation sized from the size table before the call.
//! Sizes never come from foreign or caller input - a mismatch at this
//! boundary is undefined behavior.

use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::time::Instant;

use libloading::Library;
use tracing::{debug, info};

use super::sizes::{kem_sizes, sig_sizes};
use super::BenchmarkResult;
use crate::error::{Error, Result};
use crate::model::sample::metric;

/// Message signed during signature benchmarking
const TEST_MESSAGE: &[u8] = b"Hello, Post-Quantum Cryptography!";

/// Shared library extension for the current platform
const LIB_EXTENSION: &str = if cfg!(target_os = "windows") {
    ".dll"
} else if cfg!(target_os = "macos") {
    ".dylib"
} else {
    ".so"
};

/// Symbols a candidate library must resolve before it is accepted
const REQUIRED_SYMBOLS: [&[u8]; 10] = [
    b"OQS_KEM_new",
    b"OQS_KEM_keypair",
    b"OQS_KEM_encaps",
    b"OQS_KEM_decaps",
    b"OQS_KEM_free",
    b"OQS_SIG_new",
    b"OQS_SIG_keypair",
    b"OQS_SIG_sign",
    b"OQS_SIG_verify",
    b"OQS_SIG_free",
];

/// Mechanisms probed when listing native KEM support
const KEM_PROBE_LIST: [&str; 9] = [
    "Kyber512",
    "Kyber768",
    "Kyber1024",
    "NTRU-HPS-2048-509",
    "NTRU-HPS-2048-677",
    "NTRU-HRSS-701",
    "LightSaber-KEM",
    "Saber-KEM",
    "FireSaber-KEM",
];

/// Mechanisms probed when listing native signature support
const SIG_PROBE_LIST: [&str; 8] = [
    "Dilithium2",
    "Dilithium3",
    "Dilithium5",
    "Falcon-512",
    "Falcon-1024",
    "SPHINCS+-Haraka-128f-robust",
    "SPHINCS+-Haraka-128s-robust",
    "SPHINCS+-SHA256-128f-robust",
];

type NewFn = unsafe extern "C" fn(*const c_char) -> *mut c_void;
type KeypairFn = unsafe extern "C" fn(*mut c_void, *mut u8, *mut u8) -> c_int;
type EncapsFn = unsafe extern "C" fn(*mut c_void, *mut u8, *mut u8, *const u8) -> c_int;
type DecapsFn = unsafe extern "C" fn(*mut c_void, *mut u8, *const u8, *const u8) -> c_int;
type SignFn =
    unsafe extern "C" fn(*mut c_void, *mut u8, *mut usize, *const u8, usize, *const u8) -> c_int;
type VerifyFn =
    unsafe extern "C" fn(*mut c_void, *const u8, usize, *const u8, usize, *const u8) -> c_int;
type FreeFn = unsafe extern "C" fn(*mut c_void);

/// liboqs loaded from a platform-specific candidate file.
///
/// The library handle is read-only after construction; calls borrow it
/// concurrently from any thread.
pub struct NativeBackend {
    library: Library,
    path: PathBuf,
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NativeBackend {
    /// Try each candidate file name under each search path, then the bare
    /// names through the platform loader's default paths.
    ///
    /// Returns `None` when no candidate both loads and resolves the full
    /// required symbol set.
    #[must_use]
    pub fn load(search_paths: &[PathBuf]) -> Option<Self> {
        for candidate in candidate_paths(search_paths) {
            match Self::try_open(&candidate) {
                Ok(backend) => {
                    info!(path = %backend.path.display(), "loaded native liboqs library");
                    return Some(backend);
                }
                Err(error) => {
                    debug!(path = %candidate.display(), %error, "liboqs candidate rejected");
                }
            }
        }
        None
    }

    fn try_open(path: &Path) -> Result<Self> {
        // SAFETY: loading a shared library runs its initializers; liboqs
        // only performs CPU feature detection there.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            Error::BackendUnavailable(format!("failed to load {}: {e}", path.display()))
        })?;
        let backend = Self {
            library,
            path: path.to_path_buf(),
        };
        backend.verify_symbols()?;
        Ok(backend)
    }

    fn verify_symbols(&self) -> Result<()> {
        for name in REQUIRED_SYMBOLS {
            // SAFETY: presence probe only; call sites re-resolve with the
            // prototype the liboqs headers declare.
            unsafe { self.library.get::<unsafe extern "C" fn()>(name) }.map_err(|e| {
                Error::BackendUnavailable(format!(
                    "missing symbol {}: {e}",
                    String::from_utf8_lossy(name)
                ))
            })?;
        }
        Ok(())
    }

    /// Path of the loaded library file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn symbol<T>(&self, name: &'static [u8]) -> Result<T>
    where
        T: Copy,
    {
        // SAFETY: T is the prototype the liboqs headers declare for `name`;
        // verified present at load time.
        let symbol = unsafe { self.library.get::<T>(name) }.map_err(|e| {
            Error::BackendCall(format!(
                "symbol {} unavailable: {e}",
                String::from_utf8_lossy(name)
            ))
        })?;
        Ok(*symbol)
    }

    /// Run one native KEM round: keygen, encapsulate, decapsulate.
    ///
    /// Success means the two derived shared secrets are byte-identical.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendCall`] when the mechanism is rejected or any
    /// native call reports a non-zero status. The executor counts that as
    /// one failed round.
    pub fn test_kem(&self, name: &str, binding_name: &str) -> Result<BenchmarkResult> {
        debug!(algorithm = name, binding = binding_name, "native KEM round");

        let new_fn: NewFn = self.symbol(b"OQS_KEM_new")?;
        let keypair: KeypairFn = self.symbol(b"OQS_KEM_keypair")?;
        let encaps: EncapsFn = self.symbol(b"OQS_KEM_encaps")?;
        let decaps: DecapsFn = self.symbol(b"OQS_KEM_decaps")?;
        let free: FreeFn = self.symbol(b"OQS_KEM_free")?;

        // KEM display names match liboqs mechanism names
        let mechanism = CString::new(name)
            .map_err(|_| Error::Validation(format!("algorithm name contains NUL: {name}")))?;

        // SAFETY: mechanism outlives the call; liboqs copies the name.
        let ptr = unsafe { new_fn(mechanism.as_ptr()) };
        if ptr.is_null() {
            return Err(Error::BackendCall(format!(
                "OQS_KEM_new rejected mechanism {name}"
            )));
        }
        let kem = NativeHandle { ptr, free };

        let sizes = kem_sizes(name);
        let mut public_key = FfiBuffer::new(sizes.public_key);
        let mut secret_key = FfiBuffer::new(sizes.secret_key);
        let mut ciphertext = FfiBuffer::new(sizes.ciphertext);
        let mut shared_secret_enc = FfiBuffer::new(sizes.shared_secret);
        let mut shared_secret_dec = FfiBuffer::new(sizes.shared_secret);

        // SAFETY: all buffers are owned, sized from the size table for this
        // mechanism, and outlive each call.
        let (status, keygen_ms) = time_call(|| unsafe {
            keypair(kem.ptr, public_key.as_mut_ptr(), secret_key.as_mut_ptr())
        });
        check_status("OQS_KEM_keypair", status)?;

        let (status, encaps_ms) = time_call(|| unsafe {
            encaps(
                kem.ptr,
                ciphertext.as_mut_ptr(),
                shared_secret_enc.as_mut_ptr(),
                public_key.as_ptr(),
            )
        });
        check_status("OQS_KEM_encaps", status)?;

        let (status, decaps_ms) = time_call(|| unsafe {
            decaps(
                kem.ptr,
                shared_secret_dec.as_mut_ptr(),
                ciphertext.as_ptr(),
                secret_key.as_ptr(),
            )
        });
        check_status("OQS_KEM_decaps", status)?;

        let success = shared_secret_enc.as_slice() == shared_secret_dec.as_slice();
        Ok(BenchmarkResult::new(
            success,
            vec![
                (metric::KEYGEN_TIME.to_string(), keygen_ms),
                (metric::ENCAPS_TIME.to_string(), encaps_ms),
                (metric::DECAPS_TIME.to_string(), decaps_ms),
            ],
            vec![
                (metric::PUBLIC_KEY_SIZE.to_string(), sizes.public_key as u64),
                (
                    metric::PRIVATE_KEY_SIZE.to_string(),
                    sizes.secret_key as u64,
                ),
                (metric::CIPHERTEXT_SIZE.to_string(), sizes.ciphertext as u64),
            ],
        ))
    }

    /// Run one native signature round: keygen, sign, verify.
    ///
    /// Success means verification reported valid; the reported signature
    /// size is the length the sign call actually produced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendCall`] when the mechanism is rejected or
    /// keygen/sign report a non-zero status.
    pub fn test_signature(&self, name: &str, binding_name: &str) -> Result<BenchmarkResult> {
        debug!(algorithm = name, binding = binding_name, "native signature round");

        let new_fn: NewFn = self.symbol(b"OQS_SIG_new")?;
        let keypair: KeypairFn = self.symbol(b"OQS_SIG_keypair")?;
        let sign: SignFn = self.symbol(b"OQS_SIG_sign")?;
        let verify: VerifyFn = self.symbol(b"OQS_SIG_verify")?;
        let free: FreeFn = self.symbol(b"OQS_SIG_free")?;

        let mechanism = CString::new(sig_mechanism_name(name))
            .map_err(|_| Error::Validation(format!("algorithm name contains NUL: {name}")))?;

        // SAFETY: mechanism outlives the call; liboqs copies the name.
        let ptr = unsafe { new_fn(mechanism.as_ptr()) };
        if ptr.is_null() {
            return Err(Error::BackendCall(format!(
                "OQS_SIG_new rejected mechanism {name}"
            )));
        }
        let sig = NativeHandle { ptr, free };

        let sizes = sig_sizes(name);
        let mut public_key = FfiBuffer::new(sizes.public_key);
        let mut secret_key = FfiBuffer::new(sizes.secret_key);
        let mut signature = FfiBuffer::new(sizes.signature);

        // SAFETY: buffers sized from the size table and outlive each call.
        let (status, keygen_ms) = time_call(|| unsafe {
            keypair(sig.ptr, public_key.as_mut_ptr(), secret_key.as_mut_ptr())
        });
        check_status("OQS_SIG_keypair", status)?;

        // liboqs writes the actual signature length back; it starts at the
        // buffer capacity and never grows past it.
        let mut signature_len: usize = signature.len();
        let (status, sign_ms) = time_call(|| unsafe {
            sign(
                sig.ptr,
                signature.as_mut_ptr(),
                &mut signature_len,
                TEST_MESSAGE.as_ptr(),
                TEST_MESSAGE.len(),
                secret_key.as_ptr(),
            )
        });
        check_status("OQS_SIG_sign", status)?;

        let (verify_status, verify_ms) = time_call(|| unsafe {
            verify(
                sig.ptr,
                TEST_MESSAGE.as_ptr(),
                TEST_MESSAGE.len(),
                signature.as_ptr(),
                signature_len,
                public_key.as_ptr(),
            )
        });
        let success = verify_status == 0;

        Ok(BenchmarkResult::new(
            success,
            vec![
                (metric::KEYGEN_TIME.to_string(), keygen_ms),
                (metric::SIGN_TIME.to_string(), sign_ms),
                (metric::VERIFY_TIME.to_string(), verify_ms),
            ],
            vec![
                (metric::PUBLIC_KEY_SIZE.to_string(), sizes.public_key as u64),
                (
                    metric::PRIVATE_KEY_SIZE.to_string(),
                    sizes.secret_key as u64,
                ),
                (metric::SIGNATURE_SIZE.to_string(), signature_len as u64),
            ],
        ))
    }

    /// Construct-then-free probe for a KEM mechanism.
    #[must_use]
    pub fn probe_kem(&self, name: &str) -> bool {
        let (Ok(new_fn), Ok(free)) = (
            self.symbol::<NewFn>(b"OQS_KEM_new"),
            self.symbol::<FreeFn>(b"OQS_KEM_free"),
        ) else {
            return false;
        };
        let Ok(mechanism) = CString::new(name) else {
            return false;
        };
        // SAFETY: construct-then-free; no buffers cross the boundary.
        unsafe {
            let ptr = new_fn(mechanism.as_ptr());
            if ptr.is_null() {
                return false;
            }
            free(ptr);
        }
        true
    }

    /// Construct-then-free probe for a signature mechanism.
    #[must_use]
    pub fn probe_signature(&self, name: &str) -> bool {
        let (Ok(new_fn), Ok(free)) = (
            self.symbol::<NewFn>(b"OQS_SIG_new"),
            self.symbol::<FreeFn>(b"OQS_SIG_free"),
        ) else {
            return false;
        };
        let Ok(mechanism) = CString::new(sig_mechanism_name(name)) else {
            return false;
        };
        // SAFETY: construct-then-free; no buffers cross the boundary.
        unsafe {
            let ptr = new_fn(mechanism.as_ptr());
            if ptr.is_null() {
                return false;
            }
            free(ptr);
        }
        true
    }

    /// KEM mechanisms from the probe list this library accepts.
    #[must_use]
    pub fn supported_kems(&self) -> Vec<String> {
        KEM_PROBE_LIST
            .iter()
            .filter(|name| self.probe_kem(name))
            .map(ToString::to_string)
            .collect()
    }

    /// Signature mechanisms from the probe list this library accepts.
    #[must_use]
    pub fn supported_signatures(&self) -> Vec<String> {
        SIG_PROBE_LIST
            .iter()
            .filter(|name| self.probe_signature(name))
            .map(ToString::to_string)
            .collect()
    }
}

/// Owner of an `OQS_KEM`/`OQS_SIG` object; freed on drop on every path.
struct NativeHandle {
    ptr: *mut c_void,
    free: FreeFn,
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        // SAFETY: ptr came from the matching OQS_*_new and is freed once.
        unsafe { (self.free)(self.ptr) };
    }
}

/// Owned, length-checked buffer for data crossing the foreign boundary.
///
/// The length is fixed at construction from the size table, so a mismatch
/// between allocation and native write size cannot arise from caller input.
struct FfiBuffer {
    data: Vec<u8>,
}

impl FfiBuffer {
    fn new(len: usize) -> Self {
        Self {
            data: vec![0u8; len],
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }

    fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

fn time_call(call: impl FnOnce() -> c_int) -> (c_int, f64) {
    let started = Instant::now();
    let status = call();
    (status, started.elapsed().as_secs_f64() * 1000.0)
}

fn check_status(operation: &str, status: c_int) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(Error::BackendCall(format!(
            "{operation} returned status {status}"
        )))
    }
}

/// Map display names to liboqs mechanism names; only Falcon differs.
fn sig_mechanism_name(name: &str) -> &str {
    match name {
        "Falcon512" => "Falcon-512",
        "Falcon1024" => "Falcon-1024",
        other => other,
    }
}

fn candidate_file_names() -> [String; 2] {
    [format!("liboqs{LIB_EXTENSION}"), format!("oqs{LIB_EXTENSION}")]
}

fn candidate_paths(search_paths: &[PathBuf]) -> Vec<PathBuf> {
    let file_names = candidate_file_names();
    let mut candidates = Vec::with_capacity((search_paths.len() + 1) * file_names.len());
    for dir in search_paths {
        for file_name in &file_names {
            candidates.push(dir.join(file_name));
        }
    }
    // Bare names last: the platform loader searches its default paths
    for file_name in &file_names {
        candidates.push(PathBuf::from(file_name));
    }
    candidates
}
