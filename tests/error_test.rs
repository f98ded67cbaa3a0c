//! Tests for error types

use pqbench::Error;

#[test]
fn test_validation_error() {
    let error = Error::Validation("rounds must be at least 1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Validation error"));
    assert!(error_str.contains("rounds must be at least 1"));
}

#[test]
fn test_not_found_error() {
    let error = Error::NotFound("task 42".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Not found"));
    assert!(error_str.contains("task 42"));
}

#[test]
fn test_conflict_error() {
    let error = Error::Conflict("algorithm 'Kyber768' already registered".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Conflict"));
    assert!(error_str.contains("Kyber768"));
}

#[test]
fn test_backend_unavailable_error() {
    let error = Error::BackendUnavailable("no candidate library loaded".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Crypto backend unavailable"));
    assert!(error_str.contains("simulated mode"));
}

#[test]
fn test_backend_call_error() {
    let error = Error::BackendCall("OQS_KEM_keypair returned status 1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Backend call failed"));
    assert!(error_str.contains("OQS_KEM_keypair"));
}

#[test]
fn test_statistics_error() {
    let error = Error::Statistics("need at least 2 samples".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Statistics error"));
    assert!(error_str.contains("at least 2 samples"));
}

#[test]
fn test_queue_closed_error() {
    let error = Error::QueueClosed;
    let error_str = format!("{error}");
    assert!(error_str.contains("Dispatch queue closed"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    let error_str = format!("{error}");
    assert_eq!(error_str, "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::QueueClosed;
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("QueueClosed"));
}

#[test]
fn test_result_type_alias() {
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> pqbench::Result<i32> {
        Ok(42)
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> pqbench::Result<i32> {
        Err(Error::Other("test error".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
