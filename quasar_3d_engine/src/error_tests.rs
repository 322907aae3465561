//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("queue submit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("queue submit failed"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_import_failed_display() {
    let err = Error::ImportFailed("models/hero.gltf: no root node".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Import failed"));
    assert!(display.contains("no root node"));
}

#[test]
fn test_decode_failed_display() {
    let err = Error::DecodeFailed("unsupported PNG chunk".to_string());
    assert!(format!("{}", err).starts_with("Decode failed"));
}

#[test]
fn test_invalid_state_and_stale_handle_display() {
    let err = Error::InvalidState("pool is Ready".to_string());
    assert!(format!("{}", err).contains("Invalid state"));

    let err = Error::StaleHandle("pool destroyed".to_string());
    assert!(format!("{}", err).contains("Stale handle"));
}

// ============================================================================
// FATALITY CLASSIFICATION
// ============================================================================

#[test]
fn test_load_and_device_errors_are_fatal() {
    assert!(Error::ImportFailed("x".to_string()).is_fatal());
    assert!(Error::DecodeFailed("x".to_string()).is_fatal());
    assert!(Error::OutOfMemory.is_fatal());
    assert!(Error::BackendError("x".to_string()).is_fatal());
}

#[test]
fn test_query_errors_are_recoverable() {
    assert!(!Error::StaleHandle("x".to_string()).is_fatal());
    assert!(!Error::InvalidState("x".to_string()).is_fatal());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug_and_clone() {
    let err = Error::InvalidResource("texture 7".to_string());
    assert!(format!("{:?}", err).contains("InvalidResource"));

    let copy = err.clone();
    assert_eq!(format!("{}", err), format!("{}", copy));
}

// ============================================================================
// ERROR PROPAGATION TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::DecodeFailed("truncated".to_string()))
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    let result = outer();
    assert!(matches!(result, Err(Error::DecodeFailed(_))));
}
