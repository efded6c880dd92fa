//! Unit tests for error.rs
//!
//! Display, Debug, Clone and propagation behaviour of every Error variant.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit returned -4".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Backend error"));
    assert!(display.contains("vkQueueSubmit returned -4"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("shader module 7 does not exist".to_string());
    assert_eq!(format!("{}", err), "Invalid resource: shader module 7 does not exist");
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no suitable GPU".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no suitable GPU");
}

#[test]
fn test_consistency_error_display() {
    let err = Error::ConsistencyError("model 3 missing from material 2".to_string());
    assert_eq!(format!("{}", err), "Consistency error: model 3 missing from material 2");
}

#[test]
fn test_timeout_display() {
    let err = Error::Timeout("render fence".to_string());
    assert_eq!(format!("{}", err), "Timeout: render fence");
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
fn test_error_debug_names_variant() {
    assert!(format!("{:?}", Error::ConsistencyError("x".into())).contains("ConsistencyError"));
    assert!(format!("{:?}", Error::Timeout("x".into())).contains("Timeout"));
    assert!(format!("{:?}", Error::OutOfMemory).contains("OutOfMemory"));
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::InvalidResource("texture".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::InvalidResource("buffer".to_string()));
}

// ============================================================================
// ERROR PROPAGATION TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::Timeout("acquire".to_string()))
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert_eq!(outer(), Err(Error::Timeout("acquire".to_string())));
}
