//! Error types for the Railguard engine
//!
//! Every fallible renderer operation returns [`Result`]. Fatal conditions
//! (broken invariants, backend failures) are logged where they are detected
//! and then propagated to the caller as an [`Error`].

use std::fmt;

/// Result type for Railguard engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Railguard engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan call failure, unsupported surface, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource or argument (unknown id, empty stage list, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain)
    InitializationFailed(String),

    /// An internal cross-reference or cache invariant does not hold
    ConsistencyError(String),

    /// A fence or swapchain wait exceeded its timeout
    Timeout(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ConsistencyError(msg) => write!(f, "Consistency error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
