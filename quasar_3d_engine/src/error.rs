//! Error types for the Quasar3D engine
//!
//! This module defines the error types used throughout the engine,
//! including asset import, device transfers, and resource pool management.

use std::fmt;

/// Result type for Quasar3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Quasar3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, model, handle, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, device, subsystems)
    InitializationFailed(String),

    /// A mesh or font source could not be read or parsed
    ImportFailed(String),

    /// An image payload could not be decoded
    DecodeFailed(String),

    /// Operation not allowed in the current pool state
    InvalidState(String),

    /// Handle or pool id refers to a destroyed slot
    StaleHandle(String),
}

impl Error {
    /// Whether this error terminates the load or commit operation that raised it.
    ///
    /// Stale handles and state violations are query-time failures the caller
    /// can recover from; everything else aborts the pipeline step.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::StaleHandle(_) | Error::InvalidState(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ImportFailed(msg) => write!(f, "Import failed: {}", msg),
            Error::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::StaleHandle(msg) => write!(f, "Stale handle: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
