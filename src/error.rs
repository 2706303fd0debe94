//! Error types for MachineState operations.
//!
//! This module defines [`MachineStateError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Source and conversion errors are recovered inside the acquisition loop:
//!   the field resolves to "no value" (or keeps its unconverted text) and the
//!   error is only logged.
//! - Discovery misconfiguration and reconstruction errors are fatal and are
//!   returned to the caller immediately.
//! - Use `anyhow::Error` (via `MachineStateError::Other`) for unexpected errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for MachineState operations.
#[derive(Debug, Error)]
pub enum MachineStateError {
    /// File missing or unreadable, or command not on the search path.
    #[error("Source unavailable: {source_id}: {message}")]
    SourceUnavailable { source_id: String, message: String },

    /// Command ran but exited unsuccessfully.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Command did not finish within the configured timeout.
    #[error("Command timed out after {seconds}s: {command}")]
    CommandTimedOut { command: String, seconds: u64 },

    /// Converter rejected the matched text.
    #[error("Cannot convert '{value}': {message}")]
    ConversionFailed { value: String, message: String },

    /// A field pattern is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A group's discovery strategy is configured inconsistently.
    #[error("Invalid discovery for '{group}': {message}")]
    DiscoveryMisconfigured { group: String, message: String },

    /// A serialized document cannot be turned back into a tree.
    #[error("Cannot reconstruct from '{fragment}': {message}")]
    Reconstruction { fragment: String, message: String },

    /// Group kind is not present in the registry.
    #[error("Unknown group kind: {kind}")]
    UnknownGroupKind { kind: String },

    /// A mandatory subsystem of the root aggregator failed to build.
    #[error("Subsystem '{name}' failed: {message}")]
    SubsystemFailed { name: String, message: String },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Command-line argument failed validation.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for MachineState operations.
pub type Result<T> = std::result::Result<T, MachineStateError>;
