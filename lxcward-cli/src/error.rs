//! CLI-specific error types and exit code mapping

use lxcward_core::error::{ArgumentError, LxcwardError};
use lxcward_reconciler::ReconcileError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// A validation check reported the target as invalid.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from lxcward-core.
    #[error("{0}")]
    Core(#[from] LxcwardError),

    /// Reconciler error (retry exhausted, stabilization failure, ...).
    #[error("{0}")]
    Reconcile(#[from] ReconcileError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | Operation failure                |
    /// | 2    | Configuration error              |
    /// | 3    | Invalid argument                 |
    /// | 4    | Validation reported invalid      |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::InvalidArgument(_) => 3,
            Self::ValidationFailed(_) => 4,
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                LxcwardError::Config(_) => 2,
                LxcwardError::InvalidArgument(_) => 3,
                LxcwardError::Io(_) => 10,
                LxcwardError::Container(_) => 1,
            },
            Self::Reconcile(e) => match e {
                ReconcileError::InvalidArgument(_) => 3,
                ReconcileError::Config { .. } => 2,
                _ => 1,
            },
            Self::Command(_) | Self::Logging(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

impl From<ArgumentError> for CliError {
    fn from(e: ArgumentError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}
