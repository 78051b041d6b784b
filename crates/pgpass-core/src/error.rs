//! Error types for the pgpass broker.
//!
//! Every fatal condition maps onto exactly one process exit code through
//! [`BrokerError::exit_code`]. Per-connection failures use the same enum but are
//! logged and swallowed by the connection loop instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    // Pipe setup errors
    #[error("Path exists but is not a named pipe: {0}")]
    PathConflict(PathBuf),

    #[error("Failed to create named pipe at {path:?}: {message}")]
    CreateFailed {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to set permissions on {path:?}: {message}")]
    PermissionFailed {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Rendezvous errors
    #[error("Failed to open named pipe {path:?} for writing: {message}")]
    Accept {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Connection loop aborted: {message}")]
    WorkerAborted { message: String },

    // Credential errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Credential provider unavailable: {message}")]
    ProviderInit { message: String },

    #[error("Credential generation failed: {message}")]
    Provider { message: String },

    // Per-connection IO
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        BrokerError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Process exit codes. Exactly one is returned per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    Usage = 1,
    CreatePipe = 2,
    Accept = 3,
    Permission = 4,
    Provider = 5,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl BrokerError {
    /// Create a FIFO creation error with path context.
    pub fn create_failed(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BrokerError::CreateFailed {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a permission error with path context.
    pub fn permission_failed(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BrokerError::PermissionFailed {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a rendezvous (open-for-write) error with path context.
    pub fn accept_failed(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BrokerError::Accept {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Convert to the process exit code this error terminates with.
    ///
    /// - 1: usage error (raised by argument parsing, never by this type)
    /// - 2: pipe creation error (including a conflicting non-FIFO path)
    /// - 3: pipe open / accept error
    /// - 4: permission-setting error
    /// - 5: credential provider or configuration error
    ///
    /// Per-connection errors never reach the process boundary; if one does it is
    /// reported as an accept failure since the loop was the one to give up.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            BrokerError::PathConflict(_) | BrokerError::CreateFailed { .. } => {
                ExitCode::CreatePipe
            }

            BrokerError::PermissionFailed { .. } => ExitCode::Permission,

            BrokerError::Config { .. }
            | BrokerError::ProviderInit { .. }
            | BrokerError::Provider { .. } => ExitCode::Provider,

            BrokerError::Accept { .. }
            | BrokerError::WorkerAborted { .. }
            | BrokerError::Io { .. } => ExitCode::Accept,
        }
    }
}
