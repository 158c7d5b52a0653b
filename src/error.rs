//! Error types for the registry gate

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for gate operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Registry gate errors. Every variant is fatal.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Mode error: {0}")]
    Mode(String),

    #[error("Freeze mode: unable to inspect changes since {reference}: {reason}")]
    FreezeUnavailable { reference: String, reason: String },

    #[error("Freeze mode active: modification detected in {path}")]
    FreezeViolation { path: String },

    #[error("Registry hash mismatch: computed {computed}, manifest {manifest}")]
    HashMismatch { computed: String, manifest: String },

    #[error("Snapshot immutability violation: version {version} already archived at {path}")]
    ImmutabilityViolation { version: String, path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

/// Failure taxonomy reported alongside INVALID verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Schema,
    Graph,
    Mode,
    FreezeUnavailable,
    FreezeViolation,
    HashMismatch,
    ImmutabilityViolation,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "IOError",
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Graph => "GraphError",
            ErrorKind::Mode => "ModeError",
            ErrorKind::FreezeUnavailable => "FreezeUnavailableError",
            ErrorKind::FreezeViolation => "FreezeViolationError",
            ErrorKind::HashMismatch => "HashMismatchError",
            ErrorKind::ImmutabilityViolation => "ImmutabilityViolationError",
            ErrorKind::Config => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GateError::Io { path: path.into(), source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Io { .. } | GateError::Parse { .. } => ErrorKind::Io,
            GateError::Schema(_) => ErrorKind::Schema,
            GateError::Graph(_) => ErrorKind::Graph,
            GateError::Mode(_) => ErrorKind::Mode,
            GateError::FreezeUnavailable { .. } => ErrorKind::FreezeUnavailable,
            GateError::FreezeViolation { .. } => ErrorKind::FreezeViolation,
            GateError::HashMismatch { .. } => ErrorKind::HashMismatch,
            GateError::ImmutabilityViolation { .. } => ErrorKind::ImmutabilityViolation,
            GateError::Config(_) => ErrorKind::Config,
        }
    }
}
