//! Error types for the dynip system
//!
//! Errors are split by the component that raises them. Everything raised
//! inside a cycle is recoverable and classified at the cycle boundary; only
//! [`Error`] (configuration and store construction) stops the daemon from
//! starting.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for dynip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while observing the current address
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The configured interface does not exist
    #[error("interface {0:?} not found")]
    InterfaceNotFound(String),

    /// The interface exists but carries no usable address
    #[error("no usable address found on {0:?}")]
    NoAddress(String),

    /// External address discovery failed
    #[error("address resolution failed: {0}")]
    ResolutionFailed(String),

    /// The probe did not finish within its deadline
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// Local interface enumeration failed
    #[error("interface enumeration failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while loading or persisting the committed address
#[derive(Error, Debug)]
pub enum StateError {
    /// The state file could not be read, written or removed
    #[error("state file {path}: {source}")]
    Io {
        /// Path of the state file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The state file exists but does not hold a valid record
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        /// Path of the state file
        path: PathBuf,
        /// Decoding error
        #[source]
        source: serde_json::Error,
    },

    /// The record could not be encoded
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StateError {
    /// Create an I/O error for the given state path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of a single destination update
#[derive(Error, Debug)]
pub enum UpdateError {
    /// No zone with this name exists on the provider side
    #[error("zone {0:?} not found")]
    ZoneNotFound(String),

    /// The zone holds no address record with this name
    #[error("record {0:?} was not found")]
    RecordNotFound(String),

    /// The template could not be read, parsed or rendered
    #[error("template {path}: {message}")]
    Template {
        /// Template path
        path: PathBuf,
        /// Parser or renderer message
        message: String,
    },

    /// The rendered output could not be written
    #[error("output {target}: {source}")]
    Output {
        /// Output path or sink description
        target: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The provider API rejected or failed the request
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The provider rejected the credentials
    #[error("authentication failed ({0})")]
    Authentication(String),

    /// The provider throttled the request
    #[error("rate limited ({0})")]
    RateLimited(String),

    /// The address handed to the destination is not an IP address
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// The update did not finish within its deadline
    #[error("update timed out after {0:?}")]
    Timeout(Duration),
}

impl UpdateError {
    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Core error type for the dynip system
#[derive(Error, Debug)]
pub enum Error {
    /// State store could not be opened
    #[error("state store error: {0}")]
    State(#[from] StateError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
