//! Error types for megapool operations.

use thiserror::Error;

/// Result type alias using [`MegapoolError`].
pub type Result<T> = std::result::Result<T, MegapoolError>;

/// Errors that can occur during backend operations.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum MegapoolError {
    /// Configuration is missing required keys or could not be read.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend URL could not be parsed.
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    /// No backend is registered for the URL scheme.
    #[error("unknown backend scheme: {0}")]
    UnknownScheme(String),

    /// No account has enough free space for the object.
    #[error(
        "insufficient capacity: need {needed} bytes, largest free space is {available} bytes"
    )]
    InsufficientCapacity {
        /// Size of the object being stored
        needed: u64,
        /// Largest free space found across all accounts
        available: u64,
    },

    /// The remote tool exited with a non-zero status.
    #[error("{command} failed with exit code {status}: {stderr}")]
    RemoteOperation {
        /// Program that was run
        command: String,
        /// Exit status reported by the program
        status: i32,
        /// Captured standard error
        stderr: String,
    },

    /// File is not present in any account.
    #[error("file not found: {0}")]
    NotFound(String),

    /// File exists and no other account can take the replacement.
    #[error(
        "file {name} already exists on {account} and no other account has room for the new copy"
    )]
    FileExists {
        /// Remote file name
        name: String,
        /// Account holding the existing copy
        account: String,
    },

    /// Remote filename is not acceptable.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// Required CLI tool is not installed.
    #[error("megatools not installed: {0}")]
    BackendNotInstalled(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
