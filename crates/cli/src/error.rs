//! CLI error types.

use thiserror::Error;

/// CLI errors.
///
/// Agent run failures are not here: a failed run is still a run, and is
/// reported through `runtime::Reporter`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No run was found matching the given prefix.
    #[error("no run found matching '{prefix}'")]
    RunNotFound { prefix: String },

    /// Multiple runs match the given prefix.
    ///
    /// The user should provide a longer prefix to disambiguate.
    #[error("multiple runs match '{prefix}': {matches:?}")]
    AmbiguousRun {
        prefix: String,
        matches: Vec<String>,
    },

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The configured tool set could not be built.
    #[error(transparent)]
    Tools(#[from] tools::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An error occurred serializing output.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
