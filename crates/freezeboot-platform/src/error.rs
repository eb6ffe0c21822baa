//! Error types for platform profile operations.

use std::path::PathBuf;

/// Errors that can occur while loading, probing, or validating a platform profile.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON error decoding the runtime probe output.
    #[error("runtime probe returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading/writing profile files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile file not found.
    #[error("profile file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A runtime version string that is not `<major>.<minor>`.
    #[error("invalid runtime version '{value}': expected <major>.<minor>")]
    InvalidVersion {
        /// The rejected input.
        value: String,
    },

    /// An unknown OS or compiler family name.
    #[error("unknown {kind} '{value}'")]
    UnknownFamily {
        /// "os family" or "compiler family".
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// The runtime interpreter could not be run or exited unsuccessfully.
    #[error("runtime probe via '{interpreter}' failed: {detail}")]
    ProbeFailed {
        /// Interpreter that was invoked.
        interpreter: String,
        /// Description of the failure.
        detail: String,
    },

    /// Validation error in a profile definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
