//! Build errors.

use std::path::PathBuf;

use freezeboot_platform::{CompilerFamily, OsFamily};
use thiserror::Error;

use crate::target::SubsystemKind;

/// Errors that abort a bootstrap build.
///
/// Failures while resolving the optional logging-support library are not
/// errors; they surface as [`crate::dependency::Availability::Absent`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no link rule for os '{os}', compiler '{compiler}', subsystem '{subsystem}'")]
    NoLinkRule {
        os: OsFamily,
        compiler: CompilerFamily,
        subsystem: SubsystemKind,
    },

    #[error("link rules {rules:?} all match os '{os}', compiler '{compiler}', subsystem '{subsystem}'")]
    AmbiguousLinkRule {
        os: OsFamily,
        compiler: CompilerFamily,
        subsystem: SubsystemKind,
        rules: Vec<&'static str>,
    },

    #[error("default module name {} does not end in module suffix '{suffix}'", path.display())]
    UnexpectedModuleName { path: PathBuf, suffix: String },

    #[error("invalid build target '{name}': {message}")]
    InvalidTarget { name: String, message: String },

    #[error("source {} has a '..' component and cannot be mapped to an object file", path.display())]
    UnmappableSource { path: PathBuf },

    #[error("{tool} not found: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiling {target} failed:\n{message}")]
    CompileFailed { target: String, message: String },

    #[error("linking {target} failed:\n{message}")]
    LinkFailed { target: String, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
