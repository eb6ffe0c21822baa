//! Embedding runtime model.
//!
//! Describes the version and build-time configuration variables of the
//! scripting runtime that every bootstrap executable links against.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Stem of the runtime's shared library name (`python3.9`, `python3.12d`, ...).
pub const RUNTIME_LIBRARY_STEM: &str = "python";

/// A `<major>.<minor>` runtime version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
}

impl RuntimeVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for RuntimeVersion {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlatformError::InvalidVersion {
            value: s.to_string(),
        };
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        // A trailing micro component ("3.9.7") is accepted and ignored.
        if let Some(micro) = parts.next() {
            if micro.is_empty() || parts.next().is_some() {
                return Err(invalid());
            }
        }
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for RuntimeVersion {
    type Error = PlatformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuntimeVersion> for String {
    fn from(v: RuntimeVersion) -> Self {
        v.to_string()
    }
}

/// Build-time configuration variables reported by the runtime.
///
/// Token lists (`link-for-shared`, `libs`, ...) are stored as the runtime
/// reports them, whitespace separated, and split on use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Filename suffix of a loadable extension module (`EXT_SUFFIX`).
    pub module_suffix: String,
    /// Directory holding the runtime's C headers (`INCLUDEPY`).
    #[serde(default)]
    pub include_dir: Option<PathBuf>,
    /// Directory holding the runtime's installed library (`LIBPL`).
    #[serde(default)]
    pub library_dir: Option<PathBuf>,
    /// Directory holding the runtime's import library on Windows
    /// (`libs` under the base installation prefix).
    #[serde(default)]
    pub import_library_dir: Option<PathBuf>,
    /// Flags needed to link an executable embedding the runtime (`LINKFORSHARED`).
    #[serde(default)]
    pub link_for_shared: Option<String>,
    /// Extra system libraries (`LIBS`).
    #[serde(default)]
    pub libs: Option<String>,
    /// Math library (`LIBM`).
    #[serde(default)]
    pub libm: Option<String>,
    /// Libraries needed by statically built-in base modules (`BASEMODLIBS`).
    #[serde(default)]
    pub base_mod_libs: Option<String>,
    /// Libraries needed by locally added built-in modules (`LOCALMODLIBS`).
    #[serde(default)]
    pub local_mod_libs: Option<String>,
}

impl RuntimeConfig {
    /// A configuration with only the module suffix set.
    pub fn with_module_suffix(suffix: impl Into<String>) -> Self {
        Self {
            module_suffix: suffix.into(),
            ..Self::default()
        }
    }
}

/// Split a whitespace-separated configuration value into tokens.
///
/// `None` and blank values yield nothing.
pub fn config_tokens(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
