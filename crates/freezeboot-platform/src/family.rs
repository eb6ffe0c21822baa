//! OS and compiler families.
//!
//! Link rules are selected by these values, never by probing for features.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// The operating-system family a bootstrap executable is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    /// Linux, the BSDs and other posix-like systems.
    Posix,
    /// The Apple variant of the posix-like family.
    Darwin,
    Windows,
}

impl OsFamily {
    /// All families, in declaration order.
    pub const ALL: [OsFamily; 3] = [OsFamily::Posix, OsFamily::Darwin, OsFamily::Windows];

    /// Whether this is a posix-like family (including the Apple variant).
    pub fn is_posix_like(self) -> bool {
        matches!(self, OsFamily::Posix | OsFamily::Darwin)
    }

    /// The family of the machine this crate was compiled for.
    pub fn host() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Darwin
        } else {
            OsFamily::Posix
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Posix => "posix",
            OsFamily::Darwin => "darwin",
            OsFamily::Windows => "windows",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsFamily {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posix" | "linux" => Ok(OsFamily::Posix),
            "darwin" | "macos" => Ok(OsFamily::Darwin),
            "windows" | "win32" => Ok(OsFamily::Windows),
            other => Err(PlatformError::UnknownFamily {
                kind: "os family",
                value: other.to_string(),
            }),
        }
    }
}

/// The C compiler family driving compile and link steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// The platform's own `cc`-compatible toolchain (gcc, clang).
    Native,
    /// GCC targeting Windows (MinGW / MinGW-w64).
    Mingw,
    /// Microsoft Visual C++ (`cl` / `link`).
    Msvc,
}

impl CompilerFamily {
    pub const ALL: [CompilerFamily; 3] = [
        CompilerFamily::Native,
        CompilerFamily::Mingw,
        CompilerFamily::Msvc,
    ];

    /// The conventional compiler family for an OS family.
    pub fn default_for(os: OsFamily) -> Self {
        match os {
            OsFamily::Windows => CompilerFamily::Msvc,
            OsFamily::Posix | OsFamily::Darwin => CompilerFamily::Native,
        }
    }

    /// Whether the family uses GCC-style command lines.
    pub fn is_gnu_style(self) -> bool {
        matches!(self, CompilerFamily::Native | CompilerFamily::Mingw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompilerFamily::Native => "native",
            CompilerFamily::Mingw => "mingw",
            CompilerFamily::Msvc => "msvc",
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerFamily {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" | "unix" | "cc" => Ok(CompilerFamily::Native),
            "mingw" | "mingw32" => Ok(CompilerFamily::Mingw),
            "msvc" => Ok(CompilerFamily::Msvc),
            other => Err(PlatformError::UnknownFamily {
                kind: "compiler family",
                value: other.to_string(),
            }),
        }
    }
}
