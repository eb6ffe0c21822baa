//! Platform profiles for bootstrap executable builds.
//!
//! A profile is assembled from three parts:
//! - **OS family:** posix, the Apple posix variant, or Windows
//! - **Compiler family:** native `cc`, MinGW, or MSVC
//! - **Runtime:** version, ABI flags and configuration variables of the
//!   embedding runtime the executables link against

pub mod error;
pub mod family;
pub mod parse;
pub mod probe;
pub mod profile;
pub mod runtime;

pub use error::{PlatformError, Result};
pub use family::{CompilerFamily, OsFamily};
pub use parse::{
    discover_profiles, generate_template, load_profile_toml, parse_profile_toml,
    profile_to_toml, validate_profile, ValidationIssue,
};
pub use probe::probe_runtime;
pub use profile::PlatformProfile;
pub use runtime::{config_tokens, RuntimeConfig, RuntimeVersion};
