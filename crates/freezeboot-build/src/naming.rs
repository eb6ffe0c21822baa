//! Artifact naming and placement.
//!
//! The toolchain names every compiled target like a loadable module
//! (`pkg/bases/Console.cpython-39-x86_64-linux-gnu.so`). Bootstrap executables
//! are renamed to a native binary name (`pkg/bases/Console`, `Console.exe`);
//! utility modules keep the module name.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use freezeboot_platform::PlatformProfile;

use crate::error::{BuildError, Result};
use crate::target::{BuildTarget, SubsystemKind};

/// Where produced artifacts are rooted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Next to the sources, inside the project tree.
    InPlace { project_root: PathBuf },
    /// In a staging output directory.
    Staged { build_lib: PathBuf },
}

impl Placement {
    pub fn root(&self) -> &Path {
        match self {
            Placement::InPlace { project_root } => project_root,
            Placement::Staged { build_lib } => build_lib,
        }
    }

    pub fn is_in_place(&self) -> bool {
        matches!(self, Placement::InPlace { .. })
    }
}

/// The toolchain's default module path for `target`, relative to the placement root.
///
/// Each dotted component becomes a directory; the last one gets the
/// platform's module suffix.
pub fn default_module_path(target: &BuildTarget, profile: &PlatformProfile) -> PathBuf {
    let mut components: Vec<&str> = target.name_components().collect();
    let last = components.pop().unwrap_or_default();
    let mut path: PathBuf = components.into_iter().collect();
    path.push(format!("{last}{}", profile.module_suffix()));
    path
}

/// Rename a default module path to the artifact's final relative path.
///
/// Utility modules are returned unchanged. Everything else has exactly the
/// module suffix replaced by exactly the executable suffix.
pub fn executable_file_name(
    default_module_path: &Path,
    target: &BuildTarget,
    profile: &PlatformProfile,
) -> Result<PathBuf> {
    if target.subsystem == SubsystemKind::UtilityModule {
        return Ok(default_module_path.to_path_buf());
    }

    let suffix = profile.module_suffix();
    let unexpected = || BuildError::UnexpectedModuleName {
        path: default_module_path.to_path_buf(),
        suffix: suffix.to_string(),
    };

    let file_name = default_module_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(unexpected)?;
    let stem = file_name
        .strip_suffix(suffix)
        .filter(|stem| !suffix.is_empty() && !stem.is_empty())
        .ok_or_else(unexpected)?;

    let mut renamed = OsString::from(stem);
    renamed.push(profile.executable_suffix());
    Ok(default_module_path.with_file_name(renamed))
}

/// Final on-disk path of `target`'s artifact under `placement`.
pub fn derive_output_path(
    default_module_path: &Path,
    target: &BuildTarget,
    profile: &PlatformProfile,
    placement: &Placement,
) -> Result<PathBuf> {
    let relative = executable_file_name(default_module_path, target, profile)?;
    Ok(placement.root().join(relative))
}
