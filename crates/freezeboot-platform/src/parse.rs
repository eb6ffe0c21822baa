//! TOML parsing, serialization, validation, and discovery for platform profiles.
//!
//! Profiles are stored as `.profile.toml` files in the `profiles/` directory
//! of a project. This module provides functions to load, validate, serialize,
//! and discover these files.

use std::path::{Path, PathBuf};

use crate::error::{PlatformError, Result};
use crate::family::{CompilerFamily, OsFamily};
use crate::profile::PlatformProfile;
use crate::runtime::RuntimeVersion;

/// File extension of profile definitions.
pub const PROFILE_FILE_SUFFIX: &str = ".profile.toml";

/// Oldest runtime the bootstrap sources support.
pub const MIN_RUNTIME_VERSION: RuntimeVersion = RuntimeVersion::new(3, 5);

/// A validation issue found in a profile definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: "error",
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: "warning",
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == "error"
    }
}

/// Load a profile from a `.profile.toml` file.
pub fn load_profile_toml(path: &Path) -> Result<PlatformProfile> {
    if !path.exists() {
        return Err(PlatformError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_profile_toml(&content)
}

/// Parse a profile from a TOML string.
pub fn parse_profile_toml(toml_str: &str) -> Result<PlatformProfile> {
    let profile: PlatformProfile = toml::from_str(toml_str)?;
    Ok(profile)
}

/// Serialize a profile to pretty TOML.
pub fn profile_to_toml(profile: &PlatformProfile) -> Result<String> {
    let toml_str = toml::to_string_pretty(profile)?;
    Ok(toml_str)
}

/// Validate a profile for consistency.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
/// Warnings alone also produce `Err`; callers decide whether to proceed.
pub fn validate_profile(profile: &PlatformProfile) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    // 1. Module suffix is required to rename artifacts
    if profile.config.module_suffix.is_empty() {
        issues.push(ValidationIssue::error("module-suffix is empty"));
    }

    // 2. Compiler family belongs to the OS family
    let compiler_ok = match profile.os {
        OsFamily::Windows => matches!(profile.compiler, CompilerFamily::Msvc | CompilerFamily::Mingw),
        OsFamily::Posix | OsFamily::Darwin => profile.compiler == CompilerFamily::Native,
    };
    if !compiler_ok {
        issues.push(ValidationIssue::error(format!(
            "compiler family '{}' is not supported on os family '{}'",
            profile.compiler, profile.os
        )));
    }

    // 3. Posix-like links need the runtime's installed library directory
    if profile.os.is_posix_like() && profile.config.library_dir.is_none() {
        issues.push(ValidationIssue::error(format!(
            "library-dir is required on os family '{}'",
            profile.os
        )));
    }

    // 4. Runtime version floor
    if profile.runtime_version < MIN_RUNTIME_VERSION {
        issues.push(ValidationIssue::error(format!(
            "runtime version {} is older than the supported minimum {}",
            profile.runtime_version, MIN_RUNTIME_VERSION
        )));
    }

    // 5. Platform tag keys the prebuilt dependency directory
    if profile.platform_tag.trim().is_empty() {
        issues.push(ValidationIssue::error("platform-tag is empty"));
    }

    // 6. ABI flags become part of a library name
    if profile.abi_flags.chars().any(char::is_whitespace) {
        issues.push(ValidationIssue::error(format!(
            "abi-flags '{}' contains whitespace",
            profile.abi_flags
        )));
    }

    // 7. The Apple variant never uses link-for-shared
    if profile.os == OsFamily::Darwin && profile.config.link_for_shared.is_some() {
        issues.push(ValidationIssue::warning(
            "link-for-shared is ignored on os family 'darwin'",
        ));
    }

    // 8. Posix-like runtime variables are meaningless on Windows
    if profile.os == OsFamily::Windows && profile.config.library_dir.is_some() {
        issues.push(ValidationIssue::warning(
            "library-dir is ignored on os family 'windows'",
        ));
    }

    // 9. Every bootstrap source includes the runtime's headers
    if profile.config.include_dir.is_none() {
        issues.push(ValidationIssue::error("include-dir is required"));
    }

    // 10. Windows links resolve the runtime through its import library
    if profile.os == OsFamily::Windows && profile.config.import_library_dir.is_none() {
        issues.push(ValidationIssue::error(
            "import-library-dir is required on os family 'windows'",
        ));
    }
    if profile.os.is_posix_like() && profile.config.import_library_dir.is_some() {
        issues.push(ValidationIssue::warning(format!(
            "import-library-dir is ignored on os family '{}'",
            profile.os
        )));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.profile.toml` for a new profile.
///
/// Seeds from linux-x86_64 with the given custom name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut profile = PlatformProfile::linux_x86_64(RuntimeVersion::new(3, 9));
    profile.name = name.into();
    profile_to_toml(&profile)
}

/// Discover all `.profile.toml` files in a project's `profiles/` directory.
///
/// Returns a list of (profile_name, file_path) pairs sorted by name.
pub fn discover_profiles(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let profiles_dir = project_dir.join("profiles");
    if !profiles_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut profiles = Vec::new();
    for entry in std::fs::read_dir(&profiles_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(PROFILE_FILE_SUFFIX))
            .map(str::to_string);
        if let Some(name) = name {
            profiles.push((name, path));
        }
    }
    profiles.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_windows() {
        let original = PlatformProfile::windows_amd64(RuntimeVersion::new(3, 9), CompilerFamily::Mingw);
        let toml_str = profile_to_toml(&original).unwrap();
        let parsed = parse_profile_toml(&toml_str).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
name = "alpine"
os = "posix"
compiler = "native"
runtime-version = "3.11"
abi-flags = ""
platform-tag = "linux-x86_64"

[config]
module-suffix = ".cpython-311-x86_64-linux-musl.so"
include-dir = "/usr/include/python3.11"
library-dir = "/usr/lib/python3.11/config-3.11-x86_64-linux-musl"
libm = "-lm"
"#;
        let profile = parse_profile_toml(toml_str).unwrap();
        assert_eq!(profile.name, "alpine");
        assert_eq!(profile.runtime_version, RuntimeVersion::new(3, 11));
        assert_eq!(profile.config.libm.as_deref(), Some("-lm"));
        assert!(profile.config.link_for_shared.is_none());
        assert!(validate_profile(&profile).is_ok());
    }

    #[test]
    fn parse_invalid_returns_error() {
        assert!(parse_profile_toml("this is not valid toml [[[").is_err());
    }

    #[test]
    fn parse_bad_version_returns_error() {
        let toml_str = r#"
name = "bad"
os = "posix"
compiler = "native"
runtime-version = "three"
platform-tag = "linux-x86_64"

[config]
module-suffix = ".so"
"#;
        assert!(parse_profile_toml(toml_str).is_err());
    }

    #[test]
    fn parse_missing_field_returns_error() {
        assert!(parse_profile_toml("name = \"incomplete\"\n").is_err());
    }

    #[test]
    fn validate_builtin_profiles() {
        let v = RuntimeVersion::new(3, 9);
        assert!(validate_profile(&PlatformProfile::linux_x86_64(v)).is_ok());
        assert!(validate_profile(&PlatformProfile::windows_amd64(v, CompilerFamily::Msvc)).is_ok());
        // Framework builds report link-for-shared, which darwin ignores.
        let issues = validate_profile(&PlatformProfile::macos_x86_64(v)).unwrap_err();
        assert!(issues.iter().all(|i| !i.is_error()));
    }

    #[test]
    fn validate_incompatible_compiler() {
        let profile = PlatformProfile::linux_x86_64(RuntimeVersion::new(3, 9))
            .with_compiler(CompilerFamily::Msvc);
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("not supported")));
    }

    #[test]
    fn validate_missing_library_dir() {
        let mut profile = PlatformProfile::linux_x86_64(RuntimeVersion::new(3, 9));
        profile.config.library_dir = None;
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("library-dir")));
    }

    #[test]
    fn validate_missing_header_dirs() {
        let mut profile = PlatformProfile::linux_x86_64(RuntimeVersion::new(3, 9));
        profile.config.include_dir = None;
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.is_error() && i.message.contains("include-dir")));

        let mut windows =
            PlatformProfile::windows_amd64(RuntimeVersion::new(3, 9), CompilerFamily::Mingw);
        windows.config.import_library_dir = None;
        let issues = validate_profile(&windows).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.is_error() && i.message.contains("import-library-dir")));
    }

    #[test]
    fn validate_old_runtime() {
        let profile = PlatformProfile::linux_x86_64(RuntimeVersion::new(2, 7));
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("older than")));
    }

    #[test]
    fn validate_whitespace_abi_flags() {
        let profile = PlatformProfile::linux_x86_64(RuntimeVersion::new(3, 9)).with_abi_flags("d m");
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("abi-flags")));
    }

    #[test]
    fn generate_template_is_valid() {
        let toml_str = generate_template("my-distro").unwrap();
        let profile = parse_profile_toml(&toml_str).unwrap();
        assert_eq!(profile.name, "my-distro");
        assert!(validate_profile(&profile).is_ok());
    }

    #[test]
    fn discover_profiles_finds_files() {
        let dir = tempfile::tempdir().unwrap();
        let profiles_dir = dir.path().join("profiles");
        std::fs::create_dir_all(&profiles_dir).unwrap();

        let template = generate_template("a").unwrap();
        std::fs::write(profiles_dir.join("win-mingw.profile.toml"), &template).unwrap();
        std::fs::write(profiles_dir.join("linux.profile.toml"), &template).unwrap();
        std::fs::write(profiles_dir.join("notes.txt"), "ignore me").unwrap();

        let profiles = discover_profiles(dir.path()).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].0, "linux");
        assert_eq!(profiles[1].0, "win-mingw");
    }

    #[test]
    fn discover_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_profiles(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn load_not_found() {
        let result = load_profile_toml(Path::new("/nonexistent/path.profile.toml"));
        assert!(matches!(result.unwrap_err(), PlatformError::NotFound { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.profile.toml");
        std::fs::write(&path, generate_template("file-test").unwrap()).unwrap();

        let profile = load_profile_toml(&path).unwrap();
        assert_eq!(profile.name, "file-test");
    }
}
