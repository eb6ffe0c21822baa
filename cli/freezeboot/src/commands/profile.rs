//! `freezeboot profile`: profile resolution, display and validation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use freezeboot_platform::{
    discover_profiles, generate_template, load_profile_toml, probe_runtime, profile_to_toml,
    validate_profile, PlatformProfile,
};

use crate::manifest::{
    builtin_profiles, default_interpreter, parse_compiler, resolve_builtin_profile,
    FreezebootManifest,
};

/// Where the profile for a command comes from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileSource<'a> {
    /// `--profile`: a file, a name under `profiles/`, or a built-in name.
    pub profile: Option<&'a str>,
    /// `--compiler` override.
    pub compiler: Option<&'a str>,
    /// `--interpreter` used for probing the host.
    pub interpreter: Option<&'a Path>,
}

/// The interpreter named on the command line, in the manifest, or the default.
pub fn interpreter(manifest: Option<&FreezebootManifest>, arg: Option<&Path>) -> PathBuf {
    arg.map(Path::to_path_buf)
        .or_else(|| manifest.and_then(|m| m.runtime.interpreter.clone()))
        .unwrap_or_else(default_interpreter)
}

/// Resolve the platform profile for a command.
///
/// Precedence: `--profile`, then `[runtime] profile`, then probing the
/// interpreter. A compiler override from the command line or the manifest
/// is applied last. Warnings are printed; errors abort.
pub fn resolve(
    project_dir: &Path,
    manifest: Option<&FreezebootManifest>,
    source: &ProfileSource<'_>,
) -> Result<PlatformProfile> {
    let compiler = match parse_compiler(source.compiler)? {
        Some(c) => Some(c),
        None => match manifest {
            Some(m) => m.compiler()?,
            None => None,
        },
    };

    let named = source
        .profile
        .or_else(|| manifest.and_then(|m| m.runtime.profile.as_deref()));
    let profile = match named {
        Some(name) => {
            let profile = load_named(project_dir, name)?;
            match compiler {
                Some(c) => profile.with_compiler(c),
                None => profile,
            }
        }
        None => {
            let interpreter = interpreter(manifest, source.interpreter);
            probe_runtime(&interpreter, compiler)
                .with_context(|| format!("probing runtime {}", interpreter.display()))?
        }
    };

    check(&profile)?;
    Ok(profile)
}

fn load_named(project_dir: &Path, name: &str) -> Result<PlatformProfile> {
    let path = project_dir.join(name);
    if path.is_file() {
        return load_profile_toml(&path).with_context(|| format!("loading {}", path.display()));
    }
    for (discovered, path) in discover_profiles(project_dir)? {
        if discovered == name {
            return load_profile_toml(&path)
                .with_context(|| format!("loading {}", path.display()));
        }
    }
    match resolve_builtin_profile(name) {
        Some(profile) => Ok(profile),
        None => bail!("unknown profile: '{name}'. Use 'freezeboot profile list' to see available profiles."),
    }
}

/// Print warnings and fail on errors.
fn check(profile: &PlatformProfile) -> Result<()> {
    if let Err(issues) = validate_profile(profile) {
        let mut errors = 0;
        for issue in &issues {
            if issue.is_error() {
                errors += 1;
                eprintln!("error: profile '{}': {}", profile.name, issue.message);
            } else {
                eprintln!("warning: profile '{}': {}", profile.name, issue.message);
            }
        }
        if errors > 0 {
            bail!("profile '{}' has {errors} error(s)", profile.name);
        }
    }
    Ok(())
}

/// Print the resolved profile.
pub fn show(
    project_dir: &Path,
    manifest: Option<&FreezebootManifest>,
    source: &ProfileSource<'_>,
    format: Option<&str>,
) -> Result<()> {
    let profile = resolve(project_dir, manifest, source)?;
    match format.unwrap_or("toml") {
        "toml" => print!("{}", profile_to_toml(&profile)?),
        "json" => println!("{}", serde_json::to_string_pretty(&profile)?),
        other => bail!("unknown format: '{other}' (expected toml or json)"),
    }
    Ok(())
}

/// Validate a `.profile.toml` file.
pub fn validate(path: &Path) -> Result<()> {
    let profile =
        load_profile_toml(path).with_context(|| format!("loading {}", path.display()))?;
    match validate_profile(&profile) {
        Ok(()) => {
            println!("Profile '{}' is valid.", profile.name);
            Ok(())
        }
        Err(issues) => {
            let mut has_errors = false;
            for issue in &issues {
                println!("  [{}] {}", issue.severity, issue.message);
                has_errors |= issue.is_error();
            }
            if has_errors {
                bail!("profile '{}' failed validation", profile.name);
            }
            println!("Profile '{}' is valid (with warnings).", profile.name);
            Ok(())
        }
    }
}

/// List built-in and project profiles.
pub fn list(project_dir: &Path) -> Result<()> {
    println!("Built-in profiles:");
    println!();
    for (name, description) in builtin_profiles() {
        println!("  {name:<25} {description}");
    }

    let discovered = discover_profiles(project_dir)?;
    if !discovered.is_empty() {
        println!();
        println!("Project profiles:");
        println!();
        for (name, path) in discovered {
            println!("  {name:<25} {}", path.display());
        }
    }
    println!();
    println!("Use 'freezeboot profile show --profile <name>' for details.");
    Ok(())
}

/// Print a starter profile named `name`.
pub fn template(name: &str) -> Result<()> {
    print!("{}", generate_template(name)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezeboot_platform::CompilerFamily;

    fn builtin(name: &'static str) -> ProfileSource<'static> {
        ProfileSource {
            profile: Some(name),
            ..ProfileSource::default()
        }
    }

    #[test]
    fn resolves_builtin_name() {
        let dir = tempfile::tempdir().unwrap();
        let profile = resolve(dir.path(), None, &builtin("win-amd64-msvc")).unwrap();
        assert_eq!(profile.compiler, CompilerFamily::Msvc);
    }

    #[test]
    fn compiler_override_applies() {
        let dir = tempfile::tempdir().unwrap();
        let source = ProfileSource {
            compiler: Some("mingw"),
            ..builtin("win-amd64-msvc")
        };
        let profile = resolve(dir.path(), None, &source).unwrap();
        assert_eq!(profile.compiler, CompilerFamily::Mingw);
    }

    #[test]
    fn resolves_project_profile_by_name_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = dir.path().join("profiles");
        std::fs::create_dir(&profiles).unwrap();
        std::fs::write(
            profiles.join("alpine.profile.toml"),
            generate_template("alpine").unwrap(),
        )
        .unwrap();

        let by_name = resolve(dir.path(), None, &builtin("alpine")).unwrap();
        assert_eq!(by_name.name, "alpine");
        let by_path = resolve(dir.path(), None, &builtin("profiles/alpine.profile.toml")).unwrap();
        assert_eq!(by_name, by_path);
    }

    #[test]
    fn manifest_profile_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = FreezebootManifest::default();
        manifest.runtime.profile = Some("macos-x86_64".into());
        let profile = resolve(dir.path(), Some(&manifest), &ProfileSource::default()).unwrap();
        assert_eq!(profile.name, "macos-x86_64");
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(dir.path(), None, &builtin("beos")).unwrap_err();
        assert!(err.to_string().contains("unknown profile"));
    }

    #[test]
    fn invalid_profile_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.profile.toml");
        let mut profile = resolve_builtin_profile("linux-x86_64").unwrap();
        profile.config.module_suffix = String::new();
        std::fs::write(&path, profile_to_toml(&profile).unwrap()).unwrap();
        assert!(validate(&path).is_err());
    }

    #[test]
    fn interpreter_precedence() {
        let mut manifest = FreezebootManifest::default();
        assert_eq!(interpreter(Some(&manifest), None), default_interpreter());
        manifest.runtime.interpreter = Some(PathBuf::from("/opt/py"));
        assert_eq!(interpreter(Some(&manifest), None), PathBuf::from("/opt/py"));
        assert_eq!(
            interpreter(Some(&manifest), Some(Path::new("/usr/bin/py"))),
            PathBuf::from("/usr/bin/py")
        );
    }

    #[test]
    fn template_and_list_run() {
        let dir = tempfile::tempdir().unwrap();
        template("custom").unwrap();
        list(dir.path()).unwrap();
    }
}
