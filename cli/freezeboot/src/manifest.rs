//! `freezeboot.toml` project configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use freezeboot_build::dependency::{DEFAULT_REMOTE_URL, DEFAULT_TIMEOUT};
use freezeboot_build::{standard_catalog, BuildTarget, CatalogConfig, LoggingSupportConfig};
use freezeboot_platform::{CompilerFamily, PlatformProfile, RuntimeVersion};

/// File name searched for when locating a project.
pub const MANIFEST_FILE: &str = "freezeboot.toml";

/// Runtime version assumed by the built-in profiles.
pub const BUILTIN_RUNTIME_VERSION: RuntimeVersion = RuntimeVersion::new(3, 9);

/// The top-level project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FreezebootManifest {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub logging_support: LoggingSupportSection,
    /// Replaces the standard catalog when non-empty.
    #[serde(default)]
    pub targets: Vec<BuildTarget>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Directory holding `bases/` and `util.c`.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Dotted package the artifacts are placed in.
    #[serde(default = "default_package")]
    pub package: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            source_dir: default_source_dir(),
            package: default_package(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

fn default_package() -> String {
    "freezer".to_string()
}

/// Build output section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSection {
    #[serde(default = "default_build_lib")]
    pub build_lib: PathBuf,
    #[serde(default = "default_build_temp")]
    pub build_temp: PathBuf,
    /// Place artifacts next to the sources.
    #[serde(default)]
    pub inplace: bool,
    #[serde(default)]
    pub debug: bool,
    /// Accepted for compatibility; has no effect on bootstrap executables.
    #[serde(default)]
    pub optimize: bool,
    /// Resource script for MinGW executables; defaults to `<source-dir>/bases/manifest.rc`.
    #[serde(default)]
    pub manifest_resource: Option<PathBuf>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            build_lib: default_build_lib(),
            build_temp: default_build_temp(),
            inplace: false,
            debug: false,
            optimize: false,
            manifest_resource: None,
        }
    }
}

fn default_build_lib() -> PathBuf {
    PathBuf::from("build/lib")
}

fn default_build_temp() -> PathBuf {
    PathBuf::from("build/temp")
}

/// Embedding runtime section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeSection {
    /// Interpreter probed for the host profile and used for dependency builds.
    #[serde(default)]
    pub interpreter: Option<PathBuf>,
    /// Compiler family override (native, mingw, msvc).
    #[serde(default)]
    pub compiler: Option<String>,
    /// Profile file, discovered profile name, or built-in profile name.
    #[serde(default)]
    pub profile: Option<String>,
}

/// Optional logging-support library section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingSupportSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Checkout directory; defaults to a sibling of the project directory.
    #[serde(default)]
    pub checkout: Option<PathBuf>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LoggingSupportSection {
    fn default() -> Self {
        Self {
            enabled: true,
            checkout: None,
            remote: None,
            timeout_secs: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl FreezebootManifest {
    /// Search upward from `start_dir` for a `freezeboot.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: FreezebootManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing freezeboot.toml")
    }

    /// Compiler override from the manifest, if any.
    pub fn compiler(&self) -> Result<Option<CompilerFamily>> {
        self.runtime
            .compiler
            .as_deref()
            .map(|c| c.parse().context("[runtime] compiler"))
            .transpose()
    }

    pub fn catalog_config(&self, project_dir: &Path) -> CatalogConfig {
        CatalogConfig {
            source_dir: project_dir.join(&self.project.source_dir),
            package: self.project.package.clone(),
        }
    }

    /// Targets to build: the manifest's own list, or the standard catalog.
    ///
    /// Relative paths are resolved against `project_dir`.
    pub fn targets(&self, project_dir: &Path, profile: &PlatformProfile) -> Vec<BuildTarget> {
        if self.targets.is_empty() {
            return standard_catalog(&self.catalog_config(project_dir), profile);
        }
        let rebase = |paths: &[PathBuf]| -> Vec<PathBuf> {
            paths.iter().map(|p| project_dir.join(p)).collect()
        };
        self.targets
            .iter()
            .map(|t| BuildTarget {
                sources: rebase(&t.sources),
                depends: rebase(&t.depends),
                include_dirs: rebase(&t.include_dirs),
                library_dirs: rebase(&t.library_dirs),
                runtime_library_dirs: rebase(&t.runtime_library_dirs),
                ..t.clone()
            })
            .collect()
    }

    pub fn manifest_resource(&self, project_dir: &Path) -> PathBuf {
        match &self.build.manifest_resource {
            Some(path) => project_dir.join(path),
            None => self.catalog_config(project_dir).manifest_resource(),
        }
    }

    pub fn logging_support(&self, project_dir: &Path) -> LoggingSupportConfig {
        let section = &self.logging_support;
        if !section.enabled {
            return LoggingSupportConfig::disabled();
        }
        let mut config = LoggingSupportConfig::sibling_of(project_dir);
        if let Some(checkout) = &section.checkout {
            config.checkout_dir = project_dir.join(checkout);
        }
        config.remote_url = section
            .remote
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string());
        config.timeout = section
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        config
    }

    /// Generate a starter `freezeboot.toml`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
source-dir = "source"
package = "freezer"

[build]
build-lib = "build/lib"
build-temp = "build/temp"

[runtime]
interpreter = "python3"

[logging-support]
enabled = true
timeout-secs = 300
"#
        )
    }
}

/// Built-in profile names with a short description.
pub fn builtin_profiles() -> Vec<(&'static str, &'static str)> {
    vec![
        ("linux-x86_64", "Linux x86-64, distribution runtime"),
        ("macos-x86_64", "macOS x86-64, framework runtime"),
        ("win-amd64-msvc", "Windows x64, MSVC"),
        ("win-amd64-mingw", "Windows x64, MinGW"),
    ]
}

/// Resolve a built-in profile name.
pub fn resolve_builtin_profile(name: &str) -> Option<PlatformProfile> {
    let v = BUILTIN_RUNTIME_VERSION;
    match name {
        "linux-x86_64" => Some(PlatformProfile::linux_x86_64(v)),
        "macos-x86_64" => Some(PlatformProfile::macos_x86_64(v)),
        "win-amd64-msvc" => Some(PlatformProfile::windows_amd64(v, CompilerFamily::Msvc)),
        "win-amd64-mingw" => Some(PlatformProfile::windows_amd64(v, CompilerFamily::Mingw)),
        _ => None,
    }
}

/// Interpreter used when neither the command line nor the manifest names one.
pub fn default_interpreter() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("python")
    } else {
        PathBuf::from("python3")
    }
}

/// Parse a `--compiler` value.
pub fn parse_compiler(value: Option<&str>) -> Result<Option<CompilerFamily>> {
    match value {
        Some(c) => match c.parse() {
            Ok(family) => Ok(Some(family)),
            Err(e) => bail!("--compiler: {e}"),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezeboot_build::SubsystemKind;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
[project]
name = "frozen-app"
source-dir = "src/c"
package = "app"

[build]
build-lib = "out/lib"
inplace = true
debug = true
optimize = true

[runtime]
interpreter = "/opt/python/bin/python3.11"
compiler = "mingw"
profile = "win-amd64-mingw"

[logging-support]
enabled = true
checkout = "../vendor/logging"
remote = "https://example.invalid/logging.git"
timeout-secs = 30

[[targets]]
name = "app.bases.Tray"
sources = ["src/c/Tray.c"]
libraries = ["user32"]
subsystem = "windowed"
"#;
        let manifest = FreezebootManifest::from_str(toml_str).unwrap();
        assert_eq!(manifest.project.name.as_deref(), Some("frozen-app"));
        assert_eq!(manifest.project.package, "app");
        assert_eq!(manifest.build.build_lib, PathBuf::from("out/lib"));
        assert_eq!(manifest.build.build_temp, PathBuf::from("build/temp"));
        assert!(manifest.build.inplace && manifest.build.debug);
        assert_eq!(manifest.compiler().unwrap(), Some(CompilerFamily::Mingw));
        assert_eq!(manifest.runtime.profile.as_deref(), Some("win-amd64-mingw"));
        assert_eq!(manifest.targets.len(), 1);
        assert_eq!(manifest.targets[0].subsystem, SubsystemKind::Windowed);

        let logging = manifest.logging_support(Path::new("/work/app"));
        assert_eq!(logging.checkout_dir, PathBuf::from("/work/app/../vendor/logging"));
        assert_eq!(logging.timeout, Duration::from_secs(30));
        assert_eq!(logging.remote_url, "https://example.invalid/logging.git");
    }

    #[test]
    fn parse_empty_manifest_uses_defaults() {
        let manifest = FreezebootManifest::from_str("").unwrap();
        assert_eq!(manifest.project.source_dir, PathBuf::from("source"));
        assert_eq!(manifest.build.build_lib, PathBuf::from("build/lib"));
        assert!(manifest.logging_support.enabled);
        assert!(manifest.compiler().unwrap().is_none());

        let logging = manifest.logging_support(Path::new("/work/app"));
        assert_eq!(logging.checkout_dir, PathBuf::from("/work/cx_Logging"));
        assert_eq!(logging.remote_url, DEFAULT_REMOTE_URL);
    }

    #[test]
    fn disabled_logging_support() {
        let manifest = FreezebootManifest::from_str("[logging-support]\nenabled = false\n").unwrap();
        assert!(!manifest.logging_support(Path::new("/p")).enabled);
    }

    #[test]
    fn bad_compiler_is_reported() {
        let manifest = FreezebootManifest::from_str("[runtime]\ncompiler = \"borland\"\n").unwrap();
        assert!(manifest.compiler().is_err());
        assert!(parse_compiler(Some("tcc")).is_err());
        assert_eq!(parse_compiler(Some("msvc")).unwrap(), Some(CompilerFamily::Msvc));
    }

    #[test]
    fn standard_catalog_is_rooted_at_project() {
        let manifest = FreezebootManifest::default();
        let profile = resolve_builtin_profile("linux-x86_64").unwrap();
        let targets = manifest.targets(Path::new("/work/app"), &profile);
        assert_eq!(targets.len(), 4);
        assert_eq!(
            targets[0].sources,
            vec![PathBuf::from("/work/app/source/bases/Console.c")]
        );
        assert_eq!(
            manifest.manifest_resource(Path::new("/work/app")),
            PathBuf::from("/work/app/source/bases/manifest.rc")
        );
    }

    #[test]
    fn custom_targets_are_rebased() {
        let manifest = FreezebootManifest::from_str(
            r#"
[[targets]]
name = "app.bases.Console"
sources = ["c/Console.c"]
include-dirs = ["c/include"]
subsystem = "console"
"#,
        )
        .unwrap();
        let profile = resolve_builtin_profile("linux-x86_64").unwrap();
        let targets = manifest.targets(Path::new("/p"), &profile);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].sources, vec![PathBuf::from("/p/c/Console.c")]);
        assert_eq!(targets[0].include_dirs, vec![PathBuf::from("/p/c/include")]);
    }

    #[test]
    fn template_parses() {
        let manifest = FreezebootManifest::from_str(&FreezebootManifest::template("demo")).unwrap();
        assert_eq!(manifest.project.name.as_deref(), Some("demo"));
    }

    #[test]
    fn builtins_resolve() {
        for (name, _) in builtin_profiles() {
            let profile = resolve_builtin_profile(name).unwrap();
            assert_eq!(profile.name, name);
        }
        assert!(resolve_builtin_profile("solaris").is_none());
    }
}
