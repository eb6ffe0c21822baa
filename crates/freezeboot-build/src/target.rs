//! Bootstrap build targets.
//!
//! A [`BuildTarget`] describes one bootstrap variant: its sources, the
//! libraries it declares, and the OS subsystem it runs under. Targets are
//! immutable once constructed; dependency-specific directories are applied
//! by building a new target.

use std::fmt;
use std::path::{Path, PathBuf};

use freezeboot_platform::{OsFamily, PlatformProfile};
use serde::{Deserialize, Serialize};

use crate::dependency::ExternalDependency;
use crate::error::{BuildError, Result};

/// Name of the logging-support import library linked by the service variant.
pub const LOGGING_SUPPORT_LIBRARY: &str = "cx_Logging";

/// The OS-level execution mode of a produced binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubsystemKind {
    /// Console-attached executable.
    Console,
    /// GUI executable without a console window.
    Windowed,
    /// Background service executable.
    Service,
    /// Auxiliary loadable module; keeps its module name.
    UtilityModule,
}

impl SubsystemKind {
    pub const ALL: [SubsystemKind; 4] = [
        SubsystemKind::Console,
        SubsystemKind::Windowed,
        SubsystemKind::Service,
        SubsystemKind::UtilityModule,
    ];

    /// Kinds that are linked as standalone executables.
    pub const EXECUTABLES: [SubsystemKind; 3] = [
        SubsystemKind::Console,
        SubsystemKind::Windowed,
        SubsystemKind::Service,
    ];

    pub fn is_executable(self) -> bool {
        self != SubsystemKind::UtilityModule
    }

    /// Whether targets of this kind are only built on Windows.
    pub fn windows_only(self) -> bool {
        self != SubsystemKind::Console
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubsystemKind::Console => "console",
            SubsystemKind::Windowed => "windowed",
            SubsystemKind::Service => "service",
            SubsystemKind::UtilityModule => "utility-module",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bootstrap variant to compile and link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildTarget {
    /// Dotted module name, e.g. `freezer.bases.Console`.
    pub name: String,
    /// C sources compiled into the target.
    pub sources: Vec<PathBuf>,
    /// Files the sources include. Informational: every build recompiles all sources.
    #[serde(default)]
    pub depends: Vec<PathBuf>,
    /// Libraries the target declares itself.
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub library_dirs: Vec<PathBuf>,
    /// Directories searched for shared libraries at run time.
    #[serde(default)]
    pub runtime_library_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
    pub subsystem: SubsystemKind,
}

impl BuildTarget {
    pub fn new(name: impl Into<String>, sources: Vec<PathBuf>, subsystem: SubsystemKind) -> Self {
        Self {
            name: name.into(),
            sources,
            depends: Vec::new(),
            libraries: Vec::new(),
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            runtime_library_dirs: Vec::new(),
            extra_link_args: Vec::new(),
            subsystem,
        }
    }

    pub fn with_depends(mut self, depends: Vec<PathBuf>) -> Self {
        self.depends = depends;
        self
    }

    pub fn with_libraries<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries.extend(libraries.into_iter().map(Into::into));
        self
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dirs.push(dir.into());
        self
    }

    /// Whether the target links the optional logging-support library.
    pub fn requires_logging_support(&self) -> bool {
        self.subsystem == SubsystemKind::Service
    }

    /// A copy of this target that compiles and links against `dependency`.
    pub fn with_dependency(&self, dependency: &ExternalDependency) -> Self {
        self.clone()
            .with_include_dir(&dependency.include_dir)
            .with_library_dir(&dependency.import_library_dir)
    }

    /// Path components of the dotted name.
    pub fn name_components(&self) -> impl Iterator<Item = &str> {
        self.name.split('.')
    }

    /// Check the target is buildable.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| BuildError::InvalidTarget {
            name: self.name.clone(),
            message: message.to_string(),
        };
        if self.name.is_empty() || self.name_components().any(str::is_empty) {
            return Err(invalid("name must be a dotted path without empty components"));
        }
        if self.sources.is_empty() {
            return Err(invalid("no sources"));
        }
        Ok(())
    }
}

/// Where the standard bootstrap sources live and which package they build into.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Directory holding `bases/` and `util.c`.
    pub source_dir: PathBuf,
    /// Dotted package prefix of the produced artifacts.
    pub package: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            package: "freezer".into(),
        }
    }
}

impl CatalogConfig {
    fn base_source(&self, file: &str) -> PathBuf {
        self.source_dir.join("bases").join(file)
    }

    /// The resource script embedding the Windows manifest.
    pub fn manifest_resource(&self) -> PathBuf {
        self.base_source("manifest.rc")
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

/// The standard set of bootstrap variants.
///
/// Contains every variant regardless of platform; the orchestrator decides
/// which ones are built. Windows system libraries are only declared when the
/// profile targets Windows.
pub fn standard_catalog(config: &CatalogConfig, profile: &PlatformProfile) -> Vec<BuildTarget> {
    let base_libraries: Vec<&str> = match profile.os {
        OsFamily::Windows => vec!["imagehlp", "Shlwapi"],
        OsFamily::Posix | OsFamily::Darwin => Vec::new(),
    };
    let depends = vec![config.base_source("Common.c")];
    let pkg = &config.package;

    let console = BuildTarget::new(
        format!("{pkg}.bases.Console"),
        vec![config.base_source("Console.c")],
        SubsystemKind::Console,
    )
    .with_depends(depends.clone())
    .with_libraries(base_libraries.iter().copied());

    let gui = BuildTarget::new(
        format!("{pkg}.bases.Win32GUI"),
        vec![config.base_source("Win32GUI.c")],
        SubsystemKind::Windowed,
    )
    .with_depends(depends.clone())
    .with_libraries(base_libraries.iter().copied().chain(["user32"]));

    let service = BuildTarget::new(
        format!("{pkg}.bases.Win32Service"),
        vec![config.base_source("Win32Service.c")],
        SubsystemKind::Service,
    )
    .with_depends(depends.clone())
    .with_libraries(
        base_libraries
            .iter()
            .copied()
            .chain(["advapi32", LOGGING_SUPPORT_LIBRARY]),
    );

    let util = BuildTarget::new(
        format!("{pkg}.util"),
        vec![config.source_dir.join("util.c")],
        SubsystemKind::UtilityModule,
    )
    .with_libraries(base_libraries.iter().copied());

    vec![console, gui, service, util]
}
