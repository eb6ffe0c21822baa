//! Complete platform profile.
//!
//! Combines OS family, compiler family and the embedding runtime's
//! configuration into the read-only context consulted by the link policy
//! and the artifact namer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::family::{CompilerFamily, OsFamily};
use crate::runtime::{RuntimeConfig, RuntimeVersion, RUNTIME_LIBRARY_STEM};

/// Read-only description of the platform a build runs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformProfile {
    /// Profile name (e.g., "linux-x86_64", "win-amd64-mingw").
    pub name: String,
    /// Operating-system family.
    pub os: OsFamily,
    /// Compiler family.
    pub compiler: CompilerFamily,
    /// Version of the embedding runtime.
    pub runtime_version: RuntimeVersion,
    /// ABI flags appended to the runtime library name (e.g. "d", "m").
    #[serde(default)]
    pub abi_flags: String,
    /// The runtime's platform identifier (e.g., "linux-x86_64", "win-amd64").
    pub platform_tag: String,
    /// Runtime configuration variables.
    pub config: RuntimeConfig,
}

impl PlatformProfile {
    /// Compose a profile from its parts with empty ABI flags.
    pub fn compose(
        name: impl Into<String>,
        os: OsFamily,
        compiler: CompilerFamily,
        runtime_version: RuntimeVersion,
        platform_tag: impl Into<String>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            name: name.into(),
            os,
            compiler,
            runtime_version,
            abi_flags: String::new(),
            platform_tag: platform_tag.into(),
            config,
        }
    }

    /// Same profile driven by a different compiler family.
    pub fn with_compiler(mut self, compiler: CompilerFamily) -> Self {
        self.compiler = compiler;
        self
    }

    /// Same profile with different runtime ABI flags.
    pub fn with_abi_flags(mut self, abi_flags: impl Into<String>) -> Self {
        self.abi_flags = abi_flags.into();
        self
    }

    /// Suffix of a native executable: empty on posix-like systems, `.exe` on Windows.
    pub fn executable_suffix(&self) -> &'static str {
        match self.os {
            OsFamily::Windows => ".exe",
            OsFamily::Posix | OsFamily::Darwin => "",
        }
    }

    /// Suffix of a loadable extension module.
    pub fn module_suffix(&self) -> &str {
        &self.config.module_suffix
    }

    /// Versioned name of the runtime's shared library, e.g. `python3.9`.
    pub fn runtime_library(&self) -> String {
        format!(
            "{RUNTIME_LIBRARY_STEM}{}{}",
            self.runtime_version, self.abi_flags
        )
    }

    /// Name of the runtime's Windows import library, e.g. `python39`.
    pub fn runtime_import_library(&self) -> String {
        format!(
            "{RUNTIME_LIBRARY_STEM}{}{}",
            self.runtime_version.major, self.runtime_version.minor
        )
    }

    /// Name of the prebuilt import-library directory for an external
    /// dependency built against this runtime, e.g. `implib.win-amd64-3.9`.
    pub fn import_library_dir_name(&self) -> String {
        format!("implib.{}-{}", self.platform_tag, self.runtime_version)
    }

    /// Generic Linux x86-64 with a distribution-packaged runtime.
    pub fn linux_x86_64(version: RuntimeVersion) -> Self {
        let v = version;
        let config = RuntimeConfig {
            module_suffix: format!(".cpython-{}{}-x86_64-linux-gnu.so", v.major, v.minor),
            include_dir: Some(PathBuf::from(format!("/usr/include/python{v}"))),
            library_dir: Some(PathBuf::from(format!(
                "/usr/lib/python{v}/config-{v}-x86_64-linux-gnu"
            ))),
            import_library_dir: None,
            link_for_shared: Some("-Xlinker -export-dynamic".into()),
            libs: Some("-lcrypt -lpthread -ldl -lutil -lm".into()),
            libm: Some("-lm".into()),
            base_mod_libs: None,
            local_mod_libs: None,
        };
        Self::compose(
            "linux-x86_64",
            OsFamily::Posix,
            CompilerFamily::Native,
            version,
            "linux-x86_64",
            config,
        )
    }

    /// macOS with a framework build of the runtime.
    pub fn macos_x86_64(version: RuntimeVersion) -> Self {
        let v = version;
        let config = RuntimeConfig {
            module_suffix: format!(".cpython-{}{}-darwin.so", v.major, v.minor),
            include_dir: Some(PathBuf::from(format!(
                "/Library/Frameworks/Python.framework/Versions/{v}/include/python{v}"
            ))),
            library_dir: Some(PathBuf::from(format!(
                "/Library/Frameworks/Python.framework/Versions/{v}/lib/python{v}/config-{v}-darwin"
            ))),
            import_library_dir: None,
            link_for_shared: Some(format!(
                "-Wl,-stack_size,1000000 -framework CoreFoundation Python.framework/Versions/{v}/Python"
            )),
            libs: Some("-ldl -framework CoreFoundation".into()),
            libm: None,
            base_mod_libs: None,
            local_mod_libs: None,
        };
        Self::compose(
            "macos-x86_64",
            OsFamily::Darwin,
            CompilerFamily::Native,
            version,
            "macosx-10.9-x86_64",
            config,
        )
    }

    /// 64-bit Windows with the given compiler family and an all-users
    /// install of the runtime.
    pub fn windows_amd64(version: RuntimeVersion, compiler: CompilerFamily) -> Self {
        let prefix = format!("C:/Program Files/Python{}{}", version.major, version.minor);
        let config = RuntimeConfig {
            include_dir: Some(PathBuf::from(format!("{prefix}/include"))),
            import_library_dir: Some(PathBuf::from(format!("{prefix}/libs"))),
            ..RuntimeConfig::with_module_suffix(format!(
                ".cp{}{}-win_amd64.pyd",
                version.major, version.minor
            ))
        };
        Self::compose(
            format!("win-amd64-{compiler}"),
            OsFamily::Windows,
            compiler,
            version,
            "win-amd64",
            config,
        )
    }
}
