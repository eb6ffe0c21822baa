//! Host profile discovery.
//!
//! Asks the runtime interpreter for its version and configuration variables
//! and turns the answer into a [`PlatformProfile`].

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{PlatformError, Result};
use crate::family::{CompilerFamily, OsFamily};
use crate::profile::PlatformProfile;
use crate::runtime::RuntimeConfig;

/// Script run by the interpreter; prints a single JSON object.
pub const PROBE_SCRIPT: &str = r#"import json, os, sys, sysconfig
v = sysconfig.get_config_vars()
keys = ("LIBPL", "LINKFORSHARED", "LIBS", "LIBM", "BASEMODLIBS", "LOCALMODLIBS")
out = {k: v.get(k) for k in keys}
out["EXT_SUFFIX"] = v.get("EXT_SUFFIX") or v.get("SO")
out["INCLUDEPY"] = v.get("INCLUDEPY") or sysconfig.get_paths().get("include")
if os.name == "nt":
    out["IMPLIBDIR"] = os.path.join(getattr(sys, "base_exec_prefix", sys.exec_prefix), "libs")
out["version"] = "%d.%d" % sys.version_info[:2]
out["abiflags"] = getattr(sys, "abiflags", "")
out["platform"] = sysconfig.get_platform()
print(json.dumps(out))
"#;

/// Raw answer of [`PROBE_SCRIPT`].
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    version: String,
    #[serde(default)]
    abiflags: Option<String>,
    platform: String,
    #[serde(rename = "EXT_SUFFIX")]
    ext_suffix: Option<String>,
    #[serde(rename = "INCLUDEPY", default)]
    include_py: Option<String>,
    #[serde(rename = "LIBPL")]
    libpl: Option<String>,
    #[serde(rename = "IMPLIBDIR", default)]
    import_library_dir: Option<String>,
    #[serde(rename = "LINKFORSHARED")]
    link_for_shared: Option<String>,
    #[serde(rename = "LIBS")]
    libs: Option<String>,
    #[serde(rename = "LIBM")]
    libm: Option<String>,
    #[serde(rename = "BASEMODLIBS")]
    base_mod_libs: Option<String>,
    #[serde(rename = "LOCALMODLIBS")]
    local_mod_libs: Option<String>,
}

/// Map a runtime platform identifier to an OS family.
pub fn os_family_for_tag(platform_tag: &str) -> OsFamily {
    if platform_tag.starts_with("win") || platform_tag.starts_with("mingw") {
        OsFamily::Windows
    } else if platform_tag.starts_with("macosx") || platform_tag.starts_with("darwin") {
        OsFamily::Darwin
    } else {
        OsFamily::Posix
    }
}

/// Build a profile from the probe script's JSON answer.
///
/// `compiler` overrides the conventional compiler family for the OS.
pub fn profile_from_probe(json: &str, compiler: Option<CompilerFamily>) -> Result<PlatformProfile> {
    let raw: ProbeOutput = serde_json::from_str(json)?;
    let os = os_family_for_tag(&raw.platform);
    let compiler = compiler.unwrap_or_else(|| CompilerFamily::default_for(os));

    let module_suffix = non_empty(raw.ext_suffix).ok_or_else(|| PlatformError::Validation {
        detail: "runtime reported no extension module suffix".into(),
    })?;
    let config = RuntimeConfig {
        module_suffix,
        include_dir: non_empty(raw.include_py).map(PathBuf::from),
        library_dir: non_empty(raw.libpl).map(PathBuf::from),
        import_library_dir: non_empty(raw.import_library_dir).map(PathBuf::from),
        link_for_shared: non_empty(raw.link_for_shared),
        libs: non_empty(raw.libs),
        libm: non_empty(raw.libm),
        base_mod_libs: non_empty(raw.base_mod_libs),
        local_mod_libs: non_empty(raw.local_mod_libs),
    };

    let name = format!("host-{}-{compiler}", raw.platform);
    Ok(PlatformProfile::compose(
        name,
        os,
        compiler,
        raw.version.parse()?,
        raw.platform,
        config,
    )
    .with_abi_flags(raw.abiflags.unwrap_or_default()))
}

/// Run `interpreter` and derive the host profile from its configuration.
pub fn probe_runtime(interpreter: &Path, compiler: Option<CompilerFamily>) -> Result<PlatformProfile> {
    let probe_failed = |detail: String| PlatformError::ProbeFailed {
        interpreter: interpreter.display().to_string(),
        detail,
    };

    let output = Command::new(interpreter)
        .arg("-c")
        .arg(PROBE_SCRIPT)
        .output()
        .map_err(|e| probe_failed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(probe_failed(format!("{}: {}", output.status, stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    profile_from_probe(stdout.trim(), compiler)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
