//! Link policy: which libraries, search paths and flags a bootstrap target needs.
//!
//! The policy is a static table keyed by (OS family, compiler family,
//! subsystem). Exactly one row applies to any supported combination; a
//! combination with no row is a configuration error rather than an empty plan.

use std::collections::BTreeMap;
use std::path::PathBuf;

use freezeboot_platform::{config_tokens, CompilerFamily, OsFamily, PlatformProfile};
use serde::Serialize;

use crate::error::{BuildError, Result};
use crate::target::{BuildTarget, SubsystemKind};

/// Environment variable the GNU linker reads for the default run-time search path.
pub const RUNTIME_SEARCH_PATH_VAR: &str = "LD_RUN_PATH";

/// Run-time search path baked into posix-like executables, relative to the
/// executable's own directory.
pub const RUNTIME_SEARCH_PATH: &str = "${ORIGIN}/../lib:${ORIGIN}/lib";

/// Libraries, search paths and flags for one link invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPlan {
    /// Library names, in link order, without duplicates.
    pub libraries: Vec<String>,
    /// Library search directories, in order, without duplicates.
    pub library_dirs: Vec<PathBuf>,
    pub runtime_library_dirs: Vec<PathBuf>,
    /// Flags appended after objects and libraries.
    pub extra_args: Vec<String>,
    /// Environment overrides for the linker process only.
    pub env: BTreeMap<String, String>,
}

impl LinkPlan {
    /// A plan holding only what the target declares itself.
    pub fn from_target(target: &BuildTarget) -> Self {
        let mut plan = Self::default();
        for lib in &target.libraries {
            plan.add_library(lib.clone());
        }
        for dir in &target.library_dirs {
            plan.add_library_dir(dir.clone());
        }
        for dir in &target.runtime_library_dirs {
            if !plan.runtime_library_dirs.contains(dir) {
                plan.runtime_library_dirs.push(dir.clone());
            }
        }
        plan.extra_args.extend(target.extra_link_args.iter().cloned());
        plan
    }

    pub fn add_library(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.libraries.contains(&name) {
            self.libraries.push(name);
        }
    }

    pub fn add_library_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.library_dirs.contains(&dir) {
            self.library_dirs.push(dir);
        }
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.extra_args.push(arg.into());
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.extra_args.iter().any(|a| a == arg)
    }
}

/// One row of the link policy table.
pub struct LinkRule {
    pub name: &'static str,
    pub os: &'static [OsFamily],
    pub compilers: &'static [CompilerFamily],
    pub subsystems: &'static [SubsystemKind],
    apply: fn(&PlatformProfile, &mut LinkPlan),
}

impl LinkRule {
    pub fn matches(&self, os: OsFamily, compiler: CompilerFamily, subsystem: SubsystemKind) -> bool {
        self.os.contains(&os) && self.compilers.contains(&compiler) && self.subsystems.contains(&subsystem)
    }

    /// Apply this row's fragment to `plan`.
    pub fn apply(&self, profile: &PlatformProfile, plan: &mut LinkPlan) {
        (self.apply)(profile, plan)
    }
}

impl std::fmt::Debug for LinkRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkRule")
            .field("name", &self.name)
            .field("os", &self.os)
            .field("compilers", &self.compilers)
            .field("subsystems", &self.subsystems)
            .finish()
    }
}

/// The link policy table.
pub static LINK_RULES: &[LinkRule] = &[
    LinkRule {
        name: "msvc-manifest",
        os: &[OsFamily::Windows],
        compilers: &[CompilerFamily::Msvc],
        subsystems: &SubsystemKind::EXECUTABLES,
        apply: msvc_manifest,
    },
    LinkRule {
        name: "mingw-windowed",
        os: &[OsFamily::Windows],
        compilers: &[CompilerFamily::Mingw],
        subsystems: &[SubsystemKind::Windowed],
        apply: mingw_windowed,
    },
    LinkRule {
        name: "mingw-console",
        os: &[OsFamily::Windows],
        compilers: &[CompilerFamily::Mingw],
        subsystems: &[SubsystemKind::Console, SubsystemKind::Service],
        apply: mingw_console,
    },
    LinkRule {
        name: "posix-runtime",
        os: &[OsFamily::Posix],
        compilers: &[CompilerFamily::Native],
        subsystems: &SubsystemKind::EXECUTABLES,
        apply: posix_runtime,
    },
    LinkRule {
        name: "darwin-runtime",
        os: &[OsFamily::Darwin],
        compilers: &[CompilerFamily::Native],
        subsystems: &SubsystemKind::EXECUTABLES,
        apply: darwin_runtime,
    },
    LinkRule {
        name: "windows-module",
        os: &[OsFamily::Windows],
        compilers: &[CompilerFamily::Msvc, CompilerFamily::Mingw],
        subsystems: &[SubsystemKind::UtilityModule],
        apply: windows_module,
    },
    LinkRule {
        name: "posix-module",
        os: &[OsFamily::Posix, OsFamily::Darwin],
        compilers: &[CompilerFamily::Native],
        subsystems: &[SubsystemKind::UtilityModule],
        apply: plain_module,
    },
];

/// Look up the single rule for a combination.
pub fn link_rule_for(
    os: OsFamily,
    compiler: CompilerFamily,
    subsystem: SubsystemKind,
) -> Result<&'static LinkRule> {
    let mut matching = LINK_RULES
        .iter()
        .filter(|rule| rule.matches(os, compiler, subsystem));
    let first = matching.next().ok_or(BuildError::NoLinkRule {
        os,
        compiler,
        subsystem,
    })?;
    let rest: Vec<_> = matching.map(|rule| rule.name).collect();
    if !rest.is_empty() {
        return Err(BuildError::AmbiguousLinkRule {
            os,
            compiler,
            subsystem,
            rules: std::iter::once(first.name).chain(rest).collect(),
        });
    }
    Ok(first)
}

/// Compute the link plan for `target` on `profile`.
///
/// Depends only on its two arguments: the plan of one target never depends
/// on another target's build.
pub fn compute_link_plan(target: &BuildTarget, profile: &PlatformProfile) -> Result<LinkPlan> {
    let rule = link_rule_for(profile.os, profile.compiler, target.subsystem)?;
    let mut plan = LinkPlan::from_target(target);
    rule.apply(profile, &mut plan);
    Ok(plan)
}

fn msvc_manifest(profile: &PlatformProfile, plan: &mut LinkPlan) {
    windows_runtime_linkage(profile, plan);
    plan.push_arg("/MANIFEST");
}

fn mingw_windowed(profile: &PlatformProfile, plan: &mut LinkPlan) {
    windows_runtime_linkage(profile, plan);
    plan.push_arg("-mwindows");
    mingw_unicode(profile, plan);
}

fn mingw_console(profile: &PlatformProfile, plan: &mut LinkPlan) {
    windows_runtime_linkage(profile, plan);
    plan.push_arg("-mconsole");
    mingw_unicode(profile, plan);
}

/// 3.x runtimes expose a wide-character entry point.
fn mingw_unicode(profile: &PlatformProfile, plan: &mut LinkPlan) {
    if profile.runtime_version.major == 3 {
        plan.push_arg("-municode");
    }
}

fn posix_runtime(profile: &PlatformProfile, plan: &mut LinkPlan) {
    runtime_linkage(profile, plan, true);
    plan.push_arg("-s");
}

fn darwin_runtime(profile: &PlatformProfile, plan: &mut LinkPlan) {
    runtime_linkage(profile, plan, false);
    plan.push_arg("-shared-libgcc");
}

fn windows_module(profile: &PlatformProfile, plan: &mut LinkPlan) {
    windows_runtime_linkage(profile, plan);
}

fn plain_module(_profile: &PlatformProfile, _plan: &mut LinkPlan) {}

/// MSVC finds the runtime's import library through a pragma in its headers;
/// MinGW has to be given it by name.
fn windows_runtime_linkage(profile: &PlatformProfile, plan: &mut LinkPlan) {
    if let Some(dir) = &profile.config.import_library_dir {
        plan.add_library_dir(dir.clone());
    }
    if profile.compiler == CompilerFamily::Mingw {
        plan.add_library(profile.runtime_import_library());
    }
}

fn runtime_linkage(profile: &PlatformProfile, plan: &mut LinkPlan, link_for_shared: bool) {
    let config = &profile.config;
    if let Some(dir) = &config.library_dir {
        plan.add_library_dir(dir.clone());
    }
    plan.add_library(profile.runtime_library());
    if link_for_shared {
        plan.extra_args
            .extend(config_tokens(config.link_for_shared.as_deref()));
    }
    for value in [
        &config.libs,
        &config.libm,
        &config.base_mod_libs,
        &config.local_mod_libs,
    ] {
        plan.extra_args.extend(config_tokens(value.as_deref()));
    }
    plan.env.insert(
        RUNTIME_SEARCH_PATH_VAR.to_string(),
        RUNTIME_SEARCH_PATH.to_string(),
    );
}
