//! Bootstrap build orchestrator.
//!
//! Init -> SelectTargets -> (Compile -> Link -> Place) per target -> Done.
//! Targets are built one after another; the first compile or link failure
//! aborts the build.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use freezeboot_platform::{CompilerFamily, OsFamily, PlatformProfile};

use crate::dependency::{
    resolve_logging_support, AbsentReason, Availability, DependencyTools, LoggingSupportConfig,
};
use crate::error::{BuildError, Result};
use crate::link_policy::{compute_link_plan, LinkPlan};
use crate::naming::{default_module_path, derive_output_path, Placement};
use crate::report::{BuildReport, BuiltArtifact};
use crate::target::BuildTarget;
use crate::toolchain::{CompileRequest, LinkOutput, LinkRequest, Toolchain};

/// Configuration for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub profile: PlatformProfile,
    /// Targets supplied by the packaging layer.
    pub targets: Vec<BuildTarget>,
    pub placement: Placement,
    /// Directory receiving object files.
    pub build_temp: PathBuf,
    /// Resource script compiled into executables built with MinGW on Windows.
    pub manifest_resource: PathBuf,
    pub logging_support: LoggingSupportConfig,
    pub debug: bool,
}

/// Why a target was left out of the active set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The target's subsystem only exists on Windows.
    WindowsOnly { os: OsFamily },
    /// The logging-support library is unavailable.
    MissingLoggingSupport(AbsentReason),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WindowsOnly { os } => write!(f, "windows only (building for {os})"),
            SkipReason::MissingLoggingSupport(reason) => {
                write!(f, "logging support unavailable: {reason}")
            }
        }
    }
}

/// A target that will not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTarget {
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of target selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub active: Vec<BuildTarget>,
    pub skipped: Vec<SkippedTarget>,
}

/// Everything needed to link one target, computed without running any tool.
#[derive(Debug, Clone)]
pub struct PlannedTarget {
    pub target: BuildTarget,
    pub plan: LinkPlan,
    pub output_path: PathBuf,
    pub kind: LinkOutput,
}

/// Pick the targets to build on `profile`.
///
/// Console targets are always built; every other subsystem only on Windows.
/// Targets needing logging support are built only when it is available, as
/// a copy carrying the dependency's include and import-library directories.
pub fn select_targets(
    catalog: &[BuildTarget],
    profile: &PlatformProfile,
    logging_support: &Availability,
) -> Selection {
    let mut active = Vec::new();
    let mut skipped = Vec::new();

    for target in catalog {
        if target.subsystem.windows_only() && profile.os != OsFamily::Windows {
            skipped.push(SkippedTarget {
                name: target.name.clone(),
                reason: SkipReason::WindowsOnly { os: profile.os },
            });
            continue;
        }
        if !target.requires_logging_support() {
            active.push(target.clone());
            continue;
        }
        match logging_support {
            Availability::Available(dep) => active.push(target.with_dependency(dep)),
            Availability::Absent(reason) => skipped.push(SkippedTarget {
                name: target.name.clone(),
                reason: SkipReason::MissingLoggingSupport(reason.clone()),
            }),
        }
    }

    Selection { active, skipped }
}

/// Compute the link plan and output path of `target`.
pub fn plan_target(
    target: &BuildTarget,
    profile: &PlatformProfile,
    placement: &Placement,
) -> Result<PlannedTarget> {
    let plan = compute_link_plan(target, profile)?;
    let default_path = default_module_path(target, profile);
    let output_path = derive_output_path(&default_path, target, profile, placement)?;
    let kind = if target.subsystem.is_executable() {
        LinkOutput::Executable
    } else {
        LinkOutput::Module
    };
    Ok(PlannedTarget {
        target: target.clone(),
        plan,
        output_path,
        kind,
    })
}

/// Sources compiled for `target`, including the manifest resource where needed.
pub fn compile_sources(config: &BuildConfig, target: &BuildTarget) -> Vec<PathBuf> {
    let mut sources = target.sources.clone();
    let profile = &config.profile;
    if profile.os == OsFamily::Windows
        && profile.compiler == CompilerFamily::Mingw
        && target.subsystem.is_executable()
    {
        sources.push(config.manifest_resource.clone());
    }
    sources
}

/// Header search path for `target`: its own directories, then the runtime's headers.
pub fn compile_include_dirs(target: &BuildTarget, profile: &PlatformProfile) -> Vec<PathBuf> {
    let mut dirs = target.include_dirs.clone();
    if let Some(dir) = &profile.config.include_dir {
        if !dirs.contains(dir) {
            dirs.push(dir.clone());
        }
    }
    dirs
}

/// Whether the logging-support resolver has to run for this build.
fn needs_logging_support(config: &BuildConfig) -> bool {
    config.profile.os == OsFamily::Windows
        && config.targets.iter().any(BuildTarget::requires_logging_support)
}

/// Run the full build.
pub fn build(
    config: &BuildConfig,
    toolchain: &dyn Toolchain,
    tools: &dyn DependencyTools,
) -> Result<BuildReport> {
    let start = Instant::now();
    let profile = &config.profile;

    // Init
    for target in &config.targets {
        target.validate()?;
    }
    let logging_support = needs_logging_support(config)
        .then(|| resolve_logging_support(&config.logging_support, profile, tools));

    // SelectTargets
    let absent = Availability::Absent(AbsentReason::Disabled);
    let selection = select_targets(
        &config.targets,
        profile,
        logging_support.as_ref().unwrap_or(&absent),
    );

    let mut built = Vec::with_capacity(selection.active.len());
    for target in &selection.active {
        let planned = plan_target(target, profile, &config.placement)?;

        // Compile
        let sources = compile_sources(config, target);
        let include_dirs = compile_include_dirs(target, profile);
        let objects = toolchain.compile(&CompileRequest {
            target_name: &target.name,
            sources: &sources,
            include_dirs: &include_dirs,
            output_dir: &config.build_temp,
            debug: config.debug,
        })?;

        // Link
        if let Some(parent) = planned.output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        toolchain.link(&LinkRequest {
            target_name: &target.name,
            objects: &objects,
            output: &planned.output_path,
            kind: planned.kind,
            plan: &planned.plan,
            debug: config.debug,
        })?;

        // Place: the linker already wrote to the final path.
        built.push(BuiltArtifact {
            target: target.name.clone(),
            subsystem: target.subsystem,
            path: planned.output_path,
            plan: planned.plan,
        });
    }

    Ok(BuildReport {
        profile: profile.name.clone(),
        duration_ms: start.elapsed().as_millis() as u64,
        logging_support,
        built,
        skipped: selection.skipped,
    })
}
