//! `freezeboot plan`: show link plans and output names without compiling.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;

use freezeboot_build::{
    plan_target, select_targets, Availability, ExternalDependency, LinkPlan, SkippedTarget,
    SubsystemKind,
};

use super::build::{build_config, BuildArgs};
use super::profile::{self, ProfileSource};
use crate::manifest::FreezebootManifest;

/// One planned target, as printed.
#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub target: String,
    pub subsystem: SubsystemKind,
    pub output: PathBuf,
    pub plan: LinkPlan,
}

/// Plans of every selected target.
#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub profile: String,
    pub targets: Vec<PlanEntry>,
    pub skipped: Vec<String>,
}

/// Compute plans for the selected targets, optionally narrowed to one.
///
/// The logging-support library is assumed available at its configured
/// location so the service variant is planned too.
pub fn compute(
    project_dir: &Path,
    manifest: Option<&FreezebootManifest>,
    source: &ProfileSource<'_>,
    target: Option<&str>,
) -> Result<PlanOutput> {
    let default_manifest = FreezebootManifest::default();
    let manifest = manifest.unwrap_or(&default_manifest);
    let profile = profile::resolve(project_dir, Some(manifest), source)?;

    let args = BuildArgs {
        source: *source,
        ..BuildArgs::default()
    };
    let config = build_config(project_dir, manifest, profile, &args);
    let assumed = Availability::Available(ExternalDependency {
        include_dir: config.logging_support.include_dir(),
        import_library_dir: config.logging_support.import_library_dir(&config.profile),
    });
    let selection = select_targets(&config.targets, &config.profile, &assumed);

    let wanted = |name: &str| match target {
        Some(t) => name == t || name.rsplit('.').next() == Some(t),
        None => true,
    };

    let mut entries = Vec::new();
    for t in selection.active.iter().filter(|t| wanted(&t.name)) {
        let planned = plan_target(t, &config.profile, &config.placement)?;
        entries.push(PlanEntry {
            target: planned.target.name,
            subsystem: planned.target.subsystem,
            output: planned.output_path,
            plan: planned.plan,
        });
    }
    let skipped: Vec<&SkippedTarget> = selection
        .skipped
        .iter()
        .filter(|s| wanted(&s.name))
        .collect();

    if let Some(t) = target {
        if entries.is_empty() && skipped.is_empty() {
            bail!("unknown target: '{t}'");
        }
    }

    Ok(PlanOutput {
        profile: config.profile.name.clone(),
        targets: entries,
        skipped: skipped
            .iter()
            .map(|s| format!("{}: {}", s.name, s.reason))
            .collect(),
    })
}

/// Print plans as text or JSON.
pub fn run(
    project_dir: &Path,
    manifest: Option<&FreezebootManifest>,
    source: &ProfileSource<'_>,
    target: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    let output = compute(project_dir, manifest, source, target)?;
    match format.unwrap_or("text") {
        "text" => print_text(&output),
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        other => bail!("unknown format: '{other}' (expected text or json)"),
    }
    Ok(())
}

fn print_text(output: &PlanOutput) {
    println!("=== Link Plans: {} ===", output.profile);
    for entry in &output.targets {
        println!();
        println!("--- {} ({}) ---", entry.target, entry.subsystem);
        println!("  Output:       {}", entry.output.display());
        println!("  Libraries:    {}", entry.plan.libraries.join(" "));
        for dir in &entry.plan.library_dirs {
            println!("  Library dir:  {}", dir.display());
        }
        for dir in &entry.plan.runtime_library_dirs {
            println!("  Runtime dir:  {}", dir.display());
        }
        println!("  Extra args:   {}", entry.plan.extra_args.join(" "));
        for (key, value) in &entry.plan.env {
            println!("  Env:          {key}={value}");
        }
    }
    if !output.skipped.is_empty() {
        println!();
        println!("--- Skipped ---");
        for skipped in &output.skipped {
            println!("  {skipped}");
        }
    }
}
