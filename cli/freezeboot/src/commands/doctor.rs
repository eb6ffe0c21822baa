//! `freezeboot doctor`: toolchain and project diagnostics.

use std::path::Path;
use std::process::Command;

use anyhow::Result;

use freezeboot_platform::{probe_runtime, OsFamily};

use super::profile;
use crate::manifest::{FreezebootManifest, MANIFEST_FILE};

/// Print diagnostic information.
pub fn run(project_dir: &Path, interpreter: Option<&Path>) -> Result<()> {
    println!("=== Freezeboot Doctor ===");
    println!();
    println!("Freezeboot version: {}", env!("CARGO_PKG_VERSION"));
    println!("Host OS family:     {}", OsFamily::host());
    println!();

    let loaded = FreezebootManifest::find_and_load(project_dir);
    let manifest = match &loaded {
        Ok(Some((manifest, _))) => Some(manifest),
        _ => None,
    };
    let interpreter = profile::interpreter(manifest, interpreter);

    println!("--- System Tools ---");
    print_tool_status("cc", &["--version"]);
    print_tool_status("gcc", &["--version"]);
    print_tool_status("cl", &[]);
    print_tool_status("git", &["--version"]);
    print_tool_status(&interpreter.to_string_lossy(), &["--version"]);
    println!();

    println!("--- Runtime ---");
    match probe_runtime(&interpreter, None) {
        Ok(probed) => {
            println!("  Profile:        {}", probed.name);
            println!("  Version:        {}{}", probed.runtime_version, probed.abi_flags);
            println!("  Platform tag:   {}", probed.platform_tag);
            println!("  Module suffix:  {}", probed.module_suffix());
            println!("  Runtime lib:    {}", probed.runtime_library());
        }
        Err(e) => println!("  probe failed: {e}"),
    }
    println!();

    println!("--- Project Status ---");
    match &loaded {
        Ok(Some((manifest, dir))) => {
            println!("  {MANIFEST_FILE}: found at {}", dir.display());
            if let Some(name) = &manifest.project.name {
                println!("  Project:   {name}");
            }
            println!("  Package:   {}", manifest.project.package);
            let targets = if manifest.targets.is_empty() {
                "standard catalog".to_string()
            } else {
                format!("{} custom", manifest.targets.len())
            };
            println!("  Targets:   {targets}");

            let logging = manifest.logging_support(dir);
            if logging.enabled {
                let state = if logging.checkout_dir.is_dir() {
                    "present"
                } else {
                    "missing (fetched on first Windows build)"
                };
                println!("  Logging support checkout: {} ({state})", logging.checkout_dir.display());
            } else {
                println!("  Logging support: disabled");
            }
        }
        Ok(None) => println!("  {MANIFEST_FILE}: not found (defaults apply)"),
        Err(e) => println!("  {MANIFEST_FILE}: error: {e:#}"),
    }

    Ok(())
}

fn print_tool_status(name: &str, args: &[&str]) {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            // cl prints its banner on stderr.
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).into_owned()
            };
            let first_line = text.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => {
            println!("  {name}: not found");
        }
    }
}
