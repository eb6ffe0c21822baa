//! `freezeboot build`: compile and link the bootstrap executables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use freezeboot_build::{Availability, BuildConfig, LoggingSupportConfig, Placement, SystemToolchain, SystemTools};
use freezeboot_platform::PlatformProfile;

use super::profile::{self, ProfileSource};
use crate::manifest::FreezebootManifest;

/// Command-line switches of `freezeboot build`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildArgs<'a> {
    pub source: ProfileSource<'a>,
    pub inplace: bool,
    pub debug: bool,
    pub no_logging_support: bool,
}

/// Assemble the build configuration from the manifest and switches.
pub fn build_config(
    project_dir: &Path,
    manifest: &FreezebootManifest,
    profile: PlatformProfile,
    args: &BuildArgs<'_>,
) -> BuildConfig {
    let placement = if args.inplace || manifest.build.inplace {
        Placement::InPlace {
            project_root: project_dir.to_path_buf(),
        }
    } else {
        Placement::Staged {
            build_lib: project_dir.join(&manifest.build.build_lib),
        }
    };
    let logging_support = if args.no_logging_support {
        LoggingSupportConfig::disabled()
    } else {
        manifest.logging_support(project_dir)
    };
    BuildConfig {
        targets: manifest.targets(project_dir, &profile),
        profile,
        placement,
        build_temp: project_dir.join(&manifest.build.build_temp),
        manifest_resource: manifest.manifest_resource(project_dir),
        logging_support,
        debug: args.debug || manifest.build.debug,
    }
}

/// Run a full build and print the report.
pub fn run(
    project_dir: &Path,
    manifest: Option<&FreezebootManifest>,
    args: &BuildArgs<'_>,
) -> Result<()> {
    let default_manifest = FreezebootManifest::default();
    let manifest = manifest.unwrap_or(&default_manifest);

    let profile = profile::resolve(project_dir, Some(manifest), &args.source)?;
    if manifest.build.optimize {
        eprintln!("warning: [build] optimize has no effect on bootstrap executables");
    }

    let config = build_config(project_dir, manifest, profile, args);
    let toolchain = SystemToolchain::for_family(config.profile.compiler);
    let interpreter: PathBuf = profile::interpreter(Some(manifest), args.source.interpreter);
    let tools = SystemTools::new(interpreter, config.logging_support.timeout);

    println!(
        "Building {} target(s) for {}",
        config.targets.len(),
        config.profile.name
    );
    let report = freezeboot_build::build(&config, &toolchain, &tools)
        .with_context(|| format!("building bootstrap executables for {}", config.profile.name))?;

    if let Some(Availability::Absent(reason)) = &report.logging_support {
        eprintln!("warning: logging support unavailable ({reason}); skipping the service variant");
    }
    println!();
    print!("{report}");
    Ok(())
}
