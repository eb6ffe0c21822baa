//! Freezeboot CLI: builds the bootstrap executables of a freezing toolkit.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use commands::build::BuildArgs;
use commands::profile::ProfileSource;
use manifest::FreezebootManifest;

#[derive(Parser)]
#[command(name = "freezeboot", version, about = "Build bootstrap executables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and link every bootstrap variant for the platform
    Build {
        /// Place artifacts next to the sources instead of the staging directory
        #[arg(long)]
        inplace: bool,
        /// Profile file, project profile name, or built-in profile name
        #[arg(long)]
        profile: Option<String>,
        /// Compiler family (native, mingw, msvc)
        #[arg(long)]
        compiler: Option<String>,
        /// Runtime interpreter to probe and to build dependencies with
        #[arg(long)]
        interpreter: Option<PathBuf>,
        /// Compile with debug information
        #[arg(long)]
        debug: bool,
        /// Do not fetch or build the logging-support library
        #[arg(long)]
        no_logging_support: bool,
    },
    /// Show link plans and output names without compiling
    Plan {
        /// Only this target (full dotted name or last component)
        #[arg(long)]
        target: Option<String>,
        /// Profile file, project profile name, or built-in profile name
        #[arg(long)]
        profile: Option<String>,
        /// Compiler family (native, mingw, msvc)
        #[arg(long)]
        compiler: Option<String>,
        /// Runtime interpreter to probe
        #[arg(long)]
        interpreter: Option<PathBuf>,
        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// Inspect and manage platform profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Check compilers, tools and project configuration
    Doctor {
        /// Runtime interpreter to probe
        #[arg(long)]
        interpreter: Option<PathBuf>,
    },
    /// Remove build output
    Clean,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the resolved profile
    Show {
        /// Profile file, project profile name, or built-in profile name
        #[arg(long)]
        profile: Option<String>,
        /// Compiler family (native, mingw, msvc)
        #[arg(long)]
        compiler: Option<String>,
        /// Runtime interpreter to probe
        #[arg(long)]
        interpreter: Option<PathBuf>,
        /// Output format (toml, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// Validate a .profile.toml file
    Validate {
        /// Path to the profile file
        file: PathBuf,
    },
    /// List built-in and project profiles
    List,
    /// Print a starter .profile.toml
    Template {
        /// Profile name
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Build {
            inplace,
            profile,
            compiler,
            interpreter,
            debug,
            no_logging_support,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let args = BuildArgs {
                source: ProfileSource {
                    profile: profile.as_deref(),
                    compiler: compiler.as_deref(),
                    interpreter: interpreter.as_deref(),
                },
                inplace,
                debug,
                no_logging_support,
            };
            commands::build::run(&project_dir, manifest.as_ref(), &args)
        }

        Commands::Plan {
            target,
            profile,
            compiler,
            interpreter,
            format,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let source = ProfileSource {
                profile: profile.as_deref(),
                compiler: compiler.as_deref(),
                interpreter: interpreter.as_deref(),
            };
            commands::plan::run(
                &project_dir,
                manifest.as_ref(),
                &source,
                target.as_deref(),
                format.as_deref(),
            )
        }

        Commands::Profile { action } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or_else(|| cwd.clone());
            match action {
                ProfileAction::Show {
                    profile,
                    compiler,
                    interpreter,
                    format,
                } => {
                    let source = ProfileSource {
                        profile: profile.as_deref(),
                        compiler: compiler.as_deref(),
                        interpreter: interpreter.as_deref(),
                    };
                    commands::profile::show(
                        &project_dir,
                        manifest.as_ref(),
                        &source,
                        format.as_deref(),
                    )
                }
                ProfileAction::Validate { file } => commands::profile::validate(&cwd.join(file)),
                ProfileAction::List => commands::profile::list(&project_dir),
                ProfileAction::Template { name } => commands::profile::template(&name),
            }
        }

        Commands::Doctor { interpreter } => {
            let (_, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::doctor::run(&project_dir, interpreter.as_deref())
        }

        Commands::Clean => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::clean::run(&project_dir, manifest.as_ref())
        }
    }
}

fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<FreezebootManifest>, Option<PathBuf>)> {
    match FreezebootManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
