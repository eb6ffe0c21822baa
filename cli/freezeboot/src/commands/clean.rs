//! `freezeboot clean`: remove build output.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::manifest::FreezebootManifest;

/// Remove the staging and object directories.
pub fn run(project_dir: &Path, manifest: Option<&FreezebootManifest>) -> Result<()> {
    let default_manifest = FreezebootManifest::default();
    let manifest = manifest.unwrap_or(&default_manifest);

    for dir in [&manifest.build.build_lib, &manifest.build.build_temp] {
        let path = project_dir.join(dir);
        if path.exists() {
            fs::remove_dir_all(&path).with_context(|| format!("removing {}", path.display()))?;
            println!("Removed {}", path.display());
        } else {
            println!("Already clean: {} does not exist", path.display());
        }
    }
    Ok(())
}
