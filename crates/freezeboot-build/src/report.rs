//! Build report aggregating every stage.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::dependency::Availability;
use crate::link_policy::LinkPlan;
use crate::orchestrator::SkippedTarget;
use crate::target::SubsystemKind;

/// One linked artifact.
#[derive(Debug, Clone)]
pub struct BuiltArtifact {
    pub target: String,
    pub subsystem: SubsystemKind,
    /// Final on-disk path.
    pub path: PathBuf,
    /// Link plan the artifact was linked with.
    pub plan: LinkPlan,
}

/// Summary report of a bootstrap build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Platform profile name.
    pub profile: String,
    /// Total build duration in milliseconds.
    pub duration_ms: u64,
    /// Logging-support resolution, if this build needed it.
    pub logging_support: Option<Availability>,
    pub built: Vec<BuiltArtifact>,
    pub skipped: Vec<SkippedTarget>,
}

impl BuildReport {
    /// Paths of every produced artifact, in build order.
    pub fn artifact_paths(&self) -> impl Iterator<Item = &Path> {
        self.built.iter().map(|a| a.path.as_path())
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Bootstrap Build Report ===")?;
        writeln!(f, "Profile: {}", self.profile)?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;

        if let Some(ref logging) = self.logging_support {
            writeln!(f)?;
            writeln!(f, "--- Logging Support ---")?;
            writeln!(f, "  {logging}")?;
        }

        writeln!(f)?;
        writeln!(f, "--- Built ({}) ---", self.built.len())?;
        for artifact in &self.built {
            writeln!(
                f,
                "  {:<32} {:<15} {}",
                artifact.target,
                artifact.subsystem,
                artifact.path.display()
            )?;
        }

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Skipped ({}) ---", self.skipped.len())?;
            for skipped in &self.skipped {
                writeln!(f, "  {:<32} {}", skipped.name, skipped.reason)?;
            }
        }

        Ok(())
    }
}
