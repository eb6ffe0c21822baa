//! Build engine for bootstrap executables.
//!
//! Turns a list of bootstrap targets into linked native executables for one
//! platform profile: target selection, link policy, artifact naming,
//! best-effort resolution of the optional logging-support library, and the
//! compile/link driver.

pub mod dependency;
pub mod error;
pub mod link_policy;
pub mod naming;
pub mod orchestrator;
pub mod process;
pub mod report;
pub mod target;
pub mod toolchain;

pub use dependency::{
    resolve_logging_support, AbsentReason, Availability, DependencyTools, ExternalDependency,
    LoggingSupportConfig, SystemTools,
};
pub use error::{BuildError, Result};
pub use link_policy::{compute_link_plan, link_rule_for, LinkPlan, LinkRule, LINK_RULES};
pub use naming::{default_module_path, derive_output_path, executable_file_name, Placement};
pub use orchestrator::{
    build, compile_include_dirs, plan_target, select_targets, BuildConfig, PlannedTarget, Selection, SkipReason,
    SkippedTarget,
};
pub use process::ToolFailure;
pub use report::{BuildReport, BuiltArtifact};
pub use target::{standard_catalog, BuildTarget, CatalogConfig, SubsystemKind};
pub use toolchain::{CompileRequest, LinkOutput, LinkRequest, SystemToolchain, ToolCommand, Toolchain};
