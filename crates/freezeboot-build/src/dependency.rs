//! Best-effort resolution of the optional logging-support library.
//!
//! Only the service variant needs this library. Resolution never fails the
//! build: every problem becomes [`Availability::Absent`] with a reason, and
//! the orchestrator drops just the targets that need the library.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use freezeboot_platform::PlatformProfile;

use crate::process::{run_with_deadline, ToolFailure};

/// Canonical remote of the logging-support library.
pub const DEFAULT_REMOTE_URL: &str = "https://github.com/anthony-tuininga/cx_Logging.git";

/// Directory name of the sibling checkout.
pub const CHECKOUT_DIR_NAME: &str = "cx_Logging";

/// Default deadline for each fetch or sub-build process.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Header and import-library locations of a resolved external library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDependency {
    pub include_dir: PathBuf,
    pub import_library_dir: PathBuf,
}

/// Why the logging-support library is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    /// Resolution was switched off.
    Disabled,
    /// The checkout was missing and fetching it failed.
    FetchFailed(ToolFailure),
    /// The fetch reported success but left no checkout behind.
    NoCheckout,
    /// The import library was missing and building it failed.
    BuildFailed(ToolFailure),
    /// The build reported success but left no import library behind.
    NoImportLibrary,
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsentReason::Disabled => f.write_str("disabled"),
            AbsentReason::FetchFailed(failure) => write!(f, "fetch failed: {failure}"),
            AbsentReason::NoCheckout => f.write_str("no checkout after fetch"),
            AbsentReason::BuildFailed(failure) => write!(f, "build failed: {failure}"),
            AbsentReason::NoImportLibrary => f.write_str("no import library after build"),
        }
    }
}

/// Outcome of resolving an optional dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available(ExternalDependency),
    Absent(AbsentReason),
}

impl Availability {
    pub fn dependency(&self) -> Option<&ExternalDependency> {
        match self {
            Availability::Available(dep) => Some(dep),
            Availability::Absent(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.dependency().is_some()
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available(dep) => write!(
                f,
                "available (include {}, import library {})",
                dep.include_dir.display(),
                dep.import_library_dir.display()
            ),
            Availability::Absent(reason) => write!(f, "absent ({reason})"),
        }
    }
}

/// Process operations used during resolution.
pub trait DependencyTools {
    /// Fetch `remote_url` into `destination`.
    fn fetch(&self, remote_url: &str, destination: &Path) -> Result<(), ToolFailure>;

    /// Run the dependency's own build procedure inside `checkout`.
    fn build(&self, checkout: &Path) -> Result<(), ToolFailure>;
}

/// [`DependencyTools`] backed by `git` and the runtime interpreter.
#[derive(Debug, Clone)]
pub struct SystemTools {
    pub git: PathBuf,
    pub interpreter: PathBuf,
    pub timeout: Duration,
}

impl SystemTools {
    pub fn new(interpreter: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            git: PathBuf::from("git"),
            interpreter: interpreter.into(),
            timeout,
        }
    }
}

impl DependencyTools for SystemTools {
    fn fetch(&self, remote_url: &str, destination: &Path) -> Result<(), ToolFailure> {
        let mut cmd = Command::new(&self.git);
        cmd.arg("clone")
            .arg(remote_url)
            .arg(destination)
            .env("GIT_TERMINAL_PROMPT", "0");
        let result = run_with_deadline(&mut cmd, self.timeout);
        // A killed clone leaves a partial checkout that would pass for a real one.
        if matches!(result, Err(ToolFailure::TimedOut { .. })) && destination.exists() {
            let _ = std::fs::remove_dir_all(destination);
        }
        result
    }

    fn build(&self, checkout: &Path) -> Result<(), ToolFailure> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("setup.py").arg("install").current_dir(checkout);
        run_with_deadline(&mut cmd, self.timeout)
    }
}

/// Where to look for, and how to obtain, the logging-support library.
#[derive(Debug, Clone)]
pub struct LoggingSupportConfig {
    pub enabled: bool,
    pub checkout_dir: PathBuf,
    pub remote_url: String,
    pub timeout: Duration,
}

impl LoggingSupportConfig {
    /// Checkout next to the project directory, fetched from the canonical remote.
    pub fn sibling_of(project_root: &Path) -> Self {
        let parent = project_root.parent().unwrap_or(project_root);
        Self {
            enabled: true,
            checkout_dir: parent.join(CHECKOUT_DIR_NAME),
            remote_url: DEFAULT_REMOTE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            checkout_dir: PathBuf::new(),
            remote_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn include_dir(&self) -> PathBuf {
        self.checkout_dir.join("src")
    }

    /// Prebuilt import-library directory for `profile`'s platform and runtime.
    pub fn import_library_dir(&self, profile: &PlatformProfile) -> PathBuf {
        self.checkout_dir
            .join("build")
            .join(profile.import_library_dir_name())
    }
}

/// Locate, fetch or build the logging-support library.
///
/// 1. Use an existing checkout, or fetch one.
/// 2. Use an existing import library for this platform and runtime, or run
///    the dependency's build once. No staleness check is made.
/// 3. Available only when both exist afterwards.
pub fn resolve_logging_support(
    config: &LoggingSupportConfig,
    profile: &PlatformProfile,
    tools: &dyn DependencyTools,
) -> Availability {
    if !config.enabled {
        return Availability::Absent(AbsentReason::Disabled);
    }

    let checkout = &config.checkout_dir;
    if !checkout.is_dir() {
        if let Err(failure) = tools.fetch(&config.remote_url, checkout) {
            return Availability::Absent(AbsentReason::FetchFailed(failure));
        }
        if !checkout.is_dir() {
            return Availability::Absent(AbsentReason::NoCheckout);
        }
    }

    let import_library_dir = config.import_library_dir(profile);
    if !import_library_dir.is_dir() {
        if let Err(failure) = tools.build(checkout) {
            return Availability::Absent(AbsentReason::BuildFailed(failure));
        }
        if !import_library_dir.is_dir() {
            return Availability::Absent(AbsentReason::NoImportLibrary);
        }
    }

    Availability::Available(ExternalDependency {
        include_dir: config.include_dir(),
        import_library_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use freezeboot_platform::{CompilerFamily, RuntimeVersion};

    /// Scripted tools: each step either fails or creates `creates`.
    struct FakeTools {
        fetch_result: Result<(), ToolFailure>,
        build_result: Result<(), ToolFailure>,
        fetch_creates: Option<PathBuf>,
        build_creates: Option<PathBuf>,
        fetches: Cell<usize>,
        builds: Cell<usize>,
    }

    impl FakeTools {
        fn new() -> Self {
            Self {
                fetch_result: Ok(()),
                build_result: Ok(()),
                fetch_creates: None,
                build_creates: None,
                fetches: Cell::new(0),
                builds: Cell::new(0),
            }
        }
    }

    impl DependencyTools for FakeTools {
        fn fetch(&self, _remote_url: &str, _destination: &Path) -> Result<(), ToolFailure> {
            self.fetches.set(self.fetches.get() + 1);
            if let Some(dir) = &self.fetch_creates {
                std::fs::create_dir_all(dir).unwrap();
            }
            self.fetch_result.clone()
        }

        fn build(&self, _checkout: &Path) -> Result<(), ToolFailure> {
            self.builds.set(self.builds.get() + 1);
            if let Some(dir) = &self.build_creates {
                std::fs::create_dir_all(dir).unwrap();
            }
            self.build_result.clone()
        }
    }

    fn failed(program: &str) -> ToolFailure {
        ToolFailure::Failed {
            program: program.into(),
            status: "exit status: 128".into(),
        }
    }

    fn windows() -> PlatformProfile {
        PlatformProfile::windows_amd64(RuntimeVersion::new(3, 9), CompilerFamily::Msvc)
    }

    fn config_in(dir: &Path) -> LoggingSupportConfig {
        LoggingSupportConfig::sibling_of(&dir.join("project"))
    }

    #[test]
    fn sibling_checkout_location() {
        let config = LoggingSupportConfig::sibling_of(Path::new("/work/freezer"));
        assert_eq!(config.checkout_dir, PathBuf::from("/work/cx_Logging"));
        assert_eq!(config.include_dir(), PathBuf::from("/work/cx_Logging/src"));
        assert_eq!(
            config.import_library_dir(&windows()),
            PathBuf::from("/work/cx_Logging/build/implib.win-amd64-3.9")
        );
    }

    #[test]
    fn disabled_touches_nothing() {
        let tools = FakeTools::new();
        let result = resolve_logging_support(&LoggingSupportConfig::disabled(), &windows(), &tools);
        assert_eq!(result, Availability::Absent(AbsentReason::Disabled));
        assert_eq!(tools.fetches.get(), 0);
    }

    #[test]
    fn fetch_failure_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = FakeTools::new();
        tools.fetch_result = Err(failed("git"));
        let result = resolve_logging_support(&config_in(dir.path()), &windows(), &tools);
        assert_eq!(result, Availability::Absent(AbsentReason::FetchFailed(failed("git"))));
        assert_eq!(tools.builds.get(), 0);
    }

    #[test]
    fn fetch_that_leaves_nothing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FakeTools::new();
        let result = resolve_logging_support(&config_in(dir.path()), &windows(), &tools);
        assert_eq!(result, Availability::Absent(AbsentReason::NoCheckout));
    }

    #[test]
    fn checkout_present_build_failing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.checkout_dir).unwrap();

        let mut tools = FakeTools::new();
        tools.build_result = Err(failed("python"));
        let result = resolve_logging_support(&config, &windows(), &tools);
        assert!(matches!(result, Availability::Absent(AbsentReason::BuildFailed(_))));
        assert_eq!(tools.fetches.get(), 0);
        assert_eq!(tools.builds.get(), 1);
    }

    #[test]
    fn build_that_leaves_nothing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.checkout_dir).unwrap();

        let tools = FakeTools::new();
        let result = resolve_logging_support(&config, &windows(), &tools);
        assert_eq!(result, Availability::Absent(AbsentReason::NoImportLibrary));
    }

    #[test]
    fn fetch_then_build_makes_it_available() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut tools = FakeTools::new();
        tools.fetch_creates = Some(config.checkout_dir.clone());
        tools.build_creates = Some(config.import_library_dir(&windows()));

        let result = resolve_logging_support(&config, &windows(), &tools);
        let dep = result.dependency().unwrap();
        assert_eq!(dep.include_dir, config.include_dir());
        assert_eq!(dep.import_library_dir, config.import_library_dir(&windows()));
        assert_eq!((tools.fetches.get(), tools.builds.get()), (1, 1));
    }

    #[test]
    fn prebuilt_library_is_reused_without_processes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(config.import_library_dir(&windows())).unwrap();

        let tools = FakeTools::new();
        let result = resolve_logging_support(&config, &windows(), &tools);
        assert!(result.is_available());
        assert_eq!((tools.fetches.get(), tools.builds.get()), (0, 0));
    }

    #[test]
    fn prebuilt_library_for_another_runtime_triggers_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let other = PlatformProfile::windows_amd64(RuntimeVersion::new(3, 8), CompilerFamily::Msvc);
        std::fs::create_dir_all(config.import_library_dir(&other)).unwrap();

        let mut tools = FakeTools::new();
        tools.build_result = Err(failed("python"));
        let result = resolve_logging_support(&config, &windows(), &tools);
        assert!(!result.is_available());
        assert_eq!(tools.builds.get(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn system_tools_missing_git_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = SystemTools::new("/nonexistent/python", Duration::from_secs(5));
        tools.git = PathBuf::from("/nonexistent/git");
        let result = resolve_logging_support(&config_in(dir.path()), &windows(), &tools);
        assert!(matches!(
            result,
            Availability::Absent(AbsentReason::FetchFailed(ToolFailure::NotFound { .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn timed_out_fetch_leaves_no_partial_checkout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Stands in for a clone that creates its destination and then hangs.
        let git = dir.path().join("slow-git");
        std::fs::write(&git, "#!/bin/sh\nmkdir -p \"$3/src\"\nexec sleep 10\n").unwrap();
        std::fs::set_permissions(&git, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = config_in(dir.path());
        let mut tools = SystemTools::new("/nonexistent/python", Duration::from_millis(500));
        tools.git = git;

        let result = resolve_logging_support(&config, &windows(), &tools);
        assert!(matches!(
            result,
            Availability::Absent(AbsentReason::FetchFailed(ToolFailure::TimedOut { .. }))
        ));
        assert!(!config.checkout_dir.exists());
    }

    #[test]
    fn display_reasons() {
        let absent = Availability::Absent(AbsentReason::FetchFailed(failed("git")));
        assert_eq!(absent.to_string(), "absent (fetch failed: git exited with exit status: 128)");
    }
}
