//! Compiler and linker invocation.
//!
//! [`Toolchain`] is the seam between the orchestrator and the external C
//! toolchain. [`SystemToolchain`] renders each request to a [`ToolCommand`]
//! and runs it, blocking until the process exits.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use freezeboot_platform::CompilerFamily;

use crate::error::{BuildError, Result};
use crate::link_policy::LinkPlan;

/// Sources to compile for one target.
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    pub target_name: &'a str,
    pub sources: &'a [PathBuf],
    pub include_dirs: &'a [PathBuf],
    /// Directory receiving object files.
    pub output_dir: &'a Path,
    pub debug: bool,
}

/// What the linker produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutput {
    /// A standalone executable.
    Executable,
    /// A loadable module (shared library).
    Module,
}

/// Objects and link parameters for one target.
#[derive(Debug, Clone)]
pub struct LinkRequest<'a> {
    pub target_name: &'a str,
    pub objects: &'a [PathBuf],
    pub output: &'a Path,
    pub kind: LinkOutput,
    pub plan: &'a LinkPlan,
    pub debug: bool,
}

/// An external C toolchain.
pub trait Toolchain {
    /// Compile every source; returns the object files in source order.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<PathBuf>>;

    /// Link objects into `request.output`.
    fn link(&self, request: &LinkRequest<'_>) -> Result<()>;
}

/// A fully rendered process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Environment overrides for this process only.
    pub env: BTreeMap<String, String>,
}

impl ToolCommand {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    fn path_arg(&mut self, prefix: &str, path: &Path) -> &mut Self {
        self.arg(format!("{prefix}{}", path.to_string_lossy()))
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        cmd
    }

    /// Run to completion; non-zero exit yields the tool's diagnostics.
    fn run(&self) -> Result<std::result::Result<(), String>> {
        let output = self.to_command().output().map_err(|source| match source.kind() {
            ErrorKind::NotFound => BuildError::ToolNotFound {
                tool: self.program.clone(),
                source,
            },
            _ => BuildError::Io {
                path: PathBuf::from(&self.program),
                source,
            },
        })?;
        if output.status.success() {
            return Ok(Ok(()));
        }
        // MSVC writes diagnostics to stdout.
        let mut message = String::from_utf8_lossy(&output.stderr).into_owned();
        message.push_str(&String::from_utf8_lossy(&output.stdout));
        if message.trim().is_empty() {
            message = format!("{} exited with {}", self.program, output.status);
        }
        Ok(Err(message))
    }
}

/// The C toolchain found on `PATH` for a compiler family.
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    pub family: CompilerFamily,
    /// Compiler driver (`cc`, `gcc`, `cl`).
    pub compiler: String,
    /// Linker (`cc`, `gcc`, `link`).
    pub linker: String,
    /// Resource compiler for `.rc` sources (`windres`, `rc`).
    pub resource_compiler: String,
}

impl SystemToolchain {
    pub fn for_family(family: CompilerFamily) -> Self {
        let (compiler, linker, resource_compiler) = match family {
            CompilerFamily::Native => ("cc", "cc", "windres"),
            CompilerFamily::Mingw => ("gcc", "gcc", "windres"),
            CompilerFamily::Msvc => ("cl.exe", "link.exe", "rc.exe"),
        };
        Self {
            family,
            compiler: compiler.into(),
            linker: linker.into(),
            resource_compiler: resource_compiler.into(),
        }
    }

    fn object_extension(&self, source: &Path) -> &'static str {
        let is_resource = source.extension().is_some_and(|e| e == "rc");
        match (self.family, is_resource) {
            (CompilerFamily::Msvc, true) => "res",
            (CompilerFamily::Msvc, false) => "obj",
            (_, _) => "o",
        }
    }

    /// Object path for `source` under `output_dir`, mirroring the source path.
    ///
    /// Roots and drive prefixes are dropped. Parent components are rejected:
    /// dropping them would let two sources share one object file.
    pub fn object_path(&self, output_dir: &Path, source: &Path) -> Result<PathBuf> {
        let mut relative = PathBuf::new();
        for component in source.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::ParentDir => {
                    return Err(BuildError::UnmappableSource {
                        path: source.to_path_buf(),
                    })
                }
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            }
        }
        Ok(output_dir
            .join(relative)
            .with_extension(self.object_extension(source)))
    }

    /// Render the command compiling one source file.
    pub fn compile_command(
        &self,
        source: &Path,
        object: &Path,
        include_dirs: &[PathBuf],
        debug: bool,
    ) -> ToolCommand {
        let is_resource = source.extension().is_some_and(|e| e == "rc");
        if is_resource {
            return self.resource_command(source, object, include_dirs);
        }

        match self.family {
            CompilerFamily::Native | CompilerFamily::Mingw => {
                let mut cmd = ToolCommand::new(&self.compiler);
                cmd.arg("-c").path_arg("", source).arg("-o").path_arg("", object);
                for dir in include_dirs {
                    cmd.path_arg("-I", dir);
                }
                if self.family == CompilerFamily::Native {
                    cmd.arg("-fPIC");
                }
                cmd.arg(if debug { "-g" } else { "-O2" });
                cmd
            }
            CompilerFamily::Msvc => {
                let mut cmd = ToolCommand::new(&self.compiler);
                cmd.arg("/c").arg("/nologo").arg("/W3");
                if debug {
                    cmd.arg("/Od").arg("/MDd").arg("/Zi").arg("/D_DEBUG");
                } else {
                    cmd.arg("/Ox").arg("/MD").arg("/DNDEBUG");
                }
                for dir in include_dirs {
                    cmd.path_arg("/I", dir);
                }
                cmd.path_arg("/Tc", source).path_arg("/Fo", object);
                cmd
            }
        }
    }

    fn resource_command(&self, source: &Path, object: &Path, include_dirs: &[PathBuf]) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.resource_compiler);
        match self.family {
            CompilerFamily::Msvc => {
                cmd.arg("/nologo");
                for dir in include_dirs {
                    cmd.path_arg("/i", dir);
                }
                cmd.path_arg("/fo", object).path_arg("", source);
            }
            CompilerFamily::Native | CompilerFamily::Mingw => {
                for dir in include_dirs {
                    cmd.path_arg("-I", dir);
                }
                cmd.arg("-i").path_arg("", source).arg("-o").path_arg("", object);
            }
        }
        cmd
    }

    /// Render the link command for `request`.
    pub fn link_command(&self, request: &LinkRequest<'_>) -> ToolCommand {
        let plan = request.plan;
        let mut cmd = ToolCommand::new(&self.linker);
        match self.family {
            CompilerFamily::Native | CompilerFamily::Mingw => {
                if request.kind == LinkOutput::Module {
                    cmd.arg("-shared");
                }
                if request.debug {
                    cmd.arg("-g");
                }
                for object in request.objects {
                    cmd.path_arg("", object);
                }
                cmd.arg("-o").path_arg("", request.output);
                for dir in &plan.library_dirs {
                    cmd.path_arg("-L", dir);
                }
                // MinGW targets PE, which has no rpath.
                if self.family == CompilerFamily::Native {
                    for dir in &plan.runtime_library_dirs {
                        cmd.path_arg("-Wl,-rpath,", dir);
                    }
                }
                for lib in &plan.libraries {
                    cmd.arg(format!("-l{lib}"));
                }
            }
            CompilerFamily::Msvc => {
                cmd.arg("/nologo").arg("/INCREMENTAL:NO");
                if request.kind == LinkOutput::Module {
                    cmd.arg("/DLL");
                }
                if request.debug {
                    cmd.arg("/DEBUG");
                }
                for dir in &plan.library_dirs {
                    cmd.path_arg("/LIBPATH:", dir);
                }
                for lib in &plan.libraries {
                    cmd.arg(format!("{lib}.lib"));
                }
                cmd.path_arg("/OUT:", request.output);
                for object in request.objects {
                    cmd.path_arg("", object);
                }
            }
        }
        for arg in &plan.extra_args {
            cmd.arg(arg.clone());
        }
        cmd.env = plan.env.clone();
        cmd
    }
}

impl Toolchain for SystemToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<PathBuf>> {
        let mut objects = Vec::with_capacity(request.sources.len());
        for source in request.sources {
            let object = self.object_path(request.output_dir, source)?;
            if let Some(parent) = object.parent() {
                std::fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let cmd = self.compile_command(source, &object, request.include_dirs, request.debug);
            cmd.run()?.map_err(|message| BuildError::CompileFailed {
                target: request.target_name.to_string(),
                message,
            })?;
            objects.push(object);
        }
        Ok(objects)
    }

    fn link(&self, request: &LinkRequest<'_>) -> Result<()> {
        self.link_command(request)
            .run()?
            .map_err(|message| BuildError::LinkFailed {
                target: request.target_name.to_string(),
                message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> LinkPlan {
        let mut plan = LinkPlan::default();
        plan.add_library("python3.9");
        plan.add_library_dir("/usr/lib/python3.9/config");
        plan.runtime_library_dirs.push(PathBuf::from("/opt/lib"));
        plan.push_arg("-s");
        plan.env.insert("LD_RUN_PATH".into(), "${ORIGIN}/lib".into());
        plan
    }

    #[test]
    fn object_path_mirrors_source() {
        let tc = SystemToolchain::for_family(CompilerFamily::Native);
        assert_eq!(
            tc.object_path(Path::new("build/temp"), Path::new("source/bases/Console.c"))
                .unwrap(),
            PathBuf::from("build/temp/source/bases/Console.o")
        );
        assert_eq!(
            tc.object_path(Path::new("build/temp"), Path::new("/abs/x.c")).unwrap(),
            PathBuf::from("build/temp/abs/x.o")
        );
        assert_eq!(
            tc.object_path(Path::new("build/temp"), Path::new("./src/y.c")).unwrap(),
            PathBuf::from("build/temp/src/y.o")
        );
        let msvc = SystemToolchain::for_family(CompilerFamily::Msvc);
        assert_eq!(
            msvc.object_path(Path::new("t"), Path::new("source/bases/manifest.rc"))
                .unwrap(),
            PathBuf::from("t/source/bases/manifest.res")
        );
    }

    #[test]
    fn parent_components_are_not_collapsed() {
        let tc = SystemToolchain::for_family(CompilerFamily::Native);
        let inside = tc.object_path(Path::new("build/temp"), Path::new("x/a.c")).unwrap();
        assert_eq!(inside, PathBuf::from("build/temp/x/a.o"));
        assert!(matches!(
            tc.object_path(Path::new("build/temp"), Path::new("../x/a.c")),
            Err(BuildError::UnmappableSource { .. })
        ));
    }

    #[test]
    fn unmappable_source_fails_before_compiling() {
        let mut tc = SystemToolchain::for_family(CompilerFamily::Native);
        tc.compiler = "/nonexistent/cc".into();
        let dir = tempfile::tempdir().unwrap();
        let sources = [PathBuf::from("../shared/a.c")];
        let request = CompileRequest {
            target_name: "x",
            sources: &sources,
            include_dirs: &[],
            output_dir: dir.path(),
            debug: false,
        };
        assert!(matches!(
            tc.compile(&request),
            Err(BuildError::UnmappableSource { .. })
        ));
    }

    #[test]
    fn gnu_compile_command() {
        let tc = SystemToolchain::for_family(CompilerFamily::Native);
        let cmd = tc.compile_command(
            Path::new("Console.c"),
            Path::new("out/Console.o"),
            &[PathBuf::from("inc")],
            false,
        );
        assert_eq!(cmd.program, "cc");
        assert_eq!(
            cmd.args,
            vec!["-c", "Console.c", "-o", "out/Console.o", "-Iinc", "-fPIC", "-O2"]
        );
    }

    #[test]
    fn mingw_resource_goes_through_windres() {
        let tc = SystemToolchain::for_family(CompilerFamily::Mingw);
        let cmd = tc.compile_command(Path::new("manifest.rc"), Path::new("manifest.o"), &[], false);
        assert_eq!(cmd.program, "windres");
        assert_eq!(cmd.args, vec!["-i", "manifest.rc", "-o", "manifest.o"]);
    }

    #[test]
    fn msvc_compile_command() {
        let tc = SystemToolchain::for_family(CompilerFamily::Msvc);
        let cmd = tc.compile_command(Path::new("Console.c"), Path::new("Console.obj"), &[], true);
        assert_eq!(cmd.program, "cl.exe");
        assert!(cmd.args.contains(&"/TcConsole.c".to_string()));
        assert!(cmd.args.contains(&"/FoConsole.obj".to_string()));
        assert!(cmd.args.contains(&"/Zi".to_string()));
    }

    #[test]
    fn gnu_link_command_carries_plan_and_env() {
        let tc = SystemToolchain::for_family(CompilerFamily::Native);
        let plan = plan();
        let objects = [PathBuf::from("Console.o")];
        let request = LinkRequest {
            target_name: "Console",
            objects: &objects,
            output: Path::new("build/lib/Console"),
            kind: LinkOutput::Executable,
            plan: &plan,
            debug: false,
        };
        let cmd = tc.link_command(&request);
        assert_eq!(
            cmd.args,
            vec![
                "Console.o",
                "-o",
                "build/lib/Console",
                "-L/usr/lib/python3.9/config",
                "-Wl,-rpath,/opt/lib",
                "-lpython3.9",
                "-s",
            ]
        );
        assert_eq!(cmd.env.get("LD_RUN_PATH").map(String::as_str), Some("${ORIGIN}/lib"));
    }

    #[test]
    fn module_link_is_shared() {
        let tc = SystemToolchain::for_family(CompilerFamily::Mingw);
        let plan = plan();
        let request = LinkRequest {
            target_name: "util",
            objects: &[],
            output: Path::new("util.pyd"),
            kind: LinkOutput::Module,
            plan: &plan,
            debug: false,
        };
        let cmd = tc.link_command(&request);
        assert_eq!(cmd.args.first().map(String::as_str), Some("-shared"));
        assert!(!cmd.args.iter().any(|a| a.starts_with("-Wl,-rpath")));
    }

    #[test]
    fn msvc_link_command() {
        let tc = SystemToolchain::for_family(CompilerFamily::Msvc);
        let mut plan = LinkPlan::default();
        plan.add_library("user32");
        plan.add_library_dir("C:/deps/lib");
        plan.push_arg("/MANIFEST");
        let objects = [PathBuf::from("Win32GUI.obj")];
        let request = LinkRequest {
            target_name: "Win32GUI",
            objects: &objects,
            output: Path::new("Win32GUI.exe"),
            kind: LinkOutput::Executable,
            plan: &plan,
            debug: false,
        };
        let cmd = tc.link_command(&request);
        assert_eq!(
            cmd.args,
            vec![
                "/nologo",
                "/INCREMENTAL:NO",
                "/LIBPATH:C:/deps/lib",
                "user32.lib",
                "/OUT:Win32GUI.exe",
                "Win32GUI.obj",
                "/MANIFEST",
            ]
        );
        assert!(cmd.env.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn missing_compiler_is_reported() {
        let mut tc = SystemToolchain::for_family(CompilerFamily::Native);
        tc.compiler = "/nonexistent/cc".into();
        let dir = tempfile::tempdir().unwrap();
        let sources = [PathBuf::from("x.c")];
        let request = CompileRequest {
            target_name: "x",
            sources: &sources,
            include_dirs: &[],
            output_dir: dir.path(),
            debug: false,
        };
        assert!(matches!(
            tc.compile(&request),
            Err(BuildError::ToolNotFound { .. })
        ));
    }
}
