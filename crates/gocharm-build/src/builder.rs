//! Compiling a charm's hooks into a single executable.
//!
//! The builder writes a generated `main` package into the charm's GOPATH,
//! then compiles it twice:
//! - cross-compiled for the deployment target into `bin/runhook`
//! - for the build host into a private temporary directory, so the
//!   result can be executed to list registered hooks
//!
//! Scratch directories created under the charm (`pkg`, `src/_main`) are
//! removed when the build returns, whether it succeeded or not.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gocharm_core::charm::RUNHOOK_BINARY;
use gocharm_core::CharmDir;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::env::{BuildEnv, Target};
use crate::error::BuildError;
use crate::runner::{CommandRunner, Invocation};

/// Argument that makes the generated entry point print registered hooks.
pub const LIST_HOOKS_ARG: &str = "-list-hooks";

/// Go package providing the hook registry and dispatcher.
pub const HOOK_PACKAGE: &str = "launchpad.net/juju-utils/hook";

/// Charm package exporting `RegisterHooks`.
pub const REGISTRATION_PACKAGE: &str = "runhook";

/// Import path of the generated main package, relative to the charm GOPATH.
pub const MAIN_PACKAGE: &str = "_main/runhook";

/// Directories under the charm root that only exist during a build.
pub const SCRATCH_DIRS: [&str; 2] = ["pkg", "src/_main"];

/// Source of the generated entry point.
///
/// Only the package names vary; nothing about the charm is embedded.
pub fn entry_point_source(hook_package: &str, registration_package: &str) -> String {
    format!(
        r#"// This file is automatically generated by gocharm. Do not edit.

package main

import (
	"fmt"
	"os"

	hook "{hook_package}"
	runhook "{registration_package}"
)

func main() {{
	r := hook.NewRegistry()
	runhook.RegisterHooks(r)
	if len(os.Args) == 2 && os.Args[1] == "{LIST_HOOKS_ARG}" {{
		for _, name := range r.RegisteredHooks() {{
			fmt.Println(name)
		}}
		return
	}}
	if err := hook.Main(r); err != nil {{
		fmt.Fprintf(os.Stderr, "runhook: %v\n", err)
		os.Exit(1)
	}}
}}
"#
    )
}

/// Removes the build scratch directories of one charm when dropped.
pub struct BuildScratch {
    dirs: Vec<PathBuf>,
}

impl BuildScratch {
    pub fn acquire(charm_path: &Path) -> Self {
        Self {
            dirs: SCRATCH_DIRS.iter().map(|d| charm_path.join(d)).collect(),
        }
    }
}

impl Drop for BuildScratch {
    fn drop(&mut self) {
        for dir in &self.dirs {
            match fs::remove_dir_all(dir) {
                Ok(()) => debug!(dir = %dir.display(), "removed build scratch"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(dir = %dir.display(), error = %e, "cannot remove build scratch"),
            }
        }
    }
}

/// Binaries produced by a successful build.
///
/// The introspection binary lives in a temporary directory that is
/// deleted when this value is dropped.
#[derive(Debug)]
pub struct BuildOutput {
    binary: PathBuf,
    introspection_binary: PathBuf,
    _local_dir: TempDir,
}

impl BuildOutput {
    /// Cross-compiled binary inside the charm.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Host binary used only to list registered hooks.
    pub fn introspection_binary(&self) -> &Path {
        &self.introspection_binary
    }
}

/// Settings shared by every build in a run.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Go toolchain program.
    pub go: String,

    /// Environment the per-charm environments are derived from.
    pub base_env: BuildEnv,

    pub target: Target,

    /// Per compiler invocation; 0 = no limit.
    pub timeout_secs: u64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            go: "go".to_string(),
            base_env: BuildEnv::inherit(),
            target: Target::linux_amd64(),
            timeout_secs: 0,
        }
    }
}

/// Compiles charm hook binaries.
pub struct Builder {
    runner: Arc<dyn CommandRunner>,
    settings: BuildSettings,
}

impl Builder {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: BuildSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Build both the production and the introspection binary for `charm`.
    pub async fn build(&self, charm: &CharmDir) -> Result<BuildOutput, BuildError> {
        let _scratch = BuildScratch::acquire(charm.path());
        write_entry_point(charm.path())?;

        let binary = charm.binary_path();
        info!(charm = %charm.path().display(), "compiling hooks");
        self.compile(charm, &binary, Some(&self.settings.target)).await?;

        let local_dir = tempfile::Builder::new()
            .prefix("gocharm-introspect")
            .tempdir()
            .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;
        let introspection_binary = local_dir.path().join(RUNHOOK_BINARY);
        self.compile(charm, &introspection_binary, None).await?;

        Ok(BuildOutput {
            binary,
            introspection_binary,
            _local_dir: local_dir,
        })
    }

    async fn compile(
        &self,
        charm: &CharmDir,
        output: &Path,
        target: Option<&Target>,
    ) -> Result<(), BuildError> {
        // A binary left by an earlier run must not pass for this build's output.
        match fs::remove_file(output) {
            Ok(()) => debug!(output = %output.display(), "removed previous binary"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BuildError::io(output, e)),
        }

        let env = BuildEnv::for_charm(&self.settings.base_env, charm.path(), target);
        let invocation = Invocation::new(&self.settings.go, env)
            .arg("build")
            .arg("-o")
            .arg(output.to_string_lossy())
            .arg(MAIN_PACKAGE)
            .current_dir(charm.path())
            .timeout_secs(self.settings.timeout_secs);

        let result = self.runner.run(&invocation).await?;
        if !result.passed() {
            return Err(BuildError::Compiler {
                target: MAIN_PACKAGE.to_string(),
                exit_code: result.exit_code,
                diagnostics: result.combined_output(),
            });
        }
        if !output.is_file() {
            return Err(BuildError::MissingBinary(output.to_path_buf()));
        }
        debug!(output = %output.display(), duration_ms = result.duration_ms, "compiled");
        Ok(())
    }
}

/// Write the generated entry point to `src/_main/runhook/main.go`.
pub fn write_entry_point(charm_path: &Path) -> Result<PathBuf, BuildError> {
    let dir = charm_path.join("src").join(MAIN_PACKAGE);
    fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
    let file = dir.join("main.go");
    fs::write(&file, entry_point_source(HOOK_PACKAGE, REGISTRATION_PACKAGE))
        .map_err(|e| BuildError::io(&file, e))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_point_template() {
        let src = entry_point_source(HOOK_PACKAGE, REGISTRATION_PACKAGE);
        assert!(src.contains("package main"));
        assert!(src.contains("hook \"launchpad.net/juju-utils/hook\""));
        assert!(src.contains("runhook.RegisterHooks(r)"));
        assert!(src.contains("os.Args[1] == \"-list-hooks\""));
        assert!(src.contains("func main() {\n"));
        assert_eq!(src, entry_point_source(HOOK_PACKAGE, REGISTRATION_PACKAGE));
    }

    #[test]
    fn test_write_entry_point() {
        let tmp = tempfile::tempdir().unwrap();
        let file = write_entry_point(tmp.path()).unwrap();
        assert_eq!(file, tmp.path().join("src/_main/runhook/main.go"));
        assert!(fs::read_to_string(file).unwrap().contains("RegisterHooks"));
    }

    #[test]
    fn test_scratch_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("pkg/linux_amd64")).unwrap();
        write_entry_point(tmp.path()).unwrap();
        fs::create_dir_all(tmp.path().join("src/runhook")).unwrap();

        {
            let _scratch = BuildScratch::acquire(tmp.path());
        }

        assert!(!tmp.path().join("pkg").exists());
        assert!(!tmp.path().join("src/_main").exists());
        assert!(tmp.path().join("src/runhook").exists());
    }

    #[test]
    fn test_scratch_drop_tolerates_missing_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        drop(BuildScratch::acquire(tmp.path()));
    }
}
