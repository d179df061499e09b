//! Running a charm's Go tests before it is built.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use gocharm_core::CharmDir;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::builder::BuildSettings;
use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::runner::{CommandRunner, Invocation};

/// Import paths of every package under `<charm>/src`.
///
/// A package is a directory holding at least one `.go` file. Directories
/// whose name starts with `_` or `.`, and `testdata` directories, are
/// ignored the way the Go tool ignores them; this also skips the generated
/// `_main` tree.
pub fn packages_in_dir(charm_path: &Path) -> Result<Vec<String>, BuildError> {
    let src = charm_path.join("src");
    if !src.is_dir() {
        return Ok(Vec::new());
    }

    let mut packages = BTreeSet::new();
    let walker = WalkDir::new(&src).into_iter().filter_entry(|entry| {
        entry.depth() == 0 || {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_dir()
                && (name.starts_with('_') || name.starts_with('.') || name == "testdata"))
        }
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.clone());
            BuildError::io(path, e.into())
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "go") {
            continue;
        }
        let Some(parent) = path.parent() else { continue };
        if let Ok(rel) = parent.strip_prefix(&src) {
            if !rel.as_os_str().is_empty() {
                packages.insert(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(packages.into_iter().collect())
}

/// Runs `go test` over a charm's packages.
pub struct Tester {
    runner: Arc<dyn CommandRunner>,
    settings: BuildSettings,
}

impl Tester {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: BuildSettings) -> Self {
        Self { runner, settings }
    }

    pub async fn test(&self, charm: &CharmDir) -> Result<(), BuildError> {
        let packages = packages_in_dir(charm.path())?;
        if packages.is_empty() {
            debug!(charm = %charm.path().display(), "no Go packages to test");
            return Ok(());
        }
        info!(charm = %charm.path().display(), packages = packages.len(), "running tests");

        let env = BuildEnv::for_charm(&self.settings.base_env, charm.path(), None);
        let invocation = Invocation::new(&self.settings.go, env)
            .arg("test")
            .args(packages)
            .current_dir(charm.path())
            .timeout_secs(self.settings.timeout_secs);

        let output = self.runner.run(&invocation).await?;
        if !output.passed() {
            return Err(BuildError::TestsFailed {
                exit_code: output.exit_code,
                diagnostics: output.combined_output(),
            });
        }
        Ok(())
    }
}
