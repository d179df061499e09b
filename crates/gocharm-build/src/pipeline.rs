//! Per-run orchestration of every charm in a repository.
//!
//! Charms are processed one at a time. For each charm:
//! read metadata → classify → (test) → build → introspect → sync stubs →
//! advance revision. A failure in any stage is recorded against that
//! charm and the run moves on; only configuration errors stop the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gocharm_core::obs::{
    emit_charm_advanced, emit_charm_failed, emit_charm_ignored, emit_charm_started,
    emit_charm_unclassified, emit_hooks_discovered, emit_stub_conflict,
};
use gocharm_core::{
    charm_span, is_go_charm, CharmDir, CharmFailure, ConfigError, Outcome, RunResult, Stage,
    StubSynchronizer,
};
use serde::{Deserialize, Serialize};
use tracing::{info, Instrument};

use crate::builder::{BuildSettings, Builder};
use crate::env::{BuildEnv, Target};
use crate::introspect::{BinaryIntrospector, Introspector};
use crate::runner::CommandRunner;
use crate::tester::Tester;

/// Run-wide options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Go toolchain program.
    pub go: String,

    /// Run `go test` before building each charm.
    pub run_tests: bool,

    /// Per external command; 0 = no limit.
    pub timeout_secs: u64,

    /// Restrict the run to charms named `name` or `series/name`.
    pub filters: Vec<String>,

    pub target: Target,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            go: "go".to_string(),
            run_tests: false,
            timeout_secs: 0,
            filters: Vec::new(),
            target: Target::linux_amd64(),
        }
    }
}

/// Builds every selected charm and collects their outcomes.
pub struct CharmPipeline {
    config: PipelineConfig,
    builder: Builder,
    tester: Tester,
    introspector: Arc<dyn Introspector>,
}

impl CharmPipeline {
    /// Pipeline deriving child environments from the current process.
    pub fn new(config: PipelineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_base_env(config, runner, BuildEnv::inherit())
    }

    pub fn with_base_env(
        config: PipelineConfig,
        runner: Arc<dyn CommandRunner>,
        base_env: BuildEnv,
    ) -> Self {
        let settings = BuildSettings {
            go: config.go.clone(),
            base_env: base_env.clone(),
            target: config.target.clone(),
            timeout_secs: config.timeout_secs,
        };
        let introspector = Arc::new(BinaryIntrospector::new(
            runner.clone(),
            base_env,
            config.timeout_secs,
        ));
        Self {
            builder: Builder::new(runner.clone(), settings.clone()),
            tester: Tester::new(runner, settings),
            introspector,
            config,
        }
    }

    /// Replace the hook introspection strategy.
    pub fn introspector(mut self, introspector: Arc<dyn Introspector>) -> Self {
        self.introspector = introspector;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every charm in `charm_paths`, in order.
    ///
    /// Returns an error only when filters are set and match no charm.
    pub async fn run(&self, charm_paths: &[PathBuf]) -> Result<RunResult, ConfigError> {
        let mut result = RunResult::new();
        let mut selected = Vec::new();

        for path in charm_paths {
            match CharmDir::read(path) {
                Ok(charm) if self.selects(&charm) => selected.push(charm),
                Ok(_) => {}
                Err(e) if self.selects_path(path) => {
                    let failure =
                        CharmFailure::new(Stage::Metadata, format!("cannot read charm: {e}"));
                    emit_charm_failed(path, &failure);
                    result.record(path, Outcome::Failed(failure));
                }
                Err(_) => {}
            }
        }

        if !self.config.filters.is_empty() && selected.is_empty() && result.charms.is_empty() {
            return Err(ConfigError::NoCharmsMatched(self.config.filters.clone()));
        }

        for mut charm in selected {
            let path = charm.path().to_path_buf();
            let outcome = match self.process(&mut charm).instrument(charm_span(&path)).await {
                Ok(outcome) => outcome,
                Err(failure) => {
                    emit_charm_failed(&path, &failure);
                    Outcome::Failed(failure)
                }
            };
            result.record(&path, outcome);
        }

        result.finish();
        info!(
            charms = result.charms.len(),
            advanced = result.advanced().count(),
            skipped = result.skipped_count(),
            failed = result.failed_count(),
            conflicts = result.conflict_count(),
            "run finished"
        );
        Ok(result)
    }

    /// Run the full pipeline for one charm.
    pub async fn process(&self, charm: &mut CharmDir) -> Result<Outcome, CharmFailure> {
        match is_go_charm(charm) {
            Ok(true) => {}
            Ok(false) => {
                emit_charm_ignored(charm.path());
                return Ok(Outcome::Skipped {
                    reason: "not a Go charm".to_string(),
                });
            }
            Err(e) => {
                emit_charm_unclassified(charm.path(), &e);
                return Err(CharmFailure::new(Stage::Classify, e));
            }
        }
        emit_charm_started(charm.path());

        if self.config.run_tests {
            self.tester
                .test(charm)
                .await
                .map_err(|e| CharmFailure::new(Stage::Test, e))?;
        }

        let build = self
            .builder
            .build(charm)
            .await
            .map_err(|e| CharmFailure::new(Stage::Build, e))?;

        let hooks = self
            .introspector
            .discover(charm, &build)
            .await
            .map_err(|e| {
                CharmFailure::new(Stage::Introspect, format!("hooks not discoverable: {e}"))
            })?;
        drop(build);
        emit_hooks_discovered(charm.path(), &hooks.to_string());

        let report = StubSynchronizer::for_charm(charm)
            .sync(&hooks)
            .map_err(|e| CharmFailure::new(Stage::SyncStubs, e))?;
        for conflict in &report.conflicts {
            emit_stub_conflict(conflict);
        }

        let revision = charm.bump_revision().map_err(|e| {
            CharmFailure::new(Stage::Revision, format!("cannot bump revision: {e}"))
        })?;
        let identifier = charm.identifier();
        emit_charm_advanced(&identifier, report.created.len(), report.conflicts.len());

        Ok(Outcome::Advanced {
            identifier,
            revision,
            hooks: hooks.iter().map(str::to_string).collect(),
            created: report.created,
            conflicts: report.conflicts,
        })
    }

    fn selects(&self, charm: &CharmDir) -> bool {
        self.config.filters.is_empty() || self.config.filters.iter().any(|f| charm.matches(f))
    }

    /// Filter match for a charm whose metadata could not be read, using
    /// its directory names instead of its declared name.
    fn selects_path(&self, path: &Path) -> bool {
        if self.config.filters.is_empty() {
            return true;
        }
        let dir = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let series = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        self.config.filters.iter().any(|f| {
            let f = f.trim_end_matches('/');
            match (&series, &dir) {
                (Some(series), Some(dir)) => f == dir || f == format!("{series}/{dir}"),
                (None, Some(dir)) => f == dir,
                _ => false,
            }
        })
    }
}
