//! Per-run result aggregate.
//!
//! Every charm contributes exactly one [`CharmReport`]. The process exit
//! status is derived from the finished [`RunResult`] rather than tracked
//! as mutable global state.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pipeline stage in which a charm failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Metadata,
    Classify,
    Test,
    Build,
    Introspect,
    SyncStubs,
    Revision,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Metadata => "metadata",
            Stage::Classify => "classify",
            Stage::Test => "test",
            Stage::Build => "build",
            Stage::Introspect => "introspect",
            Stage::SyncStubs => "sync_stubs",
            Stage::Revision => "revision",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A per-charm failure: the stage and a human-readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{stage}: {message}")]
pub struct CharmFailure {
    pub stage: Stage,
    pub message: String,
}

impl CharmFailure {
    pub fn new(stage: Stage, err: impl fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// Final state of one charm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Built, hooks synchronized and revision advanced.
    Advanced {
        identifier: String,
        revision: u64,
        hooks: Vec<String>,
        created: Vec<PathBuf>,
        conflicts: Vec<PathBuf>,
    },
    /// Not a Go charm; nothing was touched.
    Skipped { reason: String },
    Failed(CharmFailure),
}

/// One charm's entry in the run result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharmReport {
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl CharmReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

/// Process exit status derived from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    /// The run completed but at least one charm failed.
    CharmsFailed,
    /// The run could not start.
    Fatal,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::CharmsFailed => 1,
            ExitStatus::Fatal => 2,
        }
    }
}

/// Aggregate of every charm processed in one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub charms: Vec<CharmReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &Path, outcome: Outcome) {
        self.charms.push(CharmReport {
            path: path.to_path_buf(),
            outcome,
        });
    }

    /// Merge the reports of another (partial) result, e.g. from a worker.
    pub fn merge(&mut self, other: RunResult) {
        self.charms.extend(other.charms);
    }

    /// Stamp the completion time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn advanced(&self) -> impl Iterator<Item = &CharmReport> {
        self.charms
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Advanced { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.charms.iter().filter(|c| c.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.charms
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Skipped { .. }))
            .count()
    }

    pub fn conflict_count(&self) -> usize {
        self.charms
            .iter()
            .map(|c| match &c.outcome {
                Outcome::Advanced { conflicts, .. } => conflicts.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.failed_count() > 0 {
            ExitStatus::CharmsFailed
        } else {
            ExitStatus::Success
        }
    }

    /// Serialize the result as pretty JSON, including the exit status.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Report<'a> {
            exit_status: ExitStatus,
            #[serde(flatten)]
            result: &'a RunResult,
        }
        serde_json::to_string_pretty(&Report {
            exit_status: self.exit_status(),
            result: self,
        })
    }
}
