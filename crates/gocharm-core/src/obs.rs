//! Structured lifecycle events for charm processing.
//!
//! Each helper emits one event with an `event = "..."` field so log
//! pipelines can filter on it. Warnings and failures go out at `warn!` /
//! `error!` level; the rest at `info!` or `debug!`.

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::result::CharmFailure;

/// Span covering the processing of one charm.
///
/// Attach it to the charm's future with `tracing::Instrument` so every
/// event from the pipeline stages carries the charm path.
pub fn charm_span(path: &Path) -> tracing::Span {
    tracing::info_span!("gocharm.charm", charm = %path.display())
}

pub fn emit_charm_started(path: &Path) {
    debug!(event = "charm.started", path = %path.display(), "processing charm");
}

/// Charm without compiled hooks; only visible in verbose mode.
pub fn emit_charm_ignored(path: &Path) {
    debug!(event = "charm.ignored", path = %path.display(), "ignoring non-Go charm");
}

pub fn emit_charm_failed(path: &Path, failure: &CharmFailure) {
    error!(
        event = "charm.failed",
        path = %path.display(),
        stage = %failure.stage,
        error = %failure.message,
        "charm failed"
    );
}

/// Classification could not be decided; the charm is recorded as failed.
pub fn emit_charm_unclassified(path: &Path, error: &dyn std::fmt::Display) {
    warn!(
        event = "charm.unclassified",
        path = %path.display(),
        error = %error,
        "cannot determine if charm is a Go charm"
    );
}

pub fn emit_hooks_discovered(path: &Path, hooks: &str) {
    debug!(event = "charm.hooks_discovered", path = %path.display(), hooks = %hooks);
}

/// A stub differs from the generated content and was left untouched.
pub fn emit_stub_conflict(stub: &Path) {
    warn!(
        event = "stub.conflict",
        path = %stub.display(),
        "hook stub has been modified; not overwriting (remove it to regenerate)"
    );
}

pub fn emit_charm_advanced(identifier: &str, created: usize, conflicts: usize) {
    info!(
        event = "charm.advanced",
        identifier = %identifier,
        stubs_created = created,
        stub_conflicts = conflicts,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charm_span_create() {
        let span = charm_span(Path::new("precise/demo"));
        let _entered = span.enter();
    }
}
