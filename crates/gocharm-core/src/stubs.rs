//! Reconcile hook launcher stubs with a discovered hook set.
//!
//! For each hook a stub is created if missing, left alone if identical to
//! the generated content, and reported as a conflict if it differs. Stubs
//! are never overwritten, and stubs for hooks that are no longer
//! registered are never deleted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::atomic::write_atomic;
use crate::charm::{CharmDir, BIN_DIR, RUNHOOK_BINARY};
use crate::error::StubError;
use crate::hooks::HookSet;

const STUB_MODE: u32 = 0o755;

/// Generated launcher for `hook`, executing `binary` (relative to the
/// charm directory) with the hook name as its first argument.
pub fn stub_content(hook: &str, binary: &str) -> String {
    format!(
        "#!/bin/sh\n\
         # Generated by gocharm. Local edits are kept; delete this file to regenerate it.\n\
         exec \"$CHARM_DIR/{binary}\" {hook} \"$@\"\n"
    )
}

/// What happened to one stub during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StubState {
    Created,
    Unchanged,
    Conflict,
}

/// Outcome of reconciling every hook of one charm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub conflicts: Vec<PathBuf>,
}

impl SyncReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    fn record(&mut self, path: PathBuf, state: StubState) {
        match state {
            StubState::Created => self.created.push(path),
            StubState::Unchanged => self.unchanged.push(path),
            StubState::Conflict => self.conflicts.push(path),
        }
    }
}

/// Writes stubs into a charm's `hooks/` directory.
pub struct StubSynchronizer {
    hooks_dir: PathBuf,
    binary: String,
}

impl StubSynchronizer {
    /// Synchronizer for `charm`, pointing stubs at `bin/runhook`.
    pub fn for_charm(charm: &CharmDir) -> Self {
        Self::new(charm.hooks_dir(), format!("{BIN_DIR}/{RUNHOOK_BINARY}"))
    }

    pub fn new(hooks_dir: impl Into<PathBuf>, binary: impl Into<String>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
            binary: binary.into(),
        }
    }

    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    /// Reconcile every hook in `hooks`, in sorted order.
    pub fn sync(&self, hooks: &HookSet) -> Result<SyncReport, StubError> {
        fs::create_dir_all(&self.hooks_dir).map_err(|source| StubError::CreateDir {
            path: self.hooks_dir.clone(),
            source,
        })?;

        let mut report = SyncReport::default();
        for hook in hooks.iter() {
            let path = self.hooks_dir.join(hook);
            let state = self.sync_one(&path, &stub_content(hook, &self.binary))?;
            debug!(hook = %hook, path = %path.display(), state = ?state, "hook stub reconciled");
            report.record(path, state);
        }
        Ok(report)
    }

    fn sync_one(&self, path: &Path, wanted: &str) -> Result<StubState, StubError> {
        match fs::symlink_metadata(path) {
            // A symlink is a hand-made replacement for the generated stub.
            Ok(info) if info.file_type().is_symlink() => return Ok(StubState::Conflict),
            Ok(info) if !info.is_file() => return Err(StubError::NotAFile(path.to_path_buf())),
            Ok(_) => {
                let existing = fs::read(path).map_err(|source| StubError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                return Ok(if existing == wanted.as_bytes() {
                    StubState::Unchanged
                } else {
                    StubState::Conflict
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StubError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        write_atomic(path, wanted.as_bytes(), Some(STUB_MODE)).map_err(|source| {
            StubError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(StubState::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, StubSynchronizer) {
        let tmp = tempfile::tempdir().unwrap();
        let sync = StubSynchronizer::new(tmp.path().join("hooks"), "bin/runhook");
        (tmp, sync)
    }

    #[test]
    fn test_stub_content_is_deterministic() {
        let a = stub_content("install", "bin/runhook");
        let b = stub_content("install", "bin/runhook");
        assert_eq!(a, b);
        assert!(a.starts_with("#!/bin/sh\n"));
        assert!(a.contains("exec \"$CHARM_DIR/bin/runhook\" install \"$@\""));
        assert_ne!(a, stub_content("start", "bin/runhook"));
    }

    #[test]
    fn test_creates_missing_stubs() {
        let (_tmp, sync) = setup();
        let hooks = HookSet::from_names(["install"]).unwrap();

        let report = sync.sync(&hooks).unwrap();
        assert_eq!(report.created.len(), 2);
        assert!(report.conflicts.is_empty());

        let stop = fs::read_to_string(sync.hooks_dir().join("stop")).unwrap();
        assert_eq!(stop, stub_content("stop", "bin/runhook"));
    }

    #[test]
    fn test_second_sync_writes_nothing() {
        let (_tmp, sync) = setup();
        let hooks = HookSet::from_names(["install", "start"]).unwrap();
        sync.sync(&hooks).unwrap();

        let report = sync.sync(&hooks).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.unchanged.len(), 3);
    }

    #[test]
    fn test_modified_stub_is_kept_and_flagged() {
        let (_tmp, sync) = setup();
        let hooks = HookSet::from_names(["install"]).unwrap();
        sync.sync(&hooks).unwrap();

        let custom = "#!/bin/sh\necho custom install\n";
        let path = sync.hooks_dir().join("install");
        fs::write(&path, custom).unwrap();

        let report = sync.sync(&hooks).unwrap();
        assert_eq!(report.conflicts, vec![path.clone()]);
        assert!(report.has_conflicts());
        assert_eq!(fs::read_to_string(&path).unwrap(), custom);
    }

    #[test]
    fn test_unregistered_stubs_are_left_alone() {
        let (_tmp, sync) = setup();
        fs::create_dir_all(sync.hooks_dir()).unwrap();
        let stale = sync.hooks_dir().join("upgrade-charm");
        fs::write(&stale, "#!/bin/sh\n").unwrap();

        let hooks = HookSet::from_names(["install"]).unwrap();
        let report = sync.sync(&hooks).unwrap();

        assert!(stale.exists());
        assert!(!report.created.contains(&stale));
        assert!(!report.conflicts.contains(&stale));
    }

    #[test]
    fn test_directory_in_place_of_stub_is_an_error() {
        let (_tmp, sync) = setup();
        fs::create_dir_all(sync.hooks_dir().join("stop")).unwrap();

        let hooks = HookSet::from_names(Vec::<String>::new()).unwrap();
        assert!(matches!(sync.sync(&hooks), Err(StubError::NotAFile(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_created_stubs_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, sync) = setup();
        let hooks = HookSet::from_names(Vec::<String>::new()).unwrap();
        sync.sync(&hooks).unwrap();

        let mode = fs::metadata(sync.hooks_dir().join("stop"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
