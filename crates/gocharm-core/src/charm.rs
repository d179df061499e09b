//! On-disk charm directories.
//!
//! Layout of a charm inside a repository:
//!
//! ```text
//! <repo>/<series>/<name>/metadata.yaml   charm metadata (marks a charm)
//! <repo>/<series>/<name>/revision        decimal revision counter
//! <repo>/<series>/<name>/src/runhook/    Go hook sources (opt-in marker)
//! <repo>/<series>/<name>/bin/runhook     compiled hook binary
//! <repo>/<series>/<name>/hooks/<hook>    launcher stubs
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic;
use crate::error::{CharmError, Result};

pub const METADATA_FILE: &str = "metadata.yaml";
pub const REVISION_FILE: &str = "revision";
pub const HOOK_SOURCE_DIR: &str = "src/runhook";
pub const HOOKS_DIR: &str = "hooks";
pub const BIN_DIR: &str = "bin";
pub const RUNHOOK_BINARY: &str = "runhook";

/// The subset of `metadata.yaml` gocharm cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharmMeta {
    pub name: String,
}

impl CharmMeta {
    /// Parse charm metadata from YAML text.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let meta: CharmMeta = serde_yaml::from_str(text).map_err(|source| CharmError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
        if meta.name.trim().is_empty() {
            return Err(CharmError::EmptyName(path.to_path_buf()));
        }
        Ok(meta)
    }
}

/// A charm directory read from disk.
#[derive(Debug, Clone)]
pub struct CharmDir {
    path: PathBuf,
    series: String,
    meta: CharmMeta,
    revision: u64,
}

impl CharmDir {
    /// Read the charm rooted at `path`.
    ///
    /// The series is the name of the parent directory. A missing revision
    /// file reads as revision 0.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let meta_path = path.join(METADATA_FILE);
        let text = fs::read_to_string(&meta_path).map_err(|e| CharmError::io(&meta_path, e))?;
        let meta = CharmMeta::parse(&meta_path, &text)?;

        let series = path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let revision = read_disk_revision(&path)?;

        Ok(Self {
            path,
            series,
            meta,
            revision,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn meta(&self) -> &CharmMeta {
        &self.meta
    }

    /// Revision as last read from or written to disk.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Canonical identifier: `series/name-revision`.
    pub fn identifier(&self) -> String {
        format!("{}/{}-{}", self.series, self.meta.name, self.revision)
    }

    /// Directory holding the charm's Go hook registration package.
    pub fn hook_source_dir(&self) -> PathBuf {
        self.path.join(HOOK_SOURCE_DIR)
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.path.join(HOOKS_DIR)
    }

    /// Location of the compiled production hook binary.
    pub fn binary_path(&self) -> PathBuf {
        self.path.join(BIN_DIR).join(RUNHOOK_BINARY)
    }

    /// Whether `filter` names this charm, either as `name` or `series/name`.
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.trim_end_matches('/');
        filter == self.meta.name || filter == format!("{}/{}", self.series, self.meta.name)
    }

    /// Persist `revision` atomically and remember it.
    pub fn set_disk_revision(&mut self, revision: u64) -> Result<()> {
        let path = self.path.join(REVISION_FILE);
        write_atomic(&path, format!("{revision}\n").as_bytes(), None)
            .map_err(|e| CharmError::io(&path, e))?;
        self.revision = revision;
        Ok(())
    }

    /// Read the current on-disk revision, add one and persist it.
    ///
    /// Returns the new revision.
    pub fn bump_revision(&mut self) -> Result<u64> {
        let current = read_disk_revision(&self.path)?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| CharmError::RevisionOverflow(self.path.clone()))?;
        self.set_disk_revision(next)?;
        Ok(next)
    }
}

/// Read the revision counter of the charm at `charm_path`.
pub fn read_disk_revision(charm_path: &Path) -> Result<u64> {
    let path = charm_path.join(REVISION_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CharmError::io(&path, e)),
    };
    content
        .trim()
        .parse::<u64>()
        .map_err(|_| CharmError::InvalidRevision { path, content })
}
