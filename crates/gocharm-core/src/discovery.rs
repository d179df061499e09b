//! Charm discovery inside a repository.
//!
//! A charm is any directory exactly two levels below the repository root
//! that contains a `metadata.yaml` (`<repo>/<series>/<name>/metadata.yaml`).

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::charm::METADATA_FILE;
use crate::error::ConfigError;

/// Environment variable naming the default charm repository.
pub const REPOSITORY_ENV: &str = "JUJU_REPOSITORY";

/// Resolve the repository root from an explicit option, falling back to
/// the value of [`REPOSITORY_ENV`] as supplied by the caller.
///
/// Empty strings count as unset. The returned path is canonical, so charm
/// paths derived from it are absolute.
pub fn resolve_repository(
    explicit: Option<&Path>,
    from_env: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let root = match explicit {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => match from_env {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => return Err(ConfigError::NoRepository),
        },
    };
    if !root.is_dir() {
        return Err(ConfigError::RepositoryNotDirectory(root));
    }
    root.canonicalize()
        .map_err(|_| ConfigError::RepositoryNotDirectory(root))
}

/// Find candidate charm directories under `root`.
///
/// The result is sorted so output order is stable for a given tree.
/// Zero candidates is a configuration error.
pub fn discover_charms(root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{escaped}/*/*/{METADATA_FILE}");

    let mut dirs: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => path.parent().map(Path::to_path_buf),
            Err(e) => {
                debug!(error = %e, "skipping unreadable path during discovery");
                None
            }
        })
        .collect();
    dirs.sort();
    dirs.dedup();

    if dirs.is_empty() {
        return Err(ConfigError::NoCharmsFound(root.to_path_buf()));
    }
    debug!(root = %root.display(), count = dirs.len(), "discovered charms");
    Ok(dirs)
}
