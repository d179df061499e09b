//! Decide whether a charm opts into compiled Go hooks.

use std::fs;

use crate::charm::CharmDir;
use crate::error::{CharmError, Result};

/// Returns `true` when the charm carries a `src/runhook` directory.
///
/// A missing path, or a path that is not a directory, means the charm does
/// not opt in. Any other filesystem error is reported.
pub fn is_go_charm(charm: &CharmDir) -> Result<bool> {
    let dir = charm.hook_source_dir();
    match fs::metadata(&dir) {
        Ok(info) => Ok(info.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CharmError::io(dir, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charm::METADATA_FILE;
    use std::path::Path;

    fn charm_at(root: &Path) -> CharmDir {
        let dir = root.join("precise").join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(METADATA_FILE), "name: demo\n").unwrap();
        CharmDir::read(dir).unwrap()
    }

    #[test]
    fn test_without_source_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let charm = charm_at(tmp.path());
        assert!(!is_go_charm(&charm).unwrap());
    }

    #[test]
    fn test_with_source_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let charm = charm_at(tmp.path());
        fs::create_dir_all(charm.hook_source_dir()).unwrap();
        assert!(is_go_charm(&charm).unwrap());
    }

    #[test]
    fn test_source_path_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let charm = charm_at(tmp.path());
        fs::create_dir_all(charm.path().join("src")).unwrap();
        fs::write(charm.hook_source_dir(), "not a dir").unwrap();
        assert!(!is_go_charm(&charm).unwrap());
    }
}
