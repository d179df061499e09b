//! Error taxonomy for charm discovery and on-disk charm state.

use std::path::PathBuf;

/// Errors that abort the whole run before any charm is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no charm repo directory specified (use --repo or set JUJU_REPOSITORY)")]
    NoRepository,

    #[error("charm repo {0:?} is not a directory")]
    RepositoryNotDirectory(PathBuf),

    #[error("no charms found under {0:?}")]
    NoCharmsFound(PathBuf),

    #[error("no charms match the requested names: {}", .0.join(", "))]
    NoCharmsMatched(Vec<String>),

    #[error("invalid charm search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Errors reading or writing the state of a single charm directory.
#[derive(Debug, thiserror::Error)]
pub enum CharmError {
    #[error("cannot read metadata {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("charm metadata {0:?} has an empty name")]
    EmptyName(PathBuf),

    #[error("invalid revision in {path:?}: {content:?}")]
    InvalidRevision { path: PathBuf, content: String },

    #[error("revision overflow for charm at {0:?}")]
    RevisionOverflow(PathBuf),

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CharmError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CharmError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors produced while reconciling hook stubs.
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("cannot create hooks directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read hook stub {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write hook stub {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hook stub path {0:?} exists but is not a regular file")]
    NotAFile(PathBuf),
}

/// Errors raised when a hook set cannot be established.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HookError {
    #[error("invalid hook name {0:?}")]
    InvalidName(String),
}

/// Result type for charm state operations.
pub type Result<T> = std::result::Result<T, CharmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NoRepository;
        assert!(err.to_string().contains("JUJU_REPOSITORY"));

        let err = ConfigError::NoCharmsFound(PathBuf::from("/srv/charms"));
        assert!(err.to_string().contains("no charms found"));
        assert!(err.to_string().contains("/srv/charms"));
    }

    #[test]
    fn test_no_charms_matched_lists_names() {
        let err = ConfigError::NoCharmsMatched(vec!["mysql".to_string(), "precise/wp".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("mysql, precise/wp"));
    }

    #[test]
    fn test_invalid_revision_error() {
        let err = CharmError::InvalidRevision {
            path: PathBuf::from("charm/revision"),
            content: "seven".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid revision"));
        assert!(msg.contains("seven"));
    }
}
