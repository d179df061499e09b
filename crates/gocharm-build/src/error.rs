//! Error types for building and introspecting charm hook binaries.

use std::path::PathBuf;

use gocharm_core::HookError;
use thiserror::Error;

/// Failure to run an external command at all.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started.
    #[error("cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish within the configured limit.
    #[error("{program} timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },
}

/// Errors building a charm's hook binary.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The compiler ran and reported failure.
    #[error("failed to build {target} (exit code {exit_code}):\n{diagnostics}")]
    Compiler {
        target: String,
        exit_code: i32,
        diagnostics: String,
    },

    /// The compiler reported success but left no executable behind.
    #[error("expected binary not produced: {0:?}")]
    MissingBinary(PathBuf),

    /// `go test` reported failure.
    #[error("tests failed (exit code {exit_code}):\n{diagnostics}")]
    TestsFailed { exit_code: i32, diagnostics: String },

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors discovering the hooks a charm registers.
#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("hook listing exited with code {exit_code}: {stderr}")]
    Exited { exit_code: i32, stderr: String },

    #[error("hook listing is not valid UTF-8")]
    NonUtf8,

    #[error(transparent)]
    Hook(#[from] HookError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_error_keeps_diagnostics() {
        let err = BuildError::Compiler {
            target: "runhook".to_string(),
            exit_code: 2,
            diagnostics: "main.go:3: undefined: RegisterHooks".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("undefined: RegisterHooks"));
    }

    #[test]
    fn test_missing_binary_message() {
        let err = BuildError::MissingBinary(PathBuf::from("charm/bin/runhook"));
        assert!(err.to_string().starts_with("expected binary not produced"));
    }

    #[test]
    fn test_timeout_message() {
        let err = CommandError::Timeout {
            program: "go".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.to_string(), "go timed out after 30 seconds");
    }
}
