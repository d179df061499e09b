//! External command execution.
//!
//! Every compiler and introspection call goes through [`CommandRunner`] so
//! the pipeline can be driven without a Go toolchain in tests.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::env::BuildEnv;
use crate::error::CommandError;

/// A fully specified external command.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,

    /// The complete child environment; nothing else is inherited.
    pub env: BuildEnv,

    pub cwd: Option<PathBuf>,

    /// 0 = no limit.
    pub timeout_secs: u64,
}

impl Invocation {
    pub fn new(program: impl Into<String>, env: BuildEnv) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env,
            cwd: None,
            timeout_secs: 0,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// `program arg1 arg2 ...`, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, -1 when killed by a signal.
    pub exit_code: i32,

    pub stdout: Vec<u8>,

    pub stderr: Vec<u8>,

    pub duration_ms: u64,

    pub success: bool,
}

impl CommandOutput {
    /// Whether the command exited with code 0.
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// stdout followed by stderr, lossily decoded; used for diagnostics.
    pub fn combined_output(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text.trim_end().to_string()
    }
}

/// Something that can run an [`Invocation`] to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        let start = Instant::now();
        debug!(command = %invocation.display(), "running");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .env_clear()
            .envs(invocation.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let child = command.spawn().map_err(|source| CommandError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let waited = if invocation.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(invocation.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| CommandError::Timeout {
                program: invocation.program.clone(),
                timeout_secs: invocation.timeout_secs,
            })?
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(|source| CommandError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_env() -> BuildEnv {
        BuildEnv::from_vars(std::env::var("PATH").map(|p| ("PATH", p)))
    }

    #[test]
    fn test_command_output_passed() {
        let output = CommandOutput {
            exit_code: 0,
            success: true,
            ..Default::default()
        };
        assert!(output.passed());

        let output = CommandOutput {
            exit_code: 2,
            success: false,
            stderr: b"boom\n".to_vec(),
            ..Default::default()
        };
        assert!(!output.passed());
        assert_eq!(output.combined_output(), "boom");
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("go", BuildEnv::new()).args(["build", "-o", "bin/runhook"]);
        assert_eq!(inv.display(), "go build -o bin/runhook");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_simple_command() {
        let inv = Invocation::new("echo", path_env()).arg("hello");
        let output = ProcessRunner.run(&inv).await.expect("run failed");
        assert!(output.passed());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_environment_is_not_inherited() {
        std::env::set_var("GOCHARM_RUNNER_LEAK_CHECK", "leaked");
        let mut env = path_env();
        env.set("ONLY_THIS", "yes");

        let inv = Invocation::new("sh", env)
            .arg("-c")
            .arg("echo \"$ONLY_THIS:${GOCHARM_RUNNER_LEAK_CHECK:-unset}\"");
        let output = ProcessRunner.run(&inv).await.expect("run failed");
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "yes:unset");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command() {
        let inv = Invocation::new("false", path_env());
        let output = ProcessRunner.run(&inv).await.expect("run failed");
        assert!(!output.passed());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let inv = Invocation::new("gocharm-definitely-not-a-program", BuildEnv::new());
        assert!(matches!(
            ProcessRunner.run(&inv).await,
            Err(CommandError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let inv = Invocation::new("sleep", path_env()).arg("5").timeout_secs(1);
        assert!(matches!(
            ProcessRunner.run(&inv).await,
            Err(CommandError::Timeout { timeout_secs: 1, .. })
        ));
    }
}
