//! gocharm - build Juju charms whose hooks are written in Go
//!
//! Walks a charm repository (`<repo>/<series>/<name>`), and for every charm
//! with a `src/runhook` package:
//!
//! - compiles all hooks into `bin/runhook`
//! - creates a `hooks/<name>` launcher for every registered hook
//! - bumps the charm's `revision`
//!
//! The `series/name-revision` of each charm built is printed on stdout;
//! everything else goes to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gocharm_build::{CharmPipeline, PipelineConfig, ProcessRunner, Target};
use gocharm_core::{
    discover_charms, init_tracing, resolve_repository, ExitStatus, Outcome, RunResult,
};
use tracing::{error, Level};

#[derive(Parser, Debug)]
#[command(name = "gocharm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build Go hooks for the charms in a Juju repository", long_about = None)]
struct Cli {
    /// Charm repository root
    #[arg(long, env = "JUJU_REPOSITORY")]
    repo: Option<PathBuf>,

    /// Go toolchain to invoke
    #[arg(long, env = "GOCHARM_GO", default_value = "go")]
    go: String,

    /// Run `go test` on each charm before building it
    #[arg(long)]
    test: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Seconds before any single Go command is killed (0 = never)
    #[arg(long, default_value_t = 0)]
    build_timeout: u64,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Only build these charms (`name` or `series/name`)
    charms: Vec<String>,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            go: self.go.clone(),
            run_tests: self.test,
            timeout_secs: self.build_timeout,
            filters: self.charms.clone(),
            target: Target::linux_amd64(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let status = match cmd_build(&cli).await {
        Ok(result) => {
            for identifier in built_identifiers(&result) {
                println!("{identifier}");
            }
            match write_report(cli.report.as_deref(), &result) {
                Ok(()) => result.exit_status(),
                Err(e) => {
                    error!("{e:#}");
                    ExitStatus::Fatal
                }
            }
        }
        Err(e) => {
            error!("{e:#}");
            ExitStatus::Fatal
        }
    };
    ExitCode::from(status.code() as u8)
}

/// Discover and build every selected charm in the repository.
async fn cmd_build(cli: &Cli) -> Result<RunResult> {
    let root = resolve_repository(cli.repo.as_deref(), None)?;
    let charms = discover_charms(&root)?;

    let pipeline = CharmPipeline::new(cli.pipeline_config(), Arc::new(ProcessRunner));
    let result = pipeline.run(&charms).await?;
    Ok(result)
}

/// Identifiers of the charms that were built, in processing order.
fn built_identifiers(result: &RunResult) -> Vec<&str> {
    result
        .charms
        .iter()
        .filter_map(|c| match &c.outcome {
            Outcome::Advanced { identifier, .. } => Some(identifier.as_str()),
            _ => None,
        })
        .collect()
}

fn write_report(path: Option<&Path>, result: &RunResult) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = result.to_json().context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gocharm_core::ConfigError;
    use std::fs;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gocharm").chain(args.iter().copied())).unwrap()
    }

    fn plain_charm(root: &Path, series: &str, name: &str) -> PathBuf {
        let dir = root.join(series).join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("metadata.yaml"), format!("name: {name}\n")).unwrap();
        dir
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["--repo", "/srv/charms"]);
        assert_eq!(cli.repo, Some(PathBuf::from("/srv/charms")));
        assert!(!cli.test);
        assert!(cli.charms.is_empty());

        let config = cli.pipeline_config();
        assert!(!config.run_tests);
        assert_eq!(config.timeout_secs, 0);
        assert_eq!(config.target, Target::linux_amd64());
    }

    #[test]
    fn test_cli_flags_map_to_config() {
        let cli = parse(&[
            "--repo",
            "/r",
            "--go",
            "/opt/go/bin/go",
            "--test",
            "--build-timeout",
            "300",
            "-v",
            "precise/mysql",
            "wordpress",
        ]);
        assert!(cli.verbose);

        let config = cli.pipeline_config();
        assert_eq!(config.go, "/opt/go/bin/go");
        assert!(config.run_tests);
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.filters, vec!["precise/mysql", "wordpress"]);
    }

    #[test]
    fn test_cli_rejects_bad_timeout() {
        let parsed = Cli::try_parse_from(["gocharm", "--build-timeout", "soon"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_cmd_build_skips_plain_charms() {
        let tmp = tempfile::tempdir().unwrap();
        let charm = plain_charm(tmp.path(), "precise", "mysql");
        fs::write(charm.join("revision"), "12\n").unwrap();

        let cli = parse(&["--repo", tmp.path().to_str().unwrap()]);
        let result = cmd_build(&cli).await.unwrap();

        assert_eq!(result.charms.len(), 1);
        assert_eq!(result.skipped_count(), 1);
        assert!(built_identifiers(&result).is_empty());
        assert_eq!(result.exit_status(), ExitStatus::Success);
        assert_eq!(fs::read_to_string(charm.join("revision")).unwrap(), "12\n");
    }

    #[tokio::test]
    async fn test_cmd_build_empty_repository_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = parse(&["--repo", tmp.path().to_str().unwrap()]);

        let err = cmd_build(&cli).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoCharmsFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cmd_build_unmatched_filter_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        plain_charm(tmp.path(), "precise", "mysql");
        let cli = parse(&["--repo", tmp.path().to_str().unwrap(), "postgresql"]);

        let err = cmd_build(&cli).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoCharmsMatched(_))
        ));
    }

    #[tokio::test]
    async fn test_write_report() {
        let tmp = tempfile::tempdir().unwrap();
        plain_charm(tmp.path(), "trusty", "haproxy");
        let cli = parse(&["--repo", tmp.path().to_str().unwrap()]);
        let result = cmd_build(&cli).await.unwrap();

        let report = tmp.path().join("report.json");
        write_report(Some(&report), &result).unwrap();
        write_report(None, &result).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["exit_status"], "success");
        assert_eq!(json["charms"][0]["outcome"]["status"], "skipped");
    }
}
