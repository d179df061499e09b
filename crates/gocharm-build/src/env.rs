//! Per-charm build environments.
//!
//! A [`BuildEnv`] is a name → value map handed verbatim to a child process
//! (the child does not inherit anything else). Setting a variable replaces
//! any previous value of the same name.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GOPATH: &str = "GOPATH";
pub const GO111MODULE: &str = "GO111MODULE";
pub const CGO_ENABLED: &str = "CGO_ENABLED";
pub const GOOS: &str = "GOOS";
pub const GOARCH: &str = "GOARCH";

/// Operating system / architecture pair for cross-compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub os: String,
    pub arch: String,
}

impl Target {
    /// The platform charm units run on.
    pub fn linux_amd64() -> Self {
        Self {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::linux_amd64()
    }
}

/// Environment variables for one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are dropped.
    pub fn inherit() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    debug!(name = ?key, "skipping non-unicode environment variable");
                    None
                }
            }
        }))
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new();
        for (key, value) in vars {
            env.set(key, value);
        }
        env
    }

    /// Set `key`, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Environment for compiling the charm rooted at `charm_path`.
    ///
    /// Starts from `base`, puts the charm first on `GOPATH` (keeping the
    /// inherited `GOPATH` as a fallback) and forces GOPATH package
    /// resolution. With a `target`, cgo is disabled and `GOOS`/`GOARCH`
    /// are set.
    pub fn for_charm(base: &BuildEnv, charm_path: &Path, target: Option<&Target>) -> Self {
        let mut env = base.clone();

        let charm = charm_path.to_string_lossy();
        let gopath = match base.get(GOPATH) {
            Some(inherited) if !inherited.is_empty() => format!("{charm}:{inherited}"),
            _ => charm.into_owned(),
        };
        env.set(GOPATH, gopath);
        env.set(GO111MODULE, "off");

        if let Some(target) = target {
            env.set(CGO_ENABLED, "0");
            env.set(GOOS, target.os.as_str());
            env.set(GOARCH, target.arch.as_str());
        }
        env
    }
}
