//! Discovering which hooks a charm registers.
//!
//! Registration logic is observed, never acted upon: no hook body runs.
//! [`BinaryIntrospector`] executes the host build of the generated entry
//! point with [`LIST_HOOKS_ARG`]; [`RegistrationIntrospector`] drives an
//! in-process registration function against a [`HookRecorder`].

use std::sync::Arc;

use async_trait::async_trait;
use gocharm_core::{CharmDir, HookRecorder, HookRegistry, HookSet};

use crate::builder::{BuildOutput, LIST_HOOKS_ARG};
use crate::env::BuildEnv;
use crate::error::IntrospectError;
use crate::runner::{CommandRunner, Invocation};

/// Recovers the hook set of a freshly built charm.
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn discover(
        &self,
        charm: &CharmDir,
        build: &BuildOutput,
    ) -> Result<HookSet, IntrospectError>;
}

/// Runs the introspection binary and parses its hook listing.
pub struct BinaryIntrospector {
    runner: Arc<dyn CommandRunner>,
    base_env: BuildEnv,
    timeout_secs: u64,
}

impl BinaryIntrospector {
    pub fn new(runner: Arc<dyn CommandRunner>, base_env: BuildEnv, timeout_secs: u64) -> Self {
        Self {
            runner,
            base_env,
            timeout_secs,
        }
    }
}

#[async_trait]
impl Introspector for BinaryIntrospector {
    async fn discover(
        &self,
        charm: &CharmDir,
        build: &BuildOutput,
    ) -> Result<HookSet, IntrospectError> {
        let env = BuildEnv::for_charm(&self.base_env, charm.path(), None);
        let invocation = Invocation::new(build.introspection_binary().to_string_lossy(), env)
            .arg(LIST_HOOKS_ARG)
            .current_dir(charm.path())
            .timeout_secs(self.timeout_secs);

        let output = self.runner.run(&invocation).await?;
        if !output.passed() {
            return Err(IntrospectError::Exited {
                exit_code: output.exit_code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let listing = std::str::from_utf8(&output.stdout).map_err(|_| IntrospectError::NonUtf8)?;
        Ok(HookSet::from_listing(listing)?)
    }
}

/// Calls a registration function directly with a recording registry.
pub struct RegistrationIntrospector<F> {
    register: F,
}

impl<F> RegistrationIntrospector<F>
where
    F: Fn(&CharmDir, &mut dyn HookRegistry) + Send + Sync,
{
    pub fn new(register: F) -> Self {
        Self { register }
    }

    /// Run registration for `charm` and collect the recorded hooks.
    pub fn record(&self, charm: &CharmDir) -> Result<HookSet, IntrospectError> {
        let mut recorder = HookRecorder::new();
        (self.register)(charm, &mut recorder);
        Ok(recorder.into_hook_set()?)
    }
}

#[async_trait]
impl<F> Introspector for RegistrationIntrospector<F>
where
    F: Fn(&CharmDir, &mut dyn HookRegistry) + Send + Sync,
{
    async fn discover(
        &self,
        charm: &CharmDir,
        _build: &BuildOutput,
    ) -> Result<HookSet, IntrospectError> {
        self.record(charm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gocharm_core::HookError;
    use std::fs;

    fn demo_charm(root: &std::path::Path) -> CharmDir {
        let dir = root.join("precise").join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("metadata.yaml"), "name: demo\n").unwrap();
        CharmDir::read(dir).unwrap()
    }

    #[test]
    fn test_registration_is_recorded_not_run() {
        let tmp = tempfile::tempdir().unwrap();
        let charm = demo_charm(tmp.path());

        let introspector = RegistrationIntrospector::new(|charm: &CharmDir, r: &mut dyn HookRegistry| {
            assert_eq!(charm.name(), "demo");
            r.register_hook("config-changed");
            r.register_hook("install");
        });

        let hooks = introspector.record(&charm).unwrap();
        assert_eq!(
            hooks.iter().collect::<Vec<_>>(),
            vec!["config-changed", "install", "stop"]
        );
    }

    #[test]
    fn test_invalid_registered_name() {
        let tmp = tempfile::tempdir().unwrap();
        let charm = demo_charm(tmp.path());

        let introspector =
            RegistrationIntrospector::new(|_: &CharmDir, r: &mut dyn HookRegistry| {
                r.register_hook("../../etc/passwd");
            });

        match introspector.record(&charm) {
            Err(IntrospectError::Hook(HookError::InvalidName(name))) => {
                assert_eq!(name, "../../etc/passwd")
            }
            other => panic!("expected invalid hook name, got {other:?}"),
        }
    }
}
