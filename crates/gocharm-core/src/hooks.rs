//! Hook sets and the recording registration capability.
//!
//! Hook discovery never dispatches a hook. Registration logic is handed a
//! [`HookRegistry`] that only records names; the recorded names become a
//! [`HookSet`], which always includes [`STOP_HOOK`].

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::HookError;

/// Hook generated for every charm whether or not it is registered.
pub const STOP_HOOK: &str = "stop";

/// Capability passed to registration logic.
///
/// The deployed dispatcher implements this by binding a handler; discovery
/// implements it with [`HookRecorder`], which binds nothing.
pub trait HookRegistry {
    fn register_hook(&mut self, name: &str);
}

/// A [`HookRegistry`] that remembers registered names and nothing else.
#[derive(Debug, Default, Clone)]
pub struct HookRecorder {
    names: Vec<String>,
}

impl HookRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names in registration order, duplicates included.
    pub fn registered(&self) -> &[String] {
        &self.names
    }

    /// Validate the recorded names and build the hook set.
    pub fn into_hook_set(self) -> Result<HookSet, HookError> {
        HookSet::from_names(self.names)
    }
}

impl HookRegistry for HookRecorder {
    fn register_hook(&mut self, name: &str) {
        self.names.push(name.to_string());
    }
}

/// Sorted, de-duplicated set of hook names, always containing `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HookSet(BTreeSet<String>);

impl HookSet {
    /// Build a hook set from registered names.
    ///
    /// Every name is validated; `stop` is added unconditionally.
    pub fn from_names<I, S>(names: I) -> Result<Self, HookError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.into();
            validate_hook_name(&name)?;
            set.insert(name);
        }
        set.insert(STOP_HOOK.to_string());
        Ok(Self(set))
    }

    /// Parse the output of the `-list-hooks` entry point: one name per line,
    /// blank lines ignored.
    pub fn from_listing(listing: &str) -> Result<Self, HookError> {
        let mut recorder = HookRecorder::new();
        for line in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            recorder.register_hook(line);
        }
        recorder.into_hook_set()
    }

    /// Hook names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Hook names become file names under `hooks/`, so they are restricted to
/// a conservative character set.
pub fn validate_hook_name(name: &str) -> Result<(), HookError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(HookError::InvalidName(name.to_string()))
    }
}
