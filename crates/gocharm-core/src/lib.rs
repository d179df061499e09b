//! gocharm core library
//!
//! The filesystem side of building Go-hooked charms:
//! - discovering charms in a repository and deciding which opt in
//! - the hook set and the recording registry used to discover it
//! - reconciling `hooks/` launcher stubs without clobbering edits
//! - advancing the revision counter and aggregating per-charm outcomes

mod atomic;
pub mod charm;
pub mod classify;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod obs;
pub mod result;
pub mod stubs;
pub mod telemetry;

pub use charm::{read_disk_revision, CharmDir, CharmMeta};
pub use classify::is_go_charm;
pub use discovery::{discover_charms, resolve_repository, REPOSITORY_ENV};
pub use error::{CharmError, ConfigError, HookError, StubError};
pub use hooks::{validate_hook_name, HookRecorder, HookRegistry, HookSet, STOP_HOOK};
pub use obs::charm_span;
pub use result::{CharmFailure, CharmReport, ExitStatus, Outcome, RunResult, Stage};
pub use stubs::{stub_content, StubState, StubSynchronizer, SyncReport};
pub use telemetry::init_tracing;

/// gocharm version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
