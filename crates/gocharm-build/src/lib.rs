//! gocharm build - compiling and introspecting Go charm hooks
//!
//! Provides the per-charm build pipeline that:
//! - derives an isolated, cross-compiling environment for each charm
//! - compiles the generated hook entry point with the Go toolchain
//! - lists the hooks the charm registers without running any of them
//! - reconciles hook stubs and advances the charm revision

pub mod builder;
pub mod env;
pub mod error;
pub mod introspect;
pub mod pipeline;
pub mod runner;
pub mod tester;

// Re-export key types
pub use builder::{entry_point_source, BuildOutput, BuildScratch, BuildSettings, Builder};
pub use env::{BuildEnv, Target};
pub use error::{BuildError, CommandError, IntrospectError};
pub use introspect::{BinaryIntrospector, Introspector, RegistrationIntrospector};
pub use pipeline::{CharmPipeline, PipelineConfig};
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use tester::{packages_in_dir, Tester};
