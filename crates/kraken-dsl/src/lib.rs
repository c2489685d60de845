//! # kraken-dsl
//!
//! Declarative model for test/service orchestration.
//!
//! Users describe long-running **services** (containers) and **tests**
//! (assertions executed against those services) as raw declaration maps.
//! This crate turns those maps into validated, typed entities, applies
//! idempotent variable substitution, and assembles a dependency graph that
//! an executor consumes for scheduling.
//!
//! Handles:
//! - **Variable**: `${name}` substitution over nested declaration trees.
//! - **Runner**: per-mode command builders (shell, http, grpc, pytest, docker).
//! - **Expect**: mode-aware expectation descriptors.
//! - **Service / Test**: typed declarations with origin snapshots.
//! - **Config**: graph assembly, validation, and topological ordering.
//!
//! Nothing in this crate executes anything: the output is validated
//! declarations and command strings.

pub mod config;
pub mod expect;
pub mod runner;
pub mod service;
pub mod variable;

pub use config::{DslConfig, EdgeKind, NodeKind, NodeRef};
pub use expect::Expect;
pub use runner::{Runner, RunnerVariant};
pub use service::DslService;
pub use test::DslTest;
pub use variable::{VariableEvaluator, Variables};
