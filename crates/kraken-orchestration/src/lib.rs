//! # kraken-orchestration
//!
//! Thin consumer layer above the DSL core: turns a validated
//! [`kraken_dsl::DslConfig`] into an execution plan an executor can run,
//! and defines the seam towards external CI platforms.
//!
//! Nothing here starts a process or opens a socket; the output is ordered
//! work (waves of independent nodes, launch command sequences) and trait
//! definitions for the collaborators that do the actual I/O.

pub mod ci;
pub mod plan;

pub use ci::{CiAdapter, PipelineState, PipelineStatus, StaticStatuses};
pub use plan::{ExecutionPlan, LaunchSequence, LaunchStep};
