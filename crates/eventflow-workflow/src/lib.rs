//! Eventflow Workflow
//!
//! This crate provides the validated, ready-to-run form of a workflow: a set
//! of step declarations plus the dispatch table derived from them.
//!
//! A step declares the one event kind it accepts and the kinds it may emit.
//! Construction checks that the declarations compose:
//! - at least one step accepts `Start`
//! - every declared non-`Stop` output has a consumer
//! - `Stop` is reachable from `Start`
//! - no reachable step can only feed a loop that never reaches `Stop`
//!
//! Dispatch is a plain lookup from event kind to step indices, built once.

mod error;
mod graph;
mod step;
mod workflow;

pub use error::{GraphError, StepError};
pub use graph::WorkflowGraph;
pub use step::{StepBody, StepDef, StepFuture};
pub use workflow::{Workflow, WorkflowBuilder};
