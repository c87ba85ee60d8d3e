// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`task`] defines task descriptors and their actions.
//! - [`graph`] holds the validated directed acyclic graph of tasks.
//! - [`scheduler`] contains the per-invocation state machine that decides
//!   which tasks are ready, and blocks dependents of failed tasks.
//! - [`state`] defines per-invocation task states.

pub mod graph;
pub mod scheduler;
pub mod state;
pub mod task;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use state::TaskRunState;
pub use task::{NoopAction, Precondition, TaskAction, TaskDescriptor, TaskDescriptorBuilder};
