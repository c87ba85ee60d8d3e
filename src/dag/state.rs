// src/dag/state.rs

//! Per-invocation task state.

use crate::engine::TaskOutcome;

/// Per-invocation state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of this invocation, waiting on dependencies.
    Pending,
    /// Handed to the orchestrator for evaluation or execution.
    Running,
    /// Reached a terminal outcome.
    Done(TaskOutcome),
}

/// Public, read-only view of a task's per-invocation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task was not pulled into this invocation.
    NotInRun,
    Pending,
    Running,
    Done(TaskOutcome),
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::Done(outcome)) => TaskRunState::Done(outcome),
        }
    }
}
