// src/engine/mod.rs

//! Incremental execution engine.
//!
//! This module ties together:
//! - the per-invocation DAG scheduler
//! - the fingerprint engine and its persisted store
//! - task actions, run concurrently across independent branches
//!
//! The up-to-date check is a pure function in [`decision`]; the async shell
//! that drives a whole invocation lives in [`orchestrator`].

use std::path::PathBuf;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Terminal outcome of a task for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The action ran and succeeded; a new fingerprint was persisted.
    Executed,
    /// Fingerprint matched and outputs were intact; the action did not run.
    UpToDate,
    /// Disabled or its precondition did not hold.
    Skipped,
    /// Evaluation or the action failed.
    Failed,
    /// Not evaluated because an upstream task failed.
    Blocked,
}

impl TaskOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, TaskOutcome::Failed | TaskOutcome::Blocked)
    }

    /// Whether dependents may proceed after this outcome.
    pub fn satisfies_dependents(self) -> bool {
        !self.is_failure()
    }
}

/// Why a task has to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteReason {
    /// No fingerprint was persisted for this task.
    NoHistory,
    /// The task declares no outputs, so it can never be up to date.
    NoOutputsDeclared,
    /// Declared outputs are absent or of the wrong kind.
    OutputsMissing(Vec<PathBuf>),
    /// Upstream tasks whose outputs feed this task's inputs executed in this
    /// invocation.
    UpstreamExecuted(Vec<TaskName>),
    InputsChanged,
    /// Outputs exist but differ from what the last run produced.
    OutputsChanged,
}

pub mod decision;
pub mod orchestrator;
pub mod report;

pub use decision::{Decision, decide};
pub use orchestrator::Orchestrator;
pub use report::BuildReport;
