// src/engine/decision.rs

//! Pure up-to-date check.

use std::path::PathBuf;

use crate::engine::{ExecuteReason, TaskName};
use crate::fingerprint::Fingerprint;

/// Verdict for a task whose precondition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    UpToDate,
    Execute(ExecuteReason),
}

/// Decide whether a task must execute.
///
/// - `previous`: fingerprint persisted after the last successful execution.
/// - `current`: fingerprint of the declared inputs/outputs right now.
/// - `missing_outputs`: declared outputs that are absent or of the wrong kind.
/// - `feeding_upstream`: dependencies that executed in this invocation and
///   whose outputs overlap this task's inputs.
pub fn decide(
    previous: Option<&Fingerprint>,
    current: &Fingerprint,
    missing_outputs: Vec<PathBuf>,
    feeding_upstream: Vec<TaskName>,
) -> Decision {
    let Some(previous) = previous else {
        return Decision::Execute(ExecuteReason::NoHistory);
    };

    if !missing_outputs.is_empty() {
        return Decision::Execute(ExecuteReason::OutputsMissing(missing_outputs));
    }

    if !feeding_upstream.is_empty() {
        return Decision::Execute(ExecuteReason::UpstreamExecuted(feeding_upstream));
    }

    if previous.inputs != current.inputs {
        return Decision::Execute(ExecuteReason::InputsChanged);
    }

    if previous.outputs != current.outputs {
        return Decision::Execute(ExecuteReason::OutputsChanged);
    }

    Decision::UpToDate
}
