// src/dag/scheduler.rs

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::state::{RunState, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{FrontdagError, Result};

/// Per-invocation state machine over an immutable [`DagGraph`].
///
/// It is responsible for:
/// - pulling the requested targets and their dependencies into the run
/// - skipping disabled tasks without pulling in their dependencies
/// - deciding when a task is ready (all dependencies terminal and satisfied)
/// - blocking dependents when a task fails
///
/// It performs no IO, so DAG evaluation order can be tested in isolation.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    states: BTreeMap<TaskName, RunState>,
    /// Terminal outcomes in the order they were reached.
    completed: Vec<(TaskName, TaskOutcome)>,
}

impl Scheduler {
    pub fn new(graph: DagGraph) -> Self {
        Self {
            graph,
            states: BTreeMap::new(),
            completed: Vec::new(),
        }
    }

    /// Pull `targets` and everything they depend on into this run.
    ///
    /// A disabled task is recorded as [`TaskOutcome::Skipped`] straight away
    /// and its dependencies are not traversed through it; they only run if
    /// another requested task needs them.
    pub fn plan(&mut self, targets: &[&str]) -> Result<()> {
        for target in targets {
            if !self.graph.contains(target) {
                return Err(FrontdagError::TaskNotFound(target.to_string()));
            }
        }

        let mut stack: Vec<TaskName> = targets.iter().rev().map(|t| t.to_string()).collect();
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if !self.graph.is_enabled(&name) {
                debug!(task = %name, "task disabled; dependencies not pulled in");
                self.finish(&name, TaskOutcome::Skipped);
                continue;
            }

            self.states.insert(name.clone(), RunState::Pending);
            debug!(task = %name, "marked Pending for this run");
            stack.extend(self.graph.dependencies_of(&name).iter().cloned());
        }

        info!(
            tasks = self.states.len(),
            "scheduler: planned invocation"
        );
        Ok(())
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> TaskRunState {
        self.states.get(task).copied().into()
    }

    pub fn outcome_of(&self, task: &str) -> Option<TaskOutcome> {
        match self.states.get(task) {
            Some(RunState::Done(outcome)) => Some(*outcome),
            _ => None,
        }
    }

    /// Whether every dependency of `task` finished without failing.
    pub fn deps_satisfied(&self, task: &str) -> bool {
        self.graph.dependencies_of(task).iter().all(|dep| {
            matches!(
                self.states.get(dep),
                Some(RunState::Done(outcome)) if outcome.satisfies_dependents()
            )
        })
    }

    /// Direct dependencies that executed their action in this run.
    pub fn executed_dependencies(&self, task: &str) -> Vec<TaskName> {
        self.graph
            .dependencies_of(task)
            .iter()
            .filter(|dep| matches!(self.states.get(*dep), Some(RunState::Done(TaskOutcome::Executed))))
            .cloned()
            .collect()
    }

    /// Collect `Pending` tasks whose dependencies are satisfied, mark them
    /// `Running`, and return their names.
    pub fn collect_ready(&mut self) -> Vec<TaskName> {
        // Decide first, then mutate to avoid borrowing issues.
        let ready: Vec<TaskName> = self
            .states
            .iter()
            .filter(|(name, state)| **state == RunState::Pending && self.deps_satisfied(name))
            .map(|(name, _)| name.clone())
            .collect();

        for name in ready.iter() {
            debug!(task = %name, "dependencies satisfied; marking Running");
            self.states.insert(name.clone(), RunState::Running);
        }

        ready
    }

    /// Record the terminal outcome of a task.
    ///
    /// On failure, every transitive dependent still pending in this run is
    /// marked [`TaskOutcome::Blocked`]. Returns the newly blocked tasks.
    pub fn complete(&mut self, task: &str, outcome: TaskOutcome) -> Vec<TaskName> {
        match self.states.get(task) {
            Some(RunState::Running) | Some(RunState::Pending) => {}
            other => {
                warn!(task = %task, state = ?other, "completion for task not in flight; ignoring");
                return Vec::new();
            }
        }

        self.finish(task, outcome);

        if outcome.is_failure() {
            let blocked = self.block_dependents(task);
            if !blocked.is_empty() {
                warn!(task = %task, ?blocked, "task failed; blocking dependents in this run");
            }
            blocked
        } else {
            Vec::new()
        }
    }

    /// No task is pending or running anymore.
    pub fn is_finished(&self) -> bool {
        !self
            .states
            .values()
            .any(|s| matches!(s, RunState::Pending | RunState::Running))
    }

    /// Terminal outcomes in completion order.
    pub fn completed(&self) -> &[(TaskName, TaskOutcome)] {
        &self.completed
    }

    fn finish(&mut self, task: &str, outcome: TaskOutcome) {
        self.states.insert(task.to_string(), RunState::Done(outcome));
        self.completed.push((task.to_string(), outcome));
    }

    fn block_dependents(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(RunState::Pending) = self.states.get(&name) {
                debug!(task = %name, "marking dependent as Blocked due to upstream failure");
                self.finish(&name, TaskOutcome::Blocked);
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
                newly_blocked.push(name);
            }
        }

        newly_blocked
    }
}
