// src/engine/orchestrator.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dag::{DagGraph, Scheduler, TaskDescriptor};
use crate::engine::decision::{Decision, decide};
use crate::engine::report::BuildReport;
use crate::engine::{ExecuteReason, TaskName, TaskOutcome};
use crate::errors::{FrontdagError, Result};
use crate::fingerprint::{FingerprintStore, compute_fingerprint, missing_outputs};
use crate::fs::FileSystem;

/// Verdict for a ready task, before any action runs.
#[derive(Debug)]
enum Evaluation {
    Skip(String),
    UpToDate,
    Execute(ExecuteReason),
    Failed(FrontdagError),
}

/// Drives one invocation over a registered set of tasks.
///
/// The scheduler decides which tasks are ready; this shell evaluates them
/// against the fingerprint store, runs actions of independent tasks
/// concurrently, and persists fingerprints as actions succeed. Fingerprint
/// computation and store access stay on the calling task.
pub struct Orchestrator {
    tasks: BTreeMap<TaskName, TaskDescriptor>,
    graph: DagGraph,
    fs: Arc<dyn FileSystem>,
    store: Box<dyn FingerprintStore>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("graph", &self.graph)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Register tasks and validate the graph they form.
    pub fn new(
        tasks: Vec<TaskDescriptor>,
        fs: Arc<dyn FileSystem>,
        store: Box<dyn FingerprintStore>,
    ) -> Result<Self> {
        let graph = DagGraph::from_tasks(&tasks)?;
        let tasks = tasks
            .into_iter()
            .map(|task| (task.name.clone(), task))
            .collect();

        Ok(Self {
            tasks,
            graph,
            fs,
            store,
        })
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn task(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(name)
    }

    /// Run `targets` and everything they depend on.
    ///
    /// Task failures are reported in the returned [`BuildReport`]; only
    /// planning errors (unknown target) are returned as `Err`.
    pub async fn run(&mut self, targets: &[&str]) -> Result<BuildReport> {
        let mut scheduler = Scheduler::new(self.graph.clone());
        scheduler.plan(targets)?;

        for (name, outcome) in scheduler.completed() {
            if let Some(reason) = self.tasks.get(name).and_then(|t| t.disabled.as_deref()) {
                info!(task = %name, ?outcome, reason, "task skipped");
            }
        }

        let mut errors: BTreeMap<TaskName, String> = BTreeMap::new();
        let mut running: JoinSet<(TaskName, Result<()>)> = JoinSet::new();

        loop {
            let mut settled_inline = false;

            for name in scheduler.collect_ready() {
                match self.evaluate(&scheduler, &name) {
                    Evaluation::Skip(reason) => {
                        info!(task = %name, reason = %reason, "task skipped");
                        scheduler.complete(&name, TaskOutcome::Skipped);
                        settled_inline = true;
                    }
                    Evaluation::UpToDate => {
                        info!(task = %name, "task up-to-date");
                        scheduler.complete(&name, TaskOutcome::UpToDate);
                        settled_inline = true;
                    }
                    Evaluation::Failed(err) => {
                        error!(task = %name, error = %err, "task evaluation failed");
                        self.discard_fingerprint(&name);
                        errors.insert(name.clone(), err.to_string());
                        scheduler.complete(&name, TaskOutcome::Failed);
                        settled_inline = true;
                    }
                    Evaluation::Execute(reason) => {
                        info!(task = %name, reason = ?reason, "executing task");
                        self.spawn_action(&mut running, name);
                    }
                }
            }

            if settled_inline {
                continue;
            }

            let Some(joined) = running.join_next().await else {
                break;
            };

            let (name, result) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    // The wrapper future never panics; the action's panic is
                    // caught by the nested spawn below.
                    warn!(error = %join_err, "action wrapper terminated abnormally");
                    continue;
                }
            };

            let outcome = match result {
                Ok(()) => match self.record_success(&name) {
                    Ok(()) => {
                        info!(task = %name, "task executed");
                        TaskOutcome::Executed
                    }
                    Err(err) => {
                        error!(task = %name, error = %err, "task fingerprint could not be recorded");
                        self.discard_fingerprint(&name);
                        errors.insert(name.clone(), err.to_string());
                        TaskOutcome::Failed
                    }
                },
                Err(err) => {
                    error!(task = %name, error = %err, "task failed");
                    self.discard_fingerprint(&name);
                    errors.insert(name.clone(), err.to_string());
                    TaskOutcome::Failed
                }
            };

            let blocked = scheduler.complete(&name, outcome);
            for task in blocked {
                info!(task = %task, upstream = %name, "task blocked by upstream failure");
            }
        }

        if !scheduler.is_finished() {
            warn!("invocation ended with tasks still pending");
        }

        self.prune_store();

        Ok(BuildReport {
            order: scheduler.completed().to_vec(),
            errors,
        })
    }

    fn evaluate(&self, scheduler: &Scheduler, name: &str) -> Evaluation {
        let Some(task) = self.tasks.get(name) else {
            return Evaluation::Failed(FrontdagError::TaskNotFound(name.to_string()));
        };

        if let Some(precondition) = &task.precondition {
            if !precondition.holds() {
                return Evaluation::Skip(precondition.reason().to_string());
            }
        }

        if task.outputs.is_empty() {
            return Evaluation::Execute(ExecuteReason::NoOutputsDeclared);
        }

        let current = match compute_fingerprint(self.fs.as_ref(), &task.inputs, &task.outputs) {
            Ok(fp) => fp,
            Err(err) => return Evaluation::Failed(FrontdagError::io(err)),
        };

        let previous = match self.store.load(name) {
            Ok(previous) => previous,
            Err(err) => {
                warn!(task = %name, error = %err, "could not read fingerprint record; treating as absent");
                None
            }
        };

        let missing = missing_outputs(self.fs.as_ref(), &task.outputs);

        let feeding: Vec<TaskName> = scheduler
            .executed_dependencies(name)
            .into_iter()
            .filter(|dep| {
                self.tasks
                    .get(dep)
                    .is_some_and(|upstream| upstream.outputs.feeds(&task.inputs))
            })
            .collect();

        debug!(task = %name, ?previous, ?current, ?missing, ?feeding, "evaluating task");

        match decide(previous.as_ref(), &current, missing, feeding) {
            Decision::UpToDate => Evaluation::UpToDate,
            Decision::Execute(reason) => Evaluation::Execute(reason),
        }
    }

    fn spawn_action(&self, running: &mut JoinSet<(TaskName, Result<()>)>, name: TaskName) {
        let Some(task) = self.tasks.get(&name) else {
            return;
        };
        let action = Arc::clone(&task.action);

        running.spawn(async move {
            // Run the action on its own task so a panic surfaces as a
            // JoinError we can attribute to this task.
            let handle = tokio::spawn(async move { action.execute().await });
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(FrontdagError::Other(anyhow!(
                    "action of task '{}' panicked: {}",
                    name,
                    join_err
                ))),
            };
            (name, result)
        });
    }

    /// Persist the fingerprint of a task whose action just succeeded.
    fn record_success(&mut self, name: &str) -> Result<()> {
        let Some(task) = self.tasks.get(name) else {
            return Ok(());
        };

        if task.outputs.is_empty() {
            return Ok(());
        }

        let fingerprint = compute_fingerprint(self.fs.as_ref(), &task.inputs, &task.outputs)
            .map_err(FrontdagError::io)?;
        self.store
            .save(name, &fingerprint)
            .map_err(FrontdagError::io)
    }

    fn discard_fingerprint(&mut self, name: &str) {
        if let Err(err) = self.store.remove(name) {
            warn!(task = %name, error = %err, "could not discard fingerprint record");
        }
    }

    fn prune_store(&mut self) {
        let registered: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        if let Err(err) = self.store.prune(&registered) {
            warn!(error = %err, "could not prune fingerprint store");
        }
    }
}
