// src/dag/task.rs

//! Task descriptors: identity, dependency edges, declared inputs/outputs and
//! the action to run.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::errors::Result;
use crate::fingerprint::{InputSpec, OutputSpec, PropertyValue};

/// The work a task performs when it has to execute.
///
/// Actions must be idempotent: running one twice on the same inputs yields
/// the same outputs.
pub trait TaskAction: Send + Sync {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Action that does nothing, for tasks that only exist to order others.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl TaskAction for NoopAction {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

/// Check evaluated right before fingerprinting; when it does not hold the
/// task is skipped.
#[derive(Clone)]
pub struct Precondition {
    reason: String,
    check: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Precondition {
    pub fn new(reason: impl Into<String>, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            reason: reason.into(),
            check: Arc::new(check),
        }
    }

    pub fn holds(&self) -> bool {
        (self.check)()
    }

    /// What the check requires, logged when the task is skipped.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Debug for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Precondition")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// A named unit of work. Immutable once built.
#[derive(Clone)]
pub struct TaskDescriptor {
    pub name: TaskName,
    /// Upstream tasks, in declaration order.
    pub deps: Vec<TaskName>,
    pub inputs: InputSpec,
    pub outputs: OutputSpec,
    /// `Some(reason)` when the task is disabled for this invocation. A
    /// disabled task is skipped without pulling its dependencies in.
    pub disabled: Option<String>,
    pub precondition: Option<Precondition>,
    pub action: Arc<dyn TaskAction>,
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("disabled", &self.disabled)
            .field("precondition", &self.precondition)
            .finish_non_exhaustive()
    }
}

impl TaskDescriptor {
    pub fn builder(name: impl Into<TaskName>) -> TaskDescriptorBuilder {
        TaskDescriptorBuilder::new(name)
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled.is_none()
    }
}

/// Consuming builder for [`TaskDescriptor`].
pub struct TaskDescriptorBuilder {
    task: TaskDescriptor,
}

impl TaskDescriptorBuilder {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            task: TaskDescriptor {
                name: name.into(),
                deps: Vec::new(),
                inputs: InputSpec::default(),
                outputs: OutputSpec::default(),
                disabled: None,
                precondition: None,
                action: Arc::new(NoopAction),
            },
        }
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        let dep = dep.into();
        if !self.task.deps.contains(&dep) {
            self.task.deps.push(dep);
        }
        self
    }

    pub fn input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.inputs.files.push(path.into());
        self
    }

    pub fn optional_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.inputs.optional_files.push(path.into());
        self
    }

    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.inputs.directories.push(path.into());
        self
    }

    pub fn property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.task.inputs.properties.push((name.to_string(), value.into()));
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.outputs.files.push(path.into());
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.outputs.directories.push(path.into());
        self
    }

    pub fn disabled(mut self, reason: impl Into<String>) -> Self {
        self.task.disabled = Some(reason.into());
        self
    }

    pub fn only_if(
        mut self,
        reason: impl Into<String>,
        check: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.task.precondition = Some(Precondition::new(reason, check));
        self
    }

    pub fn action(mut self, action: impl TaskAction + 'static) -> Self {
        self.task.action = Arc::new(action);
        self
    }

    pub fn build(self) -> TaskDescriptor {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_dedups_dependencies_and_keeps_order() {
        let task = TaskDescriptor::builder("install-frontend")
            .after("install-npm")
            .after("install-pnpm")
            .after("install-npm")
            .build();

        assert_eq!(task.deps, vec!["install-npm", "install-pnpm"]);
        assert!(task.is_enabled());
    }

    #[test]
    fn precondition_is_reevaluated_on_every_check() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let flag = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&flag);
        let pre = Precondition::new("flag set", move || seen.load(Ordering::SeqCst));

        assert!(!pre.holds());
        flag.store(true, Ordering::SeqCst);
        assert!(pre.holds());
        assert_eq!(pre.reason(), "flag set");
    }
}
