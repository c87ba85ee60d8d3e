// src/engine/report.rs

use std::collections::BTreeMap;

use crate::engine::{TaskName, TaskOutcome};

/// Outcomes of one invocation.
///
/// Tasks that were never pulled into the invocation have no entry; they are
/// reported as ignored.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Terminal outcomes in the order they were reached.
    pub order: Vec<(TaskName, TaskOutcome)>,
    /// Error message per failed task.
    pub errors: BTreeMap<TaskName, String>,
}

impl BuildReport {
    pub fn outcome_of(&self, task: &str) -> Option<TaskOutcome> {
        self.order
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, outcome)| *outcome)
    }

    pub fn is_ignored(&self, task: &str) -> bool {
        self.outcome_of(task).is_none()
    }

    pub fn is_success(&self) -> bool {
        !self.order.iter().any(|(_, outcome)| outcome.is_failure())
    }

    /// Tasks whose action ran successfully, in completion order.
    pub fn executed(&self) -> Vec<&str> {
        self.with_outcome(TaskOutcome::Executed)
    }

    pub fn with_outcome(&self, wanted: TaskOutcome) -> Vec<&str> {
        self.order
            .iter()
            .filter(|(_, outcome)| *outcome == wanted)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn error_of(&self, task: &str) -> Option<&str> {
        self.errors.get(task).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_and_ignored_tasks() {
        let report = BuildReport {
            order: vec![
                ("install-node".to_string(), TaskOutcome::UpToDate),
                ("install-npm".to_string(), TaskOutcome::Failed),
                ("install-frontend".to_string(), TaskOutcome::Blocked),
            ],
            errors: BTreeMap::from([("install-npm".to_string(), "boom".to_string())]),
        };

        assert_eq!(report.outcome_of("install-node"), Some(TaskOutcome::UpToDate));
        assert!(report.is_ignored("clean-frontend"));
        assert!(!report.is_success());
        assert!(report.executed().is_empty());
        assert_eq!(report.error_of("install-npm"), Some("boom"));
    }
}
