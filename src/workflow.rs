//! Workflow model - an ordered sequence of role-bound steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::WorkflowId;
use crate::task::TaskRequirements;

/// One step of a workflow, bound to a worker role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Target worker role, resolved by exact lookup
    pub role: String,
    pub description: String,
    #[serde(default)]
    pub requirements: TaskRequirements,
}

impl WorkflowStep {
    pub fn new(role: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            description: description.into(),
            requirements: TaskRequirements::default(),
        }
    }

    pub fn with_requirements(mut self, requirements: TaskRequirements) -> Self {
        self.requirements = requirements;
        self
    }
}

/// Workflow state machine: `Running` until the last step succeeds or any
/// step fails; both end states are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

/// A workflow waiting to be run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
    /// Initial context handed to every step
    #[serde(default)]
    pub context: Value,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            context: Value::Null,
        }
    }

    /// Append a step
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// A workflow run
///
/// `results` grows as steps complete; its length always equals the number
/// of steps that succeeded so far. A failed run keeps the partial results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
    pub context: Value,
    pub status: WorkflowStatus,
    pub results: Vec<Value>,
    pub error: Option<String>,
    /// Index of the step that failed, if any
    pub failed_step: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub(crate) fn new(definition: WorkflowDefinition) -> Self {
        Self {
            id: WorkflowId::new(),
            name: definition.name,
            steps: definition.steps,
            context: definition.context,
            status: WorkflowStatus::Running,
            results: Vec::new(),
            error: None,
            failed_step: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn complete(&mut self) {
        self.status = WorkflowStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, step: usize, error: String) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(error);
        self.failed_step = Some(step);
        self.finished_at = Some(Utc::now());
    }

    /// True if the run ended without a failure
    pub fn succeeded(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_builder() {
        let definition = WorkflowDefinition::new("publish")
            .step(WorkflowStep::new("writer", "draft the post"))
            .step(WorkflowStep::new("reviewer", "review the draft"))
            .with_context(json!({"topic": "caching"}));

        assert_eq!(definition.steps.len(), 2);
        assert_eq!(definition.context["topic"], "caching");
    }

    #[test]
    fn test_workflow_starts_running() {
        let workflow = Workflow::new(WorkflowDefinition::new("empty"));
        assert_eq!(workflow.status, WorkflowStatus::Running);
        assert!(workflow.results.is_empty());
        assert!(workflow.finished_at.is_none());
    }

    #[test]
    fn test_fail_records_step_and_error() {
        let mut workflow = Workflow::new(
            WorkflowDefinition::new("doomed").step(WorkflowStep::new("writer", "draft")),
        );
        workflow.fail(0, "writer exploded".into());

        assert_eq!(workflow.status, WorkflowStatus::Failed);
        assert_eq!(workflow.failed_step, Some(0));
        assert_eq!(workflow.error.as_deref(), Some("writer exploded"));
        assert!(workflow.finished_at.is_some());
        assert!(!workflow.succeeded());
    }
}
