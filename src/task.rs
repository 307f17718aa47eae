//! Task model - a unit of requested work

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::TaskId;

/// What a task asks of the worker that takes it: a specific role,
/// expertise keywords, or nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequirements {
    /// Desired worker role, matched exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Desired expertise keywords, matched as case-insensitive substrings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expertise: Vec<String>,
}

impl TaskRequirements {
    /// Require an exact role
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            expertise: Vec::new(),
        }
    }

    /// Require expertise keywords
    pub fn expertise<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: None,
            expertise: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// True if the task asks for nothing in particular
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.expertise.is_empty()
    }
}

/// A unit of requested work
///
/// Created by a caller, owned by the worker it is assigned to for its
/// lifetime, or held in the registry's unassigned queue before assignment.
/// Once resolved it carries at most one of `result` / `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    #[serde(default)]
    pub requirements: TaskRequirements,
    /// Opaque payload; workflow steps receive prior results here
    #[serde(default)]
    pub context: Value,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl Task {
    /// Create a new unassigned task
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            description: description.into(),
            requirements: TaskRequirements::default(),
            context: Value::Null,
            assigned_at: None,
            completed_at: None,
            failed_at: None,
            result: None,
            error: None,
        }
    }

    /// Set the full requirements
    pub fn with_requirements(mut self, requirements: TaskRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Require an exact role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.requirements.role = Some(role.into());
        self
    }

    /// Require expertise keywords
    pub fn with_expertise<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.expertise = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a context payload
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// True once the task carries a result or an error
    pub fn is_resolved(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    /// True if the task resolved without an error
    pub fn succeeded(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    pub(crate) fn resolve_ok(&mut self, result: Value) {
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn resolve_err(&mut self, error: String) {
        self.error = Some(error);
        self.failed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Summarize the report");
        assert!(task.requirements.is_empty());
        assert!(!task.is_resolved());
        assert!(task.assigned_at.is_none());
    }

    #[test]
    fn test_task_builders() {
        let task = Task::new("Review the upload pipeline")
            .with_role("reviewer")
            .with_expertise(["review", "security"])
            .with_context(json!({"attempt": 1}));

        assert_eq!(task.requirements.role.as_deref(), Some("reviewer"));
        assert_eq!(task.requirements.expertise.len(), 2);
        assert_eq!(task.context["attempt"], 1);
    }

    #[test]
    fn test_resolution_is_exclusive() {
        let mut ok = Task::new("works");
        ok.resolve_ok(json!({"done": true}));
        assert!(ok.succeeded());
        assert!(ok.completed_at.is_some());
        assert!(ok.failed_at.is_none());

        let mut bad = Task::new("breaks");
        bad.resolve_err("exploded".into());
        assert!(bad.is_resolved());
        assert!(!bad.succeeded());
        assert!(bad.failed_at.is_some());
    }

    #[test]
    fn test_requirements_serde_skips_empty() {
        let req = TaskRequirements::role("writer");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("expertise"));
    }
}
