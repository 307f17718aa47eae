//! Agent implementation - a single capability-tagged worker

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::behavior::Behavior;
use crate::error::OrchestrationError;
use crate::event::{Event, EventSender};
use crate::ids::AgentId;
use crate::matcher::expertise_overlap;
use crate::task::Task;

/// Agent task state machine
///
/// `Completed` and `Failed` are transient: the agent passes through them
/// during bookkeeping and returns to `Idle` before `assign_task` resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
    Completed,
    Failed,
}

/// Tool whitelist for a worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolAccess {
    /// Any tool may be used
    #[default]
    Any,
    /// Only the listed tools may be used
    Only(Vec<String>),
}

impl ToolAccess {
    /// Check whether a tool name is allowed
    pub fn allows(&self, tool: &str) -> bool {
        match self {
            ToolAccess::Any => true,
            ToolAccess::Only(tools) => tools.iter().any(|t| t == tool),
        }
    }
}

/// Declarative description of a worker: its role name, what it knows,
/// and which tools it may use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Role name, unique within a registry
    pub role: String,
    #[serde(default)]
    pub description: String,
    /// Capability keywords
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub allowed_tools: ToolAccess,
}

impl AgentSpec {
    /// Create a spec with the given role and no expertise
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            description: String::new(),
            expertise: Vec::new(),
            allowed_tools: ToolAccess::default(),
        }
    }

    /// Set the human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expertise keywords
    pub fn with_expertise<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the tool whitelist
    pub fn with_tools(mut self, tools: ToolAccess) -> Self {
        self.allowed_tools = tools;
        self
    }
}

/// A single worker
///
/// Owns its own status, current task, and history; nothing outside the
/// agent mutates them. Invariant: `current_task` is `Some` iff the status
/// is `Working`.
pub struct Agent {
    /// Unique identifier
    pub id: AgentId,
    /// Capability description
    pub spec: AgentSpec,
    /// Current status
    status: RwLock<AgentStatus>,
    /// Task being worked on, if any
    current_task: RwLock<Option<Task>>,
    /// Append-only log of completed and failed tasks
    history: RwLock<Vec<Task>>,
    /// Role-specific execution routine
    behavior: Box<dyn Behavior>,
    /// Event sender for reporting lifecycle transitions
    event_tx: EventSender,
}

impl Agent {
    /// Create a new idle agent
    pub fn new(spec: AgentSpec, behavior: Box<dyn Behavior>, event_tx: EventSender) -> Self {
        let id = AgentId::new();

        info!(
            agent_id = %id,
            role = %spec.role,
            behavior = behavior.name(),
            "Creating new agent"
        );

        Self {
            id,
            spec,
            status: RwLock::new(AgentStatus::Idle),
            current_task: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            behavior,
            event_tx,
        }
    }

    /// Get current status
    pub fn status(&self) -> AgentStatus {
        *self.status.read()
    }

    /// True if the agent can take a task right now
    pub fn is_idle(&self) -> bool {
        self.status() == AgentStatus::Idle
    }

    /// Get the task currently being worked on
    pub fn current_task(&self) -> Option<Task> {
        self.current_task.read().clone()
    }

    /// Snapshot of the task history
    pub fn history(&self) -> Vec<Task> {
        self.history.read().clone()
    }

    /// Pure capability predicate: can this agent satisfy the task's
    /// requirements?
    ///
    /// True on an exact role match, or when any requested expertise keyword
    /// is a case-insensitive substring of one of the agent's keywords.
    pub fn can_handle(&self, task: &Task) -> bool {
        let requirements = &task.requirements;
        if requirements.role.as_deref() == Some(self.spec.role.as_str()) {
            return true;
        }
        expertise_overlap(&requirements.expertise, &self.spec.expertise)
    }

    /// Take a task, run the execution routine, and resolve the task
    ///
    /// Fails with [`OrchestrationError::AgentBusy`] if the agent is not
    /// idle. Routine failures never propagate: the returned task carries
    /// either `result` or `error`, and the agent is idle again either way.
    pub async fn assign_task(&self, mut task: Task) -> Result<Task, OrchestrationError> {
        {
            let mut status = self.status.write();
            if *status != AgentStatus::Idle {
                return Err(OrchestrationError::AgentBusy(self.spec.role.clone()));
            }
            task.assigned_at = Some(Utc::now());
            *self.current_task.write() = Some(task.clone());
            *status = AgentStatus::Working;
        }
        self.emit(Event::AgentStatusChanged {
            agent_id: self.id,
            role: self.spec.role.clone(),
            status: AgentStatus::Working,
        });
        self.emit(Event::TaskAssigned {
            agent_id: self.id,
            task_id: task.id,
        });

        debug!(agent = %self.spec.role, task = %task.id, "Executing task");

        match self.behavior.execute(&task).await {
            Ok(result) => Ok(self.complete_task(task, result)),
            Err(err) => Ok(self.fail_task(task, err.to_string())),
        }
    }

    /// Record a successful task and return to idle
    fn complete_task(&self, mut task: Task, result: serde_json::Value) -> Task {
        task.resolve_ok(result);
        *self.current_task.write() = None;
        self.history.write().push(task.clone());

        self.set_status(AgentStatus::Completed);
        self.emit(Event::TaskCompleted {
            agent_id: self.id,
            task_id: task.id,
        });
        self.set_status(AgentStatus::Idle);

        info!(agent = %self.spec.role, task = %task.id, "Task completed");
        task
    }

    /// Record a failed task and return to idle
    fn fail_task(&self, mut task: Task, error: String) -> Task {
        task.resolve_err(error.clone());
        *self.current_task.write() = None;
        self.history.write().push(task.clone());

        self.set_status(AgentStatus::Failed);
        self.emit(Event::TaskFailed {
            agent_id: self.id,
            task_id: task.id,
            error,
        });
        self.set_status(AgentStatus::Idle);

        info!(agent = %self.spec.role, task = %task.id, "Task failed");
        task
    }

    /// Set status and emit the transition
    fn set_status(&self, status: AgentStatus) {
        *self.status.write() = status;
        self.emit(Event::AgentStatusChanged {
            agent_id: self.id,
            role: self.spec.role.clone(),
            status,
        });
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }
}

/// Handle to an agent for external interaction
#[derive(Clone)]
pub struct AgentHandle {
    inner: Arc<Agent>,
}

impl AgentHandle {
    pub fn new(agent: Agent) -> Self {
        Self {
            inner: Arc::new(agent),
        }
    }

    pub fn id(&self) -> AgentId {
        self.inner.id
    }

    pub fn role(&self) -> &str {
        &self.inner.spec.role
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.inner.id)
            .field("role", &self.inner.spec.role)
            .finish()
    }
}

impl std::ops::Deref for AgentHandle {
    type Target = Agent;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{FnBehavior, GenericBehavior};
    use crate::event::{event_channel, EventReceiver};
    use anyhow::anyhow;
    use serde_json::json;
    use std::time::Duration;

    fn create_test_agent() -> (Agent, EventReceiver) {
        let (tx, rx) = event_channel();
        let spec = AgentSpec::new("writer").with_expertise(["prose", "editing"]);
        (Agent::new(spec, Box::new(GenericBehavior), tx), rx)
    }

    #[test]
    fn test_agent_starts_idle() {
        let (agent, _rx) = create_test_agent();
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.current_task().is_none());
        assert!(agent.history().is_empty());
    }

    #[test]
    fn test_can_handle_role_match() {
        let (agent, _rx) = create_test_agent();
        assert!(agent.can_handle(&Task::new("draft").with_role("writer")));
        assert!(!agent.can_handle(&Task::new("draft").with_role("reviewer")));
    }

    #[test]
    fn test_can_handle_expertise_substring() {
        let (agent, _rx) = create_test_agent();
        // "PROSE" matches "prose" case-insensitively
        assert!(agent.can_handle(&Task::new("draft").with_expertise(["PROSE"])));
        // "edit" is a substring of "editing"
        assert!(agent.can_handle(&Task::new("draft").with_expertise(["edit"])));
        assert!(!agent.can_handle(&Task::new("draft").with_expertise(["painting"])));
    }

    #[test]
    fn test_can_handle_empty_requirements() {
        let (agent, _rx) = create_test_agent();
        assert!(!agent.can_handle(&Task::new("anything")));
    }

    #[test]
    fn test_tool_access() {
        assert!(ToolAccess::Any.allows("bash"));
        let only = ToolAccess::Only(vec!["read".into()]);
        assert!(only.allows("read"));
        assert!(!only.allows("bash"));
    }

    #[tokio::test]
    async fn test_assign_task_success() {
        let (agent, mut rx) = create_test_agent();

        let task = agent.assign_task(Task::new("write intro")).await.unwrap();
        assert!(task.succeeded());
        assert!(task.assigned_at.is_some());
        assert!(task.completed_at.is_some());

        // Agent is idle again with one history entry
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.current_task().is_none());
        assert_eq!(agent.history().len(), 1);

        // Working status change, assignment, completed transition, completion
        assert!(matches!(
            rx.try_recv().unwrap(),
            Event::AgentStatusChanged {
                status: AgentStatus::Working,
                ..
            }
        ));
        assert!(matches!(rx.try_recv().unwrap(), Event::TaskAssigned { .. }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            Event::AgentStatusChanged {
                status: AgentStatus::Completed,
                ..
            }
        ));
        assert!(matches!(rx.try_recv().unwrap(), Event::TaskCompleted { .. }));
    }

    #[tokio::test]
    async fn test_assign_task_failure_is_captured() {
        let (tx, mut rx) = event_channel();
        let spec = AgentSpec::new("fragile");
        let behavior = FnBehavior::new("explode", |_task| Err(anyhow!("boom")));
        let agent = Agent::new(spec, Box::new(behavior), tx);

        let task = agent.assign_task(Task::new("doomed")).await.unwrap();
        assert_eq!(task.error.as_deref(), Some("boom"));
        assert!(task.result.is_none());
        assert!(task.failed_at.is_some());

        // Failure resets to idle and is logged to history
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert_eq!(agent.history().len(), 1);

        let failed = (0..8)
            .filter_map(|_| rx.try_recv().ok())
            .any(|e| matches!(e, Event::TaskFailed { .. }));
        assert!(failed);
    }

    #[tokio::test]
    async fn test_assign_task_while_busy() {
        let (tx, _rx) = event_channel();
        let spec = AgentSpec::new("slow");
        let behavior = FnBehavior::new_async("nap", |_task| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(json!({"napped": true}))
        });
        let agent = Agent::new(spec, Box::new(behavior), tx);

        let (first, second) =
            tokio::join!(agent.assign_task(Task::new("a")), agent.assign_task(Task::new("b")));

        assert!(first.unwrap().succeeded());
        assert!(matches!(second, Err(OrchestrationError::AgentBusy(_))));
    }

    #[tokio::test]
    async fn test_working_iff_current_task() {
        let (tx, _rx) = event_channel();
        let spec = AgentSpec::new("observer");
        let behavior = FnBehavior::new_async("nap", |_task| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(json!(null))
        });
        let agent = Agent::new(spec, Box::new(behavior), tx);

        let check = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert_eq!(agent.status(), AgentStatus::Working);
            assert!(agent.current_task().is_some());
        };
        let (result, ()) = tokio::join!(agent.assign_task(Task::new("observed")), check);
        assert!(result.is_ok());

        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.current_task().is_none());
    }
}
