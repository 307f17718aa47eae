//! Orchestration events
//!
//! Every component that observes lifecycle transitions receives an
//! [`EventSender`] at construction time. Ownership of "who observes whom"
//! stays explicit: there is no global event bus, and a component without a
//! sender emits nothing.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::agent::AgentStatus;
use crate::ids::{AgentId, MessageId, TaskId, WorkflowId};

/// Sender half of an orchestration event channel
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiver half of an orchestration event channel
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create a new event channel pair
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Lifecycle events emitted by the orchestration engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A new agent joined the registry
    AgentRegistered {
        agent_id: AgentId,
        role: String,
    },
    /// An agent's status changed
    AgentStatusChanged {
        agent_id: AgentId,
        role: String,
        status: AgentStatus,
    },
    /// A task was handed to an agent
    TaskAssigned {
        agent_id: AgentId,
        task_id: TaskId,
    },
    /// An agent finished a task successfully
    TaskCompleted {
        agent_id: AgentId,
        task_id: TaskId,
    },
    /// An agent's execution routine failed
    TaskFailed {
        agent_id: AgentId,
        task_id: TaskId,
        error: String,
    },
    /// No capable idle agent was available; the task went to the queue
    TaskQueued {
        task_id: TaskId,
    },
    /// A workflow began executing
    WorkflowStarted {
        workflow_id: WorkflowId,
        name: String,
    },
    /// A workflow step finished and its result was recorded
    WorkflowStepCompleted {
        workflow_id: WorkflowId,
        step: usize,
    },
    /// All workflow steps finished
    WorkflowCompleted {
        workflow_id: WorkflowId,
    },
    /// A workflow step failed; remaining steps were skipped
    WorkflowFailed {
        workflow_id: WorkflowId,
        step: usize,
        error: String,
    },
    /// A message entered the communication hub
    MessageSent {
        message_id: MessageId,
        from: String,
    },
}
