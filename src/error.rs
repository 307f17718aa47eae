//! Conclave error types

use thiserror::Error;

use crate::ids::ChannelId;

/// Errors that can occur in the orchestration engine
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// An agent with the same role name is already registered
    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    /// The agent is already working on a task
    #[error("Agent is busy: {0}")]
    AgentBusy(String),

    /// Message sent to an unknown channel
    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    /// Protocol started before being defined
    #[error("Protocol not found: {0}")]
    ProtocolNotFound(String),

    /// A team definition file could not be parsed
    #[error("Invalid team definition {path}: {reason}")]
    InvalidDefinition { path: String, reason: String },

    /// Filesystem error from the batch operator or team loader
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}
