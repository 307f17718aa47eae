//! # Conclave
//!
//! Capability-routed multi-agent task orchestration - the deliberating group.
//!
//! This crate implements a registry of named worker agents, a task router
//! that matches work to capable workers, a sequential workflow executor,
//! an inter-agent communication hub with structured collaboration
//! protocols, and a supporting performance layer (a compute-or-fetch
//! cache and a batched filesystem-mutation queue).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          AGENT MANAGER                               │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐               │
//! │  │ Task Router  │  │  FIFO Queue  │  │   Workflows  │               │
//! │  └──────────────┘  └──────────────┘  └──────────────┘               │
//! └────────────────────────────┬────────────────────────────────────────┘
//!                              │ routes / queues
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!   ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!   │   Agent     │     │   Agent     │     │   Agent     │
//!   │  "writer"   │     │ "reviewer"  │     │ "analyst"   │
//!   └──────┬──────┘     └──────┬──────┘     └──────┬──────┘
//!          │                   │                   │
//!          └───────────┬───────┴───────┬───────────┘
//!                      ▼               ▼
//!             ┌─────────────────┐ ┌──────────────────┐
//!             │ Communication   │ │   Collaboration  │
//!             │      Hub        │ │     Protocols    │
//!             └─────────────────┘ └──────────────────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Agent**: a named worker with declared expertise and its own task
//!   state machine
//! - **Task**: a unit of requested work with optional role/expertise
//!   requirements
//! - **Workflow**: an ordered sequence of tasks bound to worker roles,
//!   executed sequentially with result-threading
//! - **Channel**: a named group-communication context with a participant
//!   set
//! - **Protocol**: a named, ordered template of typed interaction steps
//!
//! Components observe each other through explicit event channels handed
//! into constructors; there are no shared global instances. Construct one
//! [`AgentManager`] per orchestration session and pass it where needed.

pub mod agent;
pub mod batch;
pub mod behavior;
pub mod cache;
pub mod collab;
pub mod error;
pub mod event;
pub mod hub;
pub mod ids;
pub mod loader;
pub mod manager;
pub mod matcher;
pub mod task;
pub mod workflow;

pub use agent::{Agent, AgentHandle, AgentSpec, AgentStatus, ToolAccess};
pub use batch::{BatchFileOperator, FileOp};
pub use behavior::{
    behavior_for, AnalysisBehavior, Behavior, BuildBehavior, FnBehavior, GenericBehavior,
    ReviewBehavior,
};
pub use cache::{CacheStats, OrchestrationCache};
pub use collab::{
    ProtocolEngine, ProtocolInstance, ProtocolStatus, ProtocolStep, StepKind, StepOutcome,
};
pub use error::OrchestrationError;
pub use event::{event_channel, Event, EventReceiver, EventSender};
pub use hub::{CommunicationHub, Message, Recipient};
pub use ids::{AgentId, ChannelId, MessageId, ProtocolId, TaskId, WorkflowId};
pub use loader::{load_team, parse_definition, TeamReport, EXCLUDED_PATTERNS};
pub use manager::{AgentManager, Assignment, SystemStatus};
pub use matcher::{KeywordMatchPolicy, MatchPolicy};
pub use task::{Task, TaskRequirements};
pub use workflow::{Workflow, WorkflowDefinition, WorkflowStatus, WorkflowStep};
