//! Identifier newtypes shared across the orchestration engine

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Unique identifier for an agent
    AgentId
);

id_type!(
    /// Unique identifier for a task
    TaskId
);

id_type!(
    /// Unique identifier for a workflow run
    WorkflowId
);

id_type!(
    /// Unique identifier for a communication channel
    ChannelId
);

id_type!(
    /// Unique identifier for a message
    MessageId
);

id_type!(
    /// Unique identifier for a protocol instance
    ProtocolId
);
