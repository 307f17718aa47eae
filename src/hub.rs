//! Inter-agent communication hub
//!
//! Channel-based publish/subscribe plus direct messaging. Delivery is
//! fire-and-forget: every participant with a live inbox gets a copy, a
//! detached participant simply misses it, and nobody acknowledges
//! anything. History is append-ordered and never reordered.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::OrchestrationError;
use crate::event::{Event, EventSender};
use crate::ids::{ChannelId, MessageId};

/// Where a message was addressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    /// Sent directly to one agent by name
    Agent(String),
    /// Sent to every participant of a channel
    Channel(ChannelId),
}

/// An immutable, stamped message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: String,
    pub to: Recipient,
    pub content: Value,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(from: String, to: Recipient, content: Value) -> Self {
        Self {
            id: MessageId::new(),
            from,
            to,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// A named group-communication context
struct Channel {
    name: String,
    participants: Vec<String>,
    messages: Vec<Message>,
}

/// The communication fabric between agents
pub struct CommunicationHub {
    channels: RwLock<HashMap<ChannelId, Channel>>,
    /// Every message ever sent, in send order
    history: RwLock<Vec<Message>>,
    /// Live inboxes, keyed by agent name
    inboxes: RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>,
    event_tx: EventSender,
}

impl CommunicationHub {
    pub fn new(event_tx: EventSender) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            inboxes: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Create a channel and return its id
    pub fn create_channel(&self, name: impl Into<String>, participants: Vec<String>) -> ChannelId {
        let id = ChannelId::new();
        let name = name.into();
        info!(channel = %id, name = %name, participants = participants.len(), "Created channel");
        self.channels.write().insert(
            id,
            Channel {
                name,
                participants,
                messages: Vec::new(),
            },
        );
        id
    }

    /// Open an inbox for an agent
    ///
    /// Replaces any previous inbox under the same name; the explicit
    /// receiver is how an agent observes its `message:<name>` traffic.
    pub fn subscribe(&self, name: impl Into<String>) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.write().insert(name.into(), tx);
        rx
    }

    /// Publish to a channel: append to the channel log and global history,
    /// then fan out one copy per participant
    pub fn send_to_channel(
        &self,
        channel_id: ChannelId,
        from: impl Into<String>,
        content: Value,
    ) -> Result<MessageId, OrchestrationError> {
        let from = from.into();
        let mut channels = self.channels.write();
        let channel = channels
            .get_mut(&channel_id)
            .ok_or(OrchestrationError::ChannelNotFound(channel_id))?;

        let message = Message::new(from, Recipient::Channel(channel_id), content);
        channel.messages.push(message.clone());
        let participants = channel.participants.clone();
        drop(channels);

        self.history.write().push(message.clone());

        let inboxes = self.inboxes.read();
        for participant in &participants {
            if let Some(inbox) = inboxes.get(participant) {
                let _ = inbox.send(message.clone());
            }
        }
        drop(inboxes);

        debug!(
            channel = %channel_id,
            message = %message.id,
            participants = participants.len(),
            "Channel message sent"
        );
        self.emit_sent(&message);
        Ok(message.id)
    }

    /// Send a direct message; no membership check, any agent may be
    /// addressed
    pub fn send_direct(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        content: Value,
    ) -> MessageId {
        let to = to.into();
        let message = Message::new(from.into(), Recipient::Agent(to.clone()), content);
        self.history.write().push(message.clone());

        if let Some(inbox) = self.inboxes.read().get(&to) {
            let _ = inbox.send(message.clone());
        }

        debug!(message = %message.id, to = %to, "Direct message sent");
        self.emit_sent(&message);
        message.id
    }

    /// The most recent `limit` messages involving an agent, in history
    /// order
    ///
    /// An agent is involved as the sender, as a direct recipient, or as a
    /// participant of the channel the message was addressed to.
    pub fn agent_messages(&self, name: &str, limit: usize) -> Vec<Message> {
        let channels = self.channels.read();
        let involved: Vec<Message> = self
            .history
            .read()
            .iter()
            .filter(|message| {
                if message.from == name {
                    return true;
                }
                match &message.to {
                    Recipient::Agent(to) => to == name,
                    Recipient::Channel(id) => channels
                        .get(id)
                        .is_some_and(|c| c.participants.iter().any(|p| p == name)),
                }
            })
            .cloned()
            .collect();

        let skip = involved.len().saturating_sub(limit);
        involved.into_iter().skip(skip).collect()
    }

    /// A channel's message log
    pub fn channel_log(&self, channel_id: ChannelId) -> Option<Vec<Message>> {
        self.channels
            .read()
            .get(&channel_id)
            .map(|c| c.messages.clone())
    }

    /// A channel's participant set
    pub fn channel_participants(&self, channel_id: ChannelId) -> Option<Vec<String>> {
        self.channels
            .read()
            .get(&channel_id)
            .map(|c| c.participants.clone())
    }

    /// A channel's human-readable name
    pub fn channel_name(&self, channel_id: ChannelId) -> Option<String> {
        self.channels.read().get(&channel_id).map(|c| c.name.clone())
    }

    /// Total messages in the global history
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    fn emit_sent(&self, message: &Message) {
        let _ = self.event_tx.send(Event::MessageSent {
            message_id: message.id,
            from: message.from.clone(),
        });
    }
}
