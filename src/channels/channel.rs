//! Channel trait and the activity types that flow through it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialog::SessionKey;
use crate::error::ChannelError;

/// A participant in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// What kind of activity arrived from the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    /// A user utterance.
    Message { text: String },
    /// Membership changed in the conversation.
    ConversationUpdate { members_added: Vec<ChannelAccount> },
    /// Anything else the channel surfaces (typing, reactions, ...).
    Other { name: String },
}

/// An inbound activity from any channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Unique activity ID.
    pub id: Uuid,
    /// Name of the channel that produced this activity.
    pub channel: String,
    /// Sender identifier.
    pub user_id: String,
    /// Conversation the activity belongs to.
    pub conversation_id: String,
    /// The bot's own account id on this channel (the activity recipient).
    pub recipient_id: String,
    pub kind: ActivityKind,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// Create a text message. The conversation id defaults to the user id.
    pub fn new(channel: &str, user_id: &str, text: &str) -> Self {
        Self::with_kind(
            channel,
            user_id,
            ActivityKind::Message {
                text: text.to_string(),
            },
        )
    }

    /// Create a conversation-update activity announcing new members.
    pub fn members_added(channel: &str, user_id: &str, members: Vec<ChannelAccount>) -> Self {
        Self::with_kind(
            channel,
            user_id,
            ActivityKind::ConversationUpdate {
                members_added: members,
            },
        )
    }

    fn with_kind(channel: &str, user_id: &str, kind: ActivityKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            conversation_id: user_id.to_string(),
            recipient_id: crate::config::DEFAULT_BOT_ID.to_string(),
            kind,
            received_at: Utc::now(),
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = recipient_id.into();
        self
    }

    /// Message text, if this is a message activity.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ActivityKind::Message { text } => Some(text),
            _ => None,
        }
    }

    /// Key scoping persisted state for this activity's conversation.
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.channel, &self.conversation_id)
    }
}

/// An outbound reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingResponse {
    /// Plain-text content (also the fallback when attachments can't render).
    pub content: String,
    /// Rich attachments, e.g. adaptive cards.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// A rich attachment on an outbound reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    pub content: serde_json::Value,
}

impl Attachment {
    pub const ADAPTIVE_CARD: &'static str = "application/vnd.microsoft.card.adaptive";

    pub fn adaptive_card(content: serde_json::Value) -> Self {
        Self {
            content_type: Self::ADAPTIVE_CARD.to_string(),
            content,
        }
    }
}

/// Stream of inbound activities produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, used to route replies.
    fn name(&self) -> &str;

    /// Start receiving activities.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a reply to the conversation `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_defaults_conversation_to_user() {
        let msg = IncomingMessage::new("cli", "local-user", "hello");
        assert_eq!(msg.conversation_id, "local-user");
        assert_eq!(msg.text(), Some("hello"));
        assert_eq!(msg.session_key().to_string(), "cli/local-user");
    }

    #[test]
    fn conversation_update_has_no_text() {
        let msg = IncomingMessage::members_added(
            "cli",
            "local-user",
            vec![ChannelAccount::new("local-user")],
        )
        .with_conversation("conv-1");
        assert!(msg.text().is_none());
        assert_eq!(msg.session_key().to_string(), "cli/conv-1");
    }

    #[test]
    fn activity_kind_serde_is_tagged() {
        let kind = ActivityKind::Message {
            text: "hi".into(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["text"], "hi");
    }
}
