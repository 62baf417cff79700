//! Channel trait and the message types every channel speaks.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;

/// A conversation participant.
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

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// What kind of event an incoming message carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    /// The user typed something.
    Message,
    /// Participants joined the conversation.
    MembersAdded(Vec<ChannelAccount>),
}

/// An inbound event from any channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name, also the first segment of every state scope.
    pub channel: String,
    pub user_id: String,
    pub user_name: Option<String>,
    /// Defaults to the user id for one-to-one channels.
    pub conversation_id: String,
    /// Id of the bot as seen by the channel, when the channel knows it.
    pub recipient_id: Option<String>,
    pub kind: ActivityKind,
    pub content: String,
    /// Channel-specific data needed to reply (chat ids and the like).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// A text message from `user_id`.
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            conversation_id: user_id.clone(),
            user_id,
            user_name: None,
            recipient_id: None,
            kind: ActivityKind::Message,
            content: content.into(),
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    /// A members-added notification for `conversation_id`.
    pub fn members_added(
        channel: impl Into<String>,
        conversation_id: impl Into<String>,
        members: Vec<ChannelAccount>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: conversation_id.clone(),
            conversation_id,
            user_name: None,
            recipient_id: None,
            kind: ActivityKind::MembersAdded(members),
            content: String::new(),
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A reply to send back on the originating channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Stream of inbound events produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A source of user messages and a sink for replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique channel name.
    fn name(&self) -> &str;

    /// Begin receiving events.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply for `msg`.
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
    fn text_message_defaults_conversation_to_user() {
        let msg = IncomingMessage::new("cli", "local-user", "hello");
        assert_eq!(msg.conversation_id, "local-user");
        assert_eq!(msg.kind, ActivityKind::Message);
        assert!(msg.recipient_id.is_none());
        assert!(msg.metadata.is_null());
    }

    #[test]
    fn builders_override_fields() {
        let msg = IncomingMessage::new("telegram", "42", "hi")
            .with_conversation("-100")
            .with_user_name("Ann")
            .with_recipient("bot")
            .with_metadata(serde_json::json!({"chat_id": "-100"}));
        assert_eq!(msg.conversation_id, "-100");
        assert_eq!(msg.user_name.as_deref(), Some("Ann"));
        assert_eq!(msg.recipient_id.as_deref(), Some("bot"));
        assert_eq!(msg.metadata["chat_id"], "-100");
    }

    #[test]
    fn members_added_carries_accounts() {
        let msg = IncomingMessage::members_added(
            "cli",
            "local-user",
            vec![ChannelAccount::new("local-user").with_name("You")],
        );
        let ActivityKind::MembersAdded(members) = &msg.kind else {
            panic!("expected members added");
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name.as_deref(), Some("You"));
        assert!(msg.content.is_empty());
    }

    #[test]
    fn account_serde_omits_missing_name() {
        let json = serde_json::to_string(&ChannelAccount::new("u1")).unwrap();
        assert_eq!(json, r#"{"id":"u1"}"#);
    }
}
