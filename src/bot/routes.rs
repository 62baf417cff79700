//! HTTP activity endpoint.
//!
//! `POST /api/messages` takes one activity and answers synchronously with
//! the bot's replies; `GET /health` reports liveness.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::bot::router::ConnectHubBot;
use crate::bot::runner::FALLBACK_MESSAGE;
use crate::channels::{ChannelAccount, IncomingMessage};
use crate::error::ChannelError;

/// Channel name used when an activity does not say where it came from.
pub const HTTP_CHANNEL: &str = "http";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ActivityState {
    pub bot: Arc<ConnectHubBot>,
}

/// Build the Axum router for the activity endpoint.
pub fn activity_routes(bot: Arc<ConnectHubBot>) -> Router {
    Router::new()
        .route("/api/messages", post(post_activity))
        .route("/health", get(health))
        .with_state(ActivityState { bot })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRef {
    pub id: String,
}

/// Inbound activity, in the shape chat connectors post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    #[serde(default)]
    pub recipient: Option<ChannelAccount>,
    #[serde(default)]
    pub conversation: Option<ConversationRef>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub members_added: Vec<ChannelAccount>,
}

impl Activity {
    /// Convert to the channel-neutral event the bot handles.
    pub fn into_incoming(self) -> Result<IncomingMessage, ChannelError> {
        let channel = self
            .channel_id
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| HTTP_CHANNEL.to_string());
        let conversation_id = self
            .conversation
            .map(|c| c.id)
            .or_else(|| self.from.as_ref().map(|f| f.id.clone()))
            .ok_or_else(|| {
                ChannelError::InvalidMessage("activity has no conversation or sender".into())
            })?;

        let incoming = match self.kind.as_str() {
            "message" => {
                let from = self
                    .from
                    .ok_or_else(|| ChannelError::InvalidMessage("message has no sender".into()))?;
                let mut msg = IncomingMessage::new(channel, from.id, self.text.unwrap_or_default())
                    .with_conversation(conversation_id);
                if let Some(name) = from.name {
                    msg = msg.with_user_name(name);
                }
                msg
            }
            "conversationUpdate" => {
                IncomingMessage::members_added(channel, conversation_id, self.members_added)
            }
            other => {
                return Err(ChannelError::InvalidMessage(format!(
                    "unsupported activity type: {other}"
                )));
            }
        };

        Ok(match self.recipient {
            Some(bot) => incoming.with_recipient(bot.id),
            None => incoming,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityResponse {
    pub replies: Vec<String>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "connect-hub"
    }))
}

async fn post_activity(
    State(state): State<ActivityState>,
    Json(activity): Json<Activity>,
) -> impl IntoResponse {
    let msg = match activity.into_incoming() {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Rejected activity: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            );
        }
    };
    debug!(channel = %msg.channel, conversation = %msg.conversation_id, "Activity received");

    match state.bot.on_turn(&msg).await {
        Ok(replies) => (
            StatusCode::OK,
            Json(serde_json::json!(ActivityResponse { replies })),
        ),
        Err(e) => {
            error!(channel = %msg.channel, "Error handling activity: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!(ActivityResponse {
                    replies: vec![FALLBACK_MESSAGE.to_string()],
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ActivityKind;

    fn parse(json: serde_json::Value) -> Result<IncomingMessage, ChannelError> {
        serde_json::from_value::<Activity>(json).unwrap().into_incoming()
    }

    #[test]
    fn message_activity() {
        let msg = parse(serde_json::json!({
            "type": "message",
            "channelId": "emulator",
            "from": {"id": "u1", "name": "Bob"},
            "recipient": {"id": "bot"},
            "conversation": {"id": "c1"},
            "text": "hello"
        }))
        .unwrap();
        assert_eq!(msg.channel, "emulator");
        assert_eq!(msg.user_id, "u1");
        assert_eq!(msg.user_name.as_deref(), Some("Bob"));
        assert_eq!(msg.conversation_id, "c1");
        assert_eq!(msg.recipient_id.as_deref(), Some("bot"));
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.kind, ActivityKind::Message);
    }

    #[test]
    fn message_defaults() {
        let msg = parse(serde_json::json!({
            "type": "message",
            "from": {"id": "u1"}
        }))
        .unwrap();
        assert_eq!(msg.channel, HTTP_CHANNEL);
        assert_eq!(msg.conversation_id, "u1");
        assert_eq!(msg.content, "");
    }

    #[test]
    fn conversation_update_activity() {
        let msg = parse(serde_json::json!({
            "type": "conversationUpdate",
            "conversation": {"id": "c1"},
            "membersAdded": [{"id": "u1"}, {"id": "bot"}]
        }))
        .unwrap();
        let ActivityKind::MembersAdded(members) = msg.kind else {
            panic!("expected members added");
        };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn invalid_activities() {
        let no_sender = parse(serde_json::json!({
            "type": "message",
            "conversation": {"id": "c1"}
        }));
        assert!(matches!(no_sender, Err(ChannelError::InvalidMessage(_))));

        let nowhere = parse(serde_json::json!({"type": "conversationUpdate"}));
        assert!(nowhere.is_err());

        let typing = parse(serde_json::json!({"type": "typing", "from": {"id": "u1"}}));
        assert!(typing.is_err());
    }
}
