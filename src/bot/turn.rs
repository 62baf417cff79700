//! Per-turn context: who is talking, where, and what they said.

use crate::channels::IncomingMessage;

/// Everything a handler needs to know about the current event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub channel: String,
    pub conversation_id: String,
    pub user_id: String,
    /// The bot's own participant id on this channel.
    pub bot_id: String,
    /// Message text as typed; empty for non-message events.
    pub text: String,
}

impl TurnContext {
    /// Build the context for `msg`. The channel's recipient id wins over
    /// `default_bot_id` when the channel reports one.
    pub fn from_message(msg: &IncomingMessage, default_bot_id: &str) -> Self {
        Self {
            channel: msg.channel.clone(),
            conversation_id: msg.conversation_id.clone(),
            user_id: msg.user_id.clone(),
            bot_id: msg
                .recipient_id
                .clone()
                .unwrap_or_else(|| default_bot_id.to_string()),
            text: msg.content.clone(),
        }
    }

    /// State scope shared by everyone in this conversation.
    pub fn conversation_scope(&self) -> String {
        format!("{}/conversations/{}", self.channel, self.conversation_id)
    }

    /// State scope that follows the user across conversations.
    pub fn user_scope(&self) -> String {
        format!("{}/users/{}", self.channel, self.user_id)
    }
}
