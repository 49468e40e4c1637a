//! Wire types for the OpenAI-compatible chat-completions API and the chat
//! messages clients send us.

use serde::{Deserialize, Serialize};

/// Conversation role as sent by clients.
///
/// Anything that is not `user` or `assistant` lands in `Other` so that a
/// stray `system` entry in a client history doesn't fail the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other => "other",
        }
    }
}

/// A chat turn as stored by the UI. `id` and `timestamp` are carried through
/// untouched; the relay never rewrites history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { id: None, role: Role::User, content: content.into(), timestamp: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { id: None, role: Role::Assistant, content: content.into(), timestamp: None }
    }
}

/// Message in the shape the upstream endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<WireMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    pub delta: Option<ChatDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatDelta {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_maps_to_other() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"system","content":"be nice"}"#).unwrap();
        assert_eq!(msg.role, Role::Other);
        assert!(msg.id.is_none());
    }

    #[test]
    fn test_message_keeps_id_and_timestamp() {
        let msg: ChatMessage = serde_json::from_str(
            r#"{"id":"m1","role":"assistant","content":"hi","timestamp":1760000000000}"#,
        )
        .unwrap();
        assert_eq!(msg.id.as_deref(), Some("m1"));
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.timestamp, Some(1_760_000_000_000));
    }
}
