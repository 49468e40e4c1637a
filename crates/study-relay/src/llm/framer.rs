//! Builds the message list sent upstream from the latest user message and a
//! bounded slice of history.

use tracing::debug;

use super::types::{ChatMessage, Role, WireMessage};

const INSTRUCTIONS_ACK: &str = "Understood. I will follow these instructions.";

/// Frames a conversation for an OpenAI-compatible endpoint that only accepts
/// `user` and `assistant` roles.
#[derive(Debug, Clone)]
pub struct ConversationFramer {
    window: usize,
    instructions: Option<String>,
}

impl ConversationFramer {
    pub fn new(window: usize) -> Self {
        Self { window, instructions: None }
    }

    /// Instructions are sent as a leading user turn plus an assistant
    /// acknowledgement, since some local servers reject the `system` role.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Keep the newest `window` user/assistant messages in their original
    /// order, then append `latest` unless history already ends with it.
    ///
    /// No alternation repair happens here: two consecutive user turns are
    /// forwarded as-is.
    pub fn frame(&self, latest: &str, history: &[ChatMessage]) -> Vec<WireMessage> {
        let eligible: Vec<&ChatMessage> = history
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .collect();

        let skip = eligible.len().saturating_sub(self.window);
        let recent = &eligible[skip..];

        let mut messages = Vec::with_capacity(recent.len() + 3);

        if let Some(ref instructions) = self.instructions {
            messages.push(WireMessage { role: "user".to_string(), content: instructions.clone() });
            messages.push(WireMessage {
                role: "assistant".to_string(),
                content: INSTRUCTIONS_ACK.to_string(),
            });
        }

        messages.extend(recent.iter().map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        let already_present = recent
            .last()
            .map(|m| m.role == Role::User && m.content == latest)
            .unwrap_or(false);

        if !latest.is_empty() && !already_present {
            messages.push(WireMessage { role: "user".to_string(), content: latest.to_string() });
        }

        debug!(
            "Framed {} messages ({} history kept of {}, window {})",
            messages.len(),
            recent.len(),
            history.len(),
            self.window
        );

        messages
    }
}

impl Default for ConversationFramer {
    fn default() -> Self {
        Self::new(6)
    }
}
