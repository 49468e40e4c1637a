//! LLM module - everything that talks to the local chat-completions server

pub mod client;
pub mod framer;
pub mod prober;
pub mod relay;
pub mod types;

pub use client::{CompletionOptions, LlmClient};
pub use framer::ConversationFramer;
pub use prober::{EndpointProber, ProbeSuccess};
pub use relay::{relay, RelayEvent, SseDecoder, Transcript};
pub use types::{ChatCompletionRequest, ChatMessage, Role, WireMessage};
