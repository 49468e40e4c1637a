//! LLM client: frames conversations and talks to whichever local
//! OpenAI-compatible server the prober finds alive.

use std::time::Duration;

use futures_util::Stream;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::LlmError;

use super::framer::ConversationFramer;
use super::prober::EndpointProber;
use super::relay::{relay, RelayEvent};
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, WireMessage};

/// Token budget and deadline for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub timeout: Duration,
}

pub struct LlmClient {
    prober: EndpointProber,
    framer: ConversationFramer,
    model: String,
    temperature: f32,
    chat: CompletionOptions,
    schedule: CompletionOptions,
    stream_idle_timeout: Option<Duration>,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self::new(
            EndpointProber::new(config.llm_endpoints.clone(), http_client),
            ConversationFramer::new(config.context_window),
            config,
        ))
    }

    pub fn new(prober: EndpointProber, framer: ConversationFramer, config: &Config) -> Self {
        info!(
            "LLM client initialized: model={}, {} endpoint(s), window={}",
            config.llm_model,
            prober.endpoints().len(),
            framer.window()
        );
        Self {
            prober,
            framer,
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            chat: CompletionOptions {
                max_tokens: config.llm_max_tokens,
                timeout: Duration::from_secs(config.request_timeout_seconds),
            },
            schedule: CompletionOptions {
                max_tokens: config.schedule_max_tokens,
                timeout: Duration::from_secs(config.schedule_timeout_seconds),
            },
            stream_idle_timeout: match config.stream_idle_timeout_seconds {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn prober(&self) -> &EndpointProber {
        &self.prober
    }

    pub fn framer(&self) -> &ConversationFramer {
        &self.framer
    }

    /// Options for ordinary chat turns.
    pub fn chat_options(&self) -> CompletionOptions {
        self.chat
    }

    /// Options for schedule generation, which needs more output tokens and
    /// therefore more time.
    pub fn schedule_options(&self) -> CompletionOptions {
        self.schedule
    }

    pub fn frame(&self, latest: &str, history: &[ChatMessage]) -> Vec<WireMessage> {
        self.framer.frame(latest, history)
    }

    fn request(&self, messages: Vec<WireMessage>, max_tokens: u32, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens,
            stream,
        }
    }

    /// Open a streaming completion and return the normalized event stream.
    ///
    /// Errors here mean no endpoint accepted the request; once a stream is
    /// returned every failure is reported in-band.
    pub async fn open_stream(
        &self,
        messages: Vec<WireMessage>,
    ) -> Result<impl Stream<Item = RelayEvent>, LlmError> {
        debug!("Opening streaming completion with {} messages", messages.len());
        let request = self.request(messages, self.chat.max_tokens, true);
        let success = self.prober.send(&request, self.chat.timeout).await?;

        debug!("Streaming from {}", success.base_url);
        Ok(relay(success.response.bytes_stream(), self.stream_idle_timeout))
    }

    /// Non-streaming completion; returns the assistant message text.
    pub async fn complete(
        &self,
        messages: Vec<WireMessage>,
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        debug!("LLM client generating response (non-streaming)");
        let request = self.request(messages, options.max_tokens, false);
        let success = self.prober.send(&request, options.timeout).await?;

        let completion: ChatCompletionResponse = success
            .response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))
    }
}
