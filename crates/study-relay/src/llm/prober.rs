//! Endpoint prober: linear walk over candidate LLM base URLs.
//!
//! All candidates live on the local network and are either up or down, so
//! there is no backoff. The first 2xx wins; every failure is collected and
//! reported together once the list is exhausted.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend_target::BackendTarget;
use crate::error::{EndpointFailure, FailureReason, LlmError};
use crate::metrics;

use super::types::ChatCompletionRequest;

/// A 2xx response together with the base URL that produced it.
#[derive(Debug)]
pub struct ProbeSuccess {
    pub base_url: String,
    pub response: reqwest::Response,
}

#[derive(Clone)]
pub struct EndpointProber {
    endpoints: Vec<String>,
    http_client: reqwest::Client,
    live: BackendTarget,
}

impl EndpointProber {
    pub fn new(endpoints: Vec<String>, http_client: reqwest::Client) -> Self {
        info!("Endpoint prober initialized with {} candidate(s): {:?}", endpoints.len(), endpoints);
        Self { endpoints, http_client, live: BackendTarget::new() }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn live_target(&self) -> &BackendTarget {
        &self.live
    }

    /// POST `request` to each candidate in order until one answers 2xx.
    ///
    /// For streaming requests `timeout` bounds the wait for response headers
    /// only, so a long generation is not cut off mid-stream. Non-streaming
    /// requests are bounded end to end.
    pub async fn send(
        &self,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<ProbeSuccess, LlmError> {
        if self.endpoints.is_empty() {
            return Err(LlmError::NoEndpoints);
        }

        let mut failures = Vec::with_capacity(self.endpoints.len());

        for base_url in &self.endpoints {
            let url = BackendTarget::chat_completions_url(base_url);
            debug!("Trying LLM at: {}", url);

            let mut builder = self.http_client.post(&url).json(request);
            if !request.stream {
                builder = builder.timeout(timeout);
            }

            let reason = match tokio::time::timeout(timeout, builder.send()).await {
                Ok(Ok(response)) if response.status().is_success() => {
                    info!("Connected to LLM at {}", url);
                    self.live.set(base_url);
                    return Ok(ProbeSuccess { base_url: base_url.clone(), response });
                }
                Ok(Ok(response)) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    FailureReason::Status { status, body }
                }
                Ok(Err(e)) => FailureReason::Transport(e.to_string()),
                Err(_) => FailureReason::Transport(format!(
                    "timed out after {}s",
                    timeout.as_secs_f32()
                )),
            };

            let failure = EndpointFailure { base_url: base_url.clone(), reason };
            warn!("LLM endpoint rejected: {}", failure);
            metrics::inc_endpoint_failure(base_url);
            failures.push(failure);
        }

        Err(LlmError::AllEndpointsFailed(failures))
    }
}
