//! Typed errors for the LLM layer.
//!
//! Everything above the LLM layer (bootstrap, handlers) works with `anyhow`;
//! this enum exists so handlers can tell "every endpoint is down" apart from
//! "an endpoint answered with garbage".

use std::fmt;

use crate::backend_target::BackendTarget;

/// Why a single candidate endpoint was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The endpoint answered with a non-2xx status.
    Status { status: u16, body: String },
    /// Connect error, timeout, TLS failure and the like.
    Transport(String),
}

/// One rejected endpoint, as reported in the aggregated error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub base_url: String,
    pub reason: FailureReason,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Status { status, body } => write!(
                f,
                "{} - Error: {} {}",
                BackendTarget::chat_completions_url(&self.base_url),
                status,
                body
            ),
            FailureReason::Transport(message) => write!(f, "{} - {}", self.base_url, message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no LLM endpoints configured")]
    NoEndpoints,

    #[error("Failed to connect to LLM: {}", join_failures(.0))]
    AllEndpointsFailed(Vec<EndpointFailure>),

    #[error("Failed to parse LLM response: {0}")]
    InvalidResponse(String),
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
