// study-relay/crates/study-relay/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::info;

const DEFAULT_ENDPOINTS: &str = "http://localhost:1234,http://127.0.0.1:1234";

#[derive(Debug, Clone)]
pub struct Config {
    /// Candidate LLM base URLs, tried in this order.
    pub llm_endpoints: Vec<String>,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub schedule_max_tokens: u32,
    pub request_timeout_seconds: u64,
    pub schedule_timeout_seconds: u64,
    /// Silence allowed between upstream reads once streaming; 0 disables.
    pub stream_idle_timeout_seconds: u64,
    pub context_window: usize,
    pub api_host: String,
    pub api_port: u16,
    pub max_request_bytes: usize,
}

impl Config {
    /// Read configuration from the process environment. Loading a `.env`
    /// file is the binary's job.
    pub fn from_env() -> Result<Self> {
        let listed = env::var("LLM_ENDPOINTS").unwrap_or_else(|_| DEFAULT_ENDPOINTS.into());
        let override_endpoint = env::var("LLM_ENDPOINT").ok();
        let llm_endpoints = Self::parse_endpoints(override_endpoint.as_deref(), &listed);

        if llm_endpoints.is_empty() {
            return Err(anyhow::anyhow!(
                "No LLM endpoints configured. Set LLM_ENDPOINTS (comma separated) or LLM_ENDPOINT."
            ));
        }

        Ok(Self {
            llm_endpoints,
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "mistral-7b-instruct-v0.3".into()),
            llm_temperature: parse_var("LLM_TEMPERATURE", 0.7)?,
            llm_max_tokens: parse_var("LLM_MAX_TOKENS", 500)?,
            schedule_max_tokens: parse_var("SCHEDULE_MAX_TOKENS", 1000)?,
            request_timeout_seconds: parse_var("REQUEST_TIMEOUT_SECONDS", 30)?,
            schedule_timeout_seconds: parse_var("SCHEDULE_TIMEOUT_SECONDS", 90)?,
            stream_idle_timeout_seconds: parse_var("STREAM_IDLE_TIMEOUT_SECONDS", 60)?,
            context_window: parse_var("CONTEXT_WINDOW", 6)?,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            api_port: parse_var("API_PORT", 8000)?,
            max_request_bytes: parse_var("MAX_REQUEST_BYTES", 1024 * 1024)?,
        })
    }

    /// Build the ordered candidate list: the override first, then the listed
    /// endpoints, trailing slashes trimmed and duplicates dropped.
    pub fn parse_endpoints(override_endpoint: Option<&str>, listed: &str) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::new();
        let candidates = override_endpoint.into_iter().chain(listed.split(','));

        for raw in candidates {
            let url = raw.trim().trim_end_matches('/');
            if url.is_empty() || endpoints.iter().any(|e| e == url) {
                continue;
            }
            endpoints.push(url.to_string());
        }
        endpoints
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- LLM Endpoints: {}", self.llm_endpoints.join(", "));
        info!("- Model: {}", self.llm_model);
        info!("- Temperature: {}", self.llm_temperature);
        info!("- Max Tokens: {} (schedule: {})", self.llm_max_tokens, self.schedule_max_tokens);
        info!(
            "- Timeouts: request {}s, schedule {}s, stream idle {}",
            self.request_timeout_seconds,
            self.schedule_timeout_seconds,
            match self.stream_idle_timeout_seconds {
                0 => "disabled".to_string(),
                secs => format!("{}s", secs),
            }
        );
        info!("- Context Window: {} messages", self.context_window);
        info!("- API: {}:{}", self.api_host, self.api_port);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
