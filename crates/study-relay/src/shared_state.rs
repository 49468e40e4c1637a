//! Shared state handed to every request handler.
//!
//! Handlers get everything through this explicit context object; there is
//! no module-level "current user" or client singleton.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::llm::LlmClient;

/// Atomic counters for the status endpoint
#[derive(Default)]
pub struct AtomicCounters {
    pub total_requests: AtomicUsize,
    pub active_streams: AtomicUsize,
    pub completed_streams: AtomicUsize,
    pub failed_streams: AtomicUsize,
    pub schedules_extracted: AtomicUsize,
}

#[derive(Debug, Serialize)]
pub struct CounterSnapshot {
    pub total_requests: usize,
    pub active_streams: usize,
    pub completed_streams: usize,
    pub failed_streams: usize,
    pub schedules_extracted: usize,
}

impl AtomicCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_total_requests(&self) -> usize {
        self.total_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn stream_opened(&self) {
        self.active_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_closed(&self, completed: bool) {
        self.active_streams.fetch_sub(1, Ordering::Relaxed);
        if completed {
            self.completed_streams.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_streams.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_schedules_extracted(&self) -> usize {
        self.schedules_extracted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
            completed_streams: self.completed_streams.load(Ordering::Relaxed),
            failed_streams: self.failed_streams.load(Ordering::Relaxed),
            schedules_extracted: self.schedules_extracted.load(Ordering::Relaxed),
        }
    }
}

/// Application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<LlmClient>,
    pub counters: Arc<AtomicCounters>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        info!("Initializing application state");
        let llm = Arc::new(LlmClient::from_config(&config)?);
        Ok(Self::with_client(config, llm))
    }

    pub fn with_client(config: Config, llm: Arc<LlmClient>) -> Self {
        Self {
            config: Arc::new(config),
            llm,
            counters: Arc::new(AtomicCounters::new()),
            started_at: Instant::now(),
        }
    }
}
