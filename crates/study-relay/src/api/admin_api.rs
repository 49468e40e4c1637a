//! Service status for operators.
use axum::{extract::State, Json};
use serde::Serialize;

use crate::shared_state::{AppState, CounterSnapshot};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: String,
    pub endpoints: Vec<String>,
    pub live_endpoint: Option<String>,
    pub counters: CounterSnapshot,
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let prober = state.llm.prober();
    Json(StatusResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        model: state.config.llm_model.clone(),
        endpoints: prober.endpoints().to_vec(),
        live_endpoint: prober.live_target().get(),
        counters: state.counters.snapshot(),
    })
}
