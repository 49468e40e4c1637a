//! Streaming chat endpoint.
//!
//! Flow: client POST → framer → prober picks a live LLM → relay re-frames the
//! provider's SSE into `{content}` / `{error}` / `[DONE]` records. Headers are
//! committed before the upstream is contacted, so every failure after that
//! point travels in-band and the stream always ends with `[DONE]`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::llm::{ChatMessage, RelayEvent, Transcript};
use crate::metrics;
use crate::schedule::extract_schedule;
use crate::shared_state::{AppState, AtomicCounters};
use crate::utils::TextUtils;

/// Request body matching what the chat UI sends
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

/// Tracks one open relay. Dropping it before `finish` means the client went
/// away mid-stream; the upstream body was dropped along with the stream.
struct StreamGuard {
    request_num: usize,
    counters: Arc<AtomicCounters>,
    finished: bool,
}

impl StreamGuard {
    fn open(request_num: usize, counters: Arc<AtomicCounters>) -> Self {
        counters.stream_opened();
        metrics::inc_streams();
        Self { request_num, counters, finished: false }
    }

    fn finish(mut self, transcript: &Transcript) {
        self.finished = true;
        let ok = transcript.error().is_none();
        self.counters.stream_closed(ok);
        metrics::dec_streams();
        metrics::inc_request("llm_stream", if ok { "ok" } else { "error" });
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if !self.finished {
            info!("Stream #{}: client disconnected, upstream released", self.request_num);
            self.counters.stream_closed(false);
            metrics::dec_streams();
            metrics::inc_request("llm_stream", "cancelled");
        }
    }
}

fn sse_event(event: &RelayEvent) -> Result<Event, Infallible> {
    Ok(Event::default().data(event.to_data()))
}

/// POST /api/llm/stream
pub async fn generate_stream(
    State(state): State<AppState>,
    Json(req): Json<StreamChatRequest>,
) -> Response {
    let request_num = state.counters.inc_total_requests();
    info!(
        "Stream request #{}: \"{}\" ({} history messages)",
        request_num,
        TextUtils::truncate_with_ellipsis(&req.message, 60),
        req.conversation_history.len()
    );

    if req.message.trim().is_empty() && req.conversation_history.is_empty() {
        metrics::inc_request("llm_stream", "bad_request");
        return (StatusCode::BAD_REQUEST, "Message cannot be empty").into_response();
    }

    let messages = state.llm.frame(&req.message, &req.conversation_history);
    let llm = state.llm.clone();
    let counters = state.counters.clone();

    let output_stream = async_stream::stream! {
        let guard = StreamGuard::open(request_num, counters.clone());
        let mut transcript = Transcript::new();

        match llm.open_stream(messages).await {
            Ok(events) => {
                futures_util::pin_mut!(events);
                while let Some(event) = events.next().await {
                    transcript.push(&event);
                    yield sse_event(&event);
                }
            }
            Err(e) => {
                error!("Stream #{}: {}", request_num, e);
                for event in [RelayEvent::Error(e.to_string()), RelayEvent::Done] {
                    transcript.push(&event);
                    yield sse_event(&event);
                }
            }
        }

        info!(
            "Stream #{} finished: {} tokens, {} chars{}",
            request_num,
            transcript.token_count(),
            transcript.text().len(),
            transcript.error().map(|e| format!(", error: {}", e)).unwrap_or_default()
        );

        if extract_schedule(transcript.text(), None).is_some() {
            let total = counters.inc_schedules_extracted();
            debug!("Stream #{} carried a study schedule ({} so far)", request_num, total);
        }

        guard.finish(&transcript);
    };

    Sse::new(output_stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
