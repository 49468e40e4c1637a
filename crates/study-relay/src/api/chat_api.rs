// Non-streaming chat: one completion per request, with scheduling requests
// routed to the schedule generator and expanded into calendar events.
use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use chrono::Local;
use serde::Serialize;
use tracing::{error, info};

use crate::api::stream_api::StreamChatRequest;
use crate::metrics;
use crate::schedule::{
    detect_exam_name, detect_scheduling_intent, format_for_calendar, generate_study_schedule,
    render_schedule_summary, CalendarEvent, StudySchedule,
};
use crate::schedule::generator::{DEFAULT_DAILY_HOURS, DEFAULT_TOTAL_DAYS};
use crate::shared_state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,
    pub text: String,
    pub is_scheduling_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_data: Option<StudySchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<CalendarEvent>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

/// POST /api/llm
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<StreamChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request_num = state.counters.inc_total_requests();
    info!("Chat request #{} (message length: {} chars)", request_num, req.message.len());

    if req.message.trim().is_empty() && req.conversation_history.is_empty() {
        metrics::inc_request("llm", "bad_request");
        return Err(api_error(StatusCode::BAD_REQUEST, "Message cannot be empty"));
    }

    let id = uuid::Uuid::new_v4().to_string();

    if detect_scheduling_intent(&req.message) {
        let exam = detect_exam_name(&req.message);
        info!("Chat request #{}: scheduling intent detected for {}", request_num, exam);

        let generated =
            generate_study_schedule(&state.llm, exam, DEFAULT_TOTAL_DAYS, DEFAULT_DAILY_HOURS).await;
        let events = format_for_calendar(&generated.schedule, &Local::now());
        state.counters.inc_schedules_extracted();
        metrics::inc_request("llm", "schedule");

        return Ok(Json(ChatResponse {
            id,
            text: render_schedule_summary(&generated.schedule),
            is_scheduling_request: true,
            schedule_data: Some(generated.schedule),
            events: Some(events),
        }));
    }

    let messages = state.llm.frame(&req.message, &req.conversation_history);
    match state.llm.complete(messages, state.llm.chat_options()).await {
        Ok(text) => {
            metrics::inc_request("llm", "ok");
            Ok(Json(ChatResponse {
                id,
                text,
                is_scheduling_request: false,
                schedule_data: None,
                events: None,
            }))
        }
        Err(e) => {
            error!("Chat request #{} failed: {}", request_num, e);
            metrics::inc_request("llm", "upstream_error");
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}
