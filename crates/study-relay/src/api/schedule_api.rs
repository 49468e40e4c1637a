//! Schedule endpoints: pull a study schedule out of an assistant reply and
//! expand schedules into calendar events.
//!
//! `startDate` is RFC 3339; its offset is the zone events are laid out in.
//! Without it the server's local zone and the current time are used.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::chat_api::ErrorResponse;
use crate::metrics;
use crate::schedule::{extract_schedule, format_for_calendar, CalendarEvent, StudySchedule};
use crate::shared_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub schedule_data: Option<Value>,
    #[serde(default)]
    pub start_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub schedule: Option<StudySchedule>,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub schedule: StudySchedule,
    #[serde(default)]
    pub start_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub events: Vec<CalendarEvent>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn parse_start_date(raw: Option<&str>) -> Result<Option<DateTime<FixedOffset>>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s).map(Some).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: format!("Invalid startDate '{}': {}", s, e) }),
            )
        }),
    }
}

fn expand(schedule: &StudySchedule, start: Option<DateTime<FixedOffset>>) -> Vec<CalendarEvent> {
    match start {
        Some(start) => format_for_calendar(schedule, &start),
        None => format_for_calendar(schedule, &Local::now()),
    }
}

/// POST /api/schedule/extract
pub async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let start = parse_start_date(req.start_date.as_deref())?;

    let schedule = extract_schedule(&req.text, req.schedule_data.as_ref());
    let events = match &schedule {
        Some(schedule) => {
            state.counters.inc_schedules_extracted();
            expand(schedule, start)
        }
        None => {
            debug!("No schedule found in {} chars of text", req.text.len());
            Vec::new()
        }
    };

    info!("Schedule extract: found={}, events={}", schedule.is_some(), events.len());
    metrics::inc_request("schedule_extract", if schedule.is_some() { "found" } else { "none" });
    Ok(Json(ExtractResponse { schedule, events }))
}

/// POST /api/calendar/preview
pub async fn preview(Json(req): Json<PreviewRequest>) -> Result<Json<PreviewResponse>, ApiError> {
    let start = parse_start_date(req.start_date.as_deref())?;
    let events = expand(&req.schedule, start);
    metrics::inc_request("calendar_preview", "ok");
    Ok(Json(PreviewResponse { events }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_date() {
        assert!(parse_start_date(None).unwrap().is_none());
        assert!(parse_start_date(Some("  ")).unwrap().is_none());

        let parsed = parse_start_date(Some("2026-10-15T09:00:00+05:30")).unwrap().unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 5 * 3600 + 30 * 60);

        let (status, _) = parse_start_date(Some("next tuesday")).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
