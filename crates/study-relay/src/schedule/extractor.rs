//! Pulls a study schedule out of a finished assistant message.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::model::StudySchedule;

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"(?s)```json\s*(.*?)```").unwrap();
}

/// Best-effort schedule lookup.
///
/// A structured `side_channel` wins when it parses. Otherwise each
/// ```` ```json ```` block in `text` is tried in order. Returns `None` when
/// nothing usable is found; that is not an error, the prose reply still
/// stands on its own.
pub fn extract_schedule(text: &str, side_channel: Option<&Value>) -> Option<StudySchedule> {
    if let Some(value) = side_channel.filter(|v| !v.is_null()) {
        match serde_json::from_value::<StudySchedule>(value.clone()) {
            Ok(schedule) => {
                debug!("Using structured schedule data for '{}'", schedule.exam_name);
                return Some(schedule);
            }
            Err(e) => debug!("Structured schedule data unusable ({}), scanning text", e),
        }
    }

    for (index, captures) in JSON_FENCE.captures_iter(text).enumerate() {
        let body = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        match serde_json::from_str::<StudySchedule>(body.trim()) {
            Ok(schedule) => {
                debug!(
                    "Extracted schedule '{}' from fenced block #{} ({} subjects)",
                    schedule.exam_name,
                    index + 1,
                    schedule.schedule.len()
                );
                return Some(schedule);
            }
            Err(e) => debug!("Fenced block #{} is not a schedule: {}", index + 1, e),
        }
    }

    debug!("No schedule found in {} chars of text", text.len());
    None
}
