//! Expands a [`StudySchedule`] into dated calendar events.
//!
//! Dates are computed in the caller's time zone (the zone of `start`) and
//! emitted in UTC. One cursor walks forward through the calendar for the
//! whole schedule, so subjects are laid out one after another.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc, Weekday};
use tracing::{debug, warn};

use super::model::{CalendarEvent, StudySchedule, SubjectPlan};

const BREAK_MINUTES: i64 = 30;
const MAX_EVENTS: usize = 10_000;
const DEFAULT_TOPICS: &str = "General review";

/// Turn `schedule` into events, starting the day after `start`.
///
/// An empty subject list yields no events.
pub fn format_for_calendar<Tz: TimeZone>(
    schedule: &StudySchedule,
    start: &DateTime<Tz>,
) -> Vec<CalendarEvent> {
    if schedule.schedule.is_empty() {
        warn!("Schedule for '{}' has no subjects, nothing to add", schedule.exam_name);
        return Vec::new();
    }

    let tz = start.timezone();
    let Some(mut cursor) = start
        .date_naive()
        .and_time(schedule.time_of_day().cursor_start())
        .checked_add_signed(Duration::days(1))
    else {
        warn!("Start date {} is at the end of the calendar, nothing to add", start.date_naive());
        return Vec::new();
    };

    let skip_weekends = schedule.skips_weekends();
    let include_breaks = schedule.breaks_enabled();

    debug!(
        "Formatting '{}' ({} subjects) from {}, style={}, breaks={}",
        schedule.exam_name,
        schedule.schedule.len(),
        cursor,
        schedule.style(),
        include_breaks
    );

    let mut events = Vec::new();

    for subject in &schedule.schedule {
        let hours = i64::from(subject.hours());
        let mut remaining = subject.sessions();

        while remaining > 0 {
            if events.len() >= MAX_EVENTS {
                return truncated(events);
            }
            if skip_weekends && is_weekend(&cursor) {
                match next_day(cursor) {
                    Some(next) => cursor = next,
                    None => return truncated(events),
                }
                continue;
            }

            let session_start = match subject.preferred_time.and_then(|t| t.band_start()) {
                Some(band) => cursor.date().and_time(band),
                None => cursor,
            };
            let Some(session_end) = session_start.checked_add_signed(Duration::hours(hours)) else {
                return truncated(events);
            };

            events.push(CalendarEvent {
                summary: summary(subject),
                description: description(schedule, subject),
                start_time: to_utc(&tz, session_start),
                end_time: to_utc(&tz, session_end),
                recurrence: None,
            });

            if include_breaks && hours > 1 {
                let Some(break_end) = session_end.checked_add_signed(Duration::minutes(BREAK_MINUTES)) else {
                    return truncated(events);
                };
                events.push(CalendarEvent {
                    summary: "Break".to_string(),
                    description: format!("Rest period after studying {}", subject.subject),
                    start_time: to_utc(&tz, session_end),
                    end_time: to_utc(&tz, break_end),
                    recurrence: None,
                });
            }

            remaining -= 1;
            match next_day(cursor) {
                Some(next) => cursor = next,
                None => return truncated(events),
            }
        }
    }

    debug!("Produced {} calendar events", events.len());
    events
}

fn next_day(cursor: NaiveDateTime) -> Option<NaiveDateTime> {
    cursor.checked_add_signed(Duration::days(1))
}

/// The event cap was hit or the cursor ran off the end of the calendar.
fn truncated(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    warn!("Calendar expansion cut short after {} events", events.len());
    events
}

fn is_weekend(at: &NaiveDateTime) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

fn summary(subject: &SubjectPlan) -> String {
    match subject.difficulty.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(difficulty) => format!("Study: {} ({} difficulty)", subject.subject, difficulty),
        None => format!("Study: {}", subject.subject),
    }
}

fn description(schedule: &StudySchedule, subject: &SubjectPlan) -> String {
    let topics = if subject.topics.is_empty() {
        DEFAULT_TOPICS.to_string()
    } else {
        subject.topics.join(", ")
    };
    let priority = subject
        .priority
        .as_deref()
        .map(|p| format!("({} priority)", p))
        .unwrap_or_default();

    format!(
        "Study session for {exam}:\n\nTopics: {topics}\n{priority}\n\nPart of your {style} study plan for {exam}.",
        exam = schedule.exam_name,
        topics = topics,
        priority = priority,
        style = schedule.style(),
    )
}

/// Resolve a wall-clock time in `tz`. Times that fall into a DST gap are
/// pushed forward an hour.
fn to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            let shifted = local.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}
