//! Study schedule data model.
//!
//! Schedules come out of LLM prose, so parsing is forgiving: counts may be
//! numbers or numeric strings, topics may be a list or one string, and
//! unknown time-of-day labels fall back to "any".

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_DAYS_NEEDED: u32 = 14;
pub const DEFAULT_HOURS_PER_DAY: u32 = 2;
pub const MAX_DAYS_NEEDED: u32 = 366;
pub const MAX_HOURS_PER_DAY: u32 = 24;
pub const WEEKEND_FOCUSED: &str = "weekend-focused";
pub const DEFAULT_STYLE: &str = "balanced";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    #[default]
    #[serde(other)]
    Any,
}

impl TimeOfDay {
    /// Where the day's cursor starts for a schedule-level preference.
    pub fn cursor_start(&self) -> NaiveTime {
        let hour = match self {
            TimeOfDay::Morning => 8,
            TimeOfDay::Afternoon => 13,
            TimeOfDay::Evening => 18,
            TimeOfDay::Any => 9,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
    }

    /// Fixed band start for a subject-level preference; `None` means "use the
    /// cursor".
    pub fn band_start(&self) -> Option<NaiveTime> {
        let hour = match self {
            TimeOfDay::Morning => 9,
            TimeOfDay::Afternoon => 13,
            TimeOfDay::Evening => 17,
            TimeOfDay::Any => return None,
        };
        NaiveTime::from_hms_opt(hour, 0, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySchedule {
    #[serde(default)]
    pub exam_name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_days: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub daily_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time_of_day: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_breaks: Option<bool>,
    pub schedule: Vec<SubjectPlan>,
}

impl StudySchedule {
    pub fn time_of_day(&self) -> TimeOfDay {
        self.preferred_time_of_day.unwrap_or_default()
    }

    pub fn style(&self) -> &str {
        self.scheduling_style.as_deref().unwrap_or(DEFAULT_STYLE)
    }

    pub fn skips_weekends(&self) -> bool {
        self.style() != WEEKEND_FOCUSED
    }

    /// Breaks are on unless the schedule says otherwise.
    pub fn breaks_enabled(&self) -> bool {
        self.include_breaks.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPlan {
    #[serde(default)]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub hours_per_day: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub days_needed: Option<u32>,
    #[serde(default, deserialize_with = "lenient_topics")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl SubjectPlan {
    /// Number of study days, capped at a year.
    pub fn sessions(&self) -> u32 {
        self.days_needed.unwrap_or(DEFAULT_DAYS_NEEDED).min(MAX_DAYS_NEEDED)
    }

    /// Hours per session, capped at one day.
    pub fn hours(&self) -> u32 {
        self.hours_per_day.unwrap_or(DEFAULT_HOURS_PER_DAY).min(MAX_HOURS_PER_DAY)
    }
}

/// One calendar entry ready for a calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
}

/// Integer prefix of a string, like JavaScript's `parseInt`.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Positive whole count, or `None` when the value is missing, zero,
/// negative or not numeric.
fn count_from_value(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn lenient_topics<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_schedule() {
        let schedule: StudySchedule = serde_json::from_str(
            r#"{
                "examName": "NEET",
                "totalDays": 30,
                "dailyHours": 8,
                "preferredTimeOfDay": "morning",
                "schedulingStyle": "intensive",
                "includeBreaks": false,
                "schedule": [{
                    "subject": "Physics",
                    "hoursPerDay": 3,
                    "daysNeeded": 10,
                    "topics": ["Mechanics", "Optics"],
                    "preferredTime": "evening",
                    "difficulty": "hard",
                    "priority": "high"
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(schedule.exam_name, "NEET");
        assert_eq!(schedule.time_of_day(), TimeOfDay::Morning);
        assert!(!schedule.breaks_enabled());
        assert!(schedule.skips_weekends());
        let physics = &schedule.schedule[0];
        assert_eq!(physics.hours(), 3);
        assert_eq!(physics.sessions(), 10);
        assert_eq!(physics.preferred_time, Some(TimeOfDay::Evening));
    }

    #[test]
    fn test_numeric_strings_and_fallbacks() {
        let plan: SubjectPlan = serde_json::from_str(
            r#"{"subject":"Biology","hoursPerDay":"3 hours","daysNeeded":"lots","topics":"Genetics"}"#,
        )
        .unwrap();
        assert_eq!(plan.hours(), 3);
        assert_eq!(plan.sessions(), DEFAULT_DAYS_NEEDED);
        assert_eq!(plan.topics, vec!["Genetics".to_string()]);
    }

    #[test]
    fn test_fractional_zero_and_negative_counts() {
        let plan: SubjectPlan =
            serde_json::from_str(r#"{"subject":"x","hoursPerDay":2.9,"daysNeeded":-4}"#).unwrap();
        assert_eq!(plan.hours(), 2);
        assert_eq!(plan.sessions(), DEFAULT_DAYS_NEEDED);

        let plan: SubjectPlan =
            serde_json::from_str(r#"{"subject":"x","hoursPerDay":0,"daysNeeded":null}"#).unwrap();
        assert_eq!(plan.hours(), DEFAULT_HOURS_PER_DAY);
        assert_eq!(plan.sessions(), DEFAULT_DAYS_NEEDED);
    }

    #[test]
    fn test_huge_counts_are_capped() {
        let plan: SubjectPlan = serde_json::from_str(
            r#"{"subject":"Math","hoursPerDay":4000000000,"daysNeeded":"2000000000"}"#,
        )
        .unwrap();
        assert_eq!(plan.hours(), MAX_HOURS_PER_DAY);
        assert_eq!(plan.sessions(), MAX_DAYS_NEEDED);
    }

    #[test]
    fn test_unknown_time_of_day_is_any() {
        let schedule: StudySchedule =
            serde_json::from_str(r#"{"preferredTimeOfDay":"night","schedule":[]}"#).unwrap();
        assert_eq!(schedule.time_of_day(), TimeOfDay::Any);
        assert_eq!(schedule.exam_name, "");
        assert_eq!(schedule.style(), DEFAULT_STYLE);
        assert!(schedule.breaks_enabled());
    }

    #[test]
    fn test_schedule_list_is_required() {
        assert!(serde_json::from_str::<StudySchedule>(r#"{"examName":"JEE"}"#).is_err());
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("  42abc"), Some(42));
        assert_eq!(parse_int_prefix("-7"), Some(-7));
        assert_eq!(parse_int_prefix("2.5"), Some(2));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let start = "2026-10-16T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let event = CalendarEvent {
            summary: "Study: Physics".to_string(),
            description: "d".to_string(),
            start_time: start,
            end_time: start + chrono::Duration::hours(2),
            recurrence: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["startTime"], "2026-10-16T09:00:00Z");
        assert_eq!(json["endTime"], "2026-10-16T11:00:00Z");
        assert!(json.get("recurrence").is_none());
    }
}
