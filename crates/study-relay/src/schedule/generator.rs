//! Study schedule generation via the LLM, with a template fallback so a
//! scheduling request always gets a usable plan.

use std::fmt::Write as _;

use tracing::{info, warn};

use crate::llm::{LlmClient, WireMessage};

use super::extractor::extract_schedule;
use super::model::{StudySchedule, SubjectPlan, TimeOfDay};

pub const DEFAULT_TOTAL_DAYS: u32 = 14;
pub const DEFAULT_DAILY_HOURS: u32 = 8;

/// Where a generated schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOrigin {
    Llm,
    Template,
}

pub struct GeneratedSchedule {
    pub schedule: StudySchedule,
    pub origin: ScheduleOrigin,
}

fn schedule_prompt(exam_name: &str, total_days: u32, daily_hours: u32) -> String {
    format!(
        "Create a detailed study schedule for {exam} exam preparation.\n\
         - Total days available: {days}\n\
         - Study hours per day: {hours}\n\
         - Focus on the core subjects typically covered in {exam}\n\n\
         Reply with a short introduction followed by a single ```json code block containing an object with \
         the fields examName, totalDays, dailyHours, preferredTimeOfDay (morning|afternoon|evening), \
         schedulingStyle, includeBreaks and schedule. schedule is a list of objects with subject, \
         hoursPerDay, daysNeeded, topics (list of strings), preferredTime, difficulty and priority.",
        exam = exam_name,
        days = total_days,
        hours = daily_hours,
    )
}

/// Ask the LLM for a schedule; fall back to the template when the LLM is
/// unreachable or its reply carries no parseable schedule.
pub async fn generate_study_schedule(
    llm: &LlmClient,
    exam_name: &str,
    total_days: u32,
    daily_hours: u32,
) -> GeneratedSchedule {
    let messages = vec![WireMessage {
        role: "user".to_string(),
        content: schedule_prompt(exam_name, total_days, daily_hours),
    }];

    match llm.complete(messages, llm.schedule_options()).await {
        Ok(text) => match extract_schedule(&text, None) {
            Some(schedule) if !schedule.schedule.is_empty() => {
                info!("LLM generated schedule for {} ({} subjects)", exam_name, schedule.schedule.len());
                return GeneratedSchedule { schedule, origin: ScheduleOrigin::Llm };
            }
            _ => warn!("LLM reply for {} had no usable schedule, using template", exam_name),
        },
        Err(e) => warn!("Schedule generation failed ({}), using template", e),
    }

    GeneratedSchedule {
        schedule: template_schedule(exam_name, total_days, daily_hours),
        origin: ScheduleOrigin::Template,
    }
}

fn subject(name: &str, hours: u32, days: u32, topics: &[&str], time: TimeOfDay) -> SubjectPlan {
    SubjectPlan {
        subject: name.to_string(),
        hours_per_day: Some(hours.max(1)),
        days_needed: Some(days.max(1)),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        preferred_time: Some(time),
        difficulty: None,
        priority: None,
    }
}

/// Fixed plan used when the LLM cannot produce one.
pub fn template_schedule(exam_name: &str, total_days: u32, daily_hours: u32) -> StudySchedule {
    let schedule = if exam_name.eq_ignore_ascii_case("neet") {
        vec![
            subject("Physics", 3, total_days, &["Mechanics", "Thermodynamics", "Electromagnetism", "Optics"], TimeOfDay::Morning),
            subject("Chemistry", 3, total_days, &["Organic Chemistry", "Inorganic Chemistry", "Physical Chemistry"], TimeOfDay::Afternoon),
            subject("Biology", 2, total_days, &["Human Physiology", "Plant Biology", "Genetics", "Evolution"], TimeOfDay::Evening),
        ]
    } else {
        let third = daily_hours / 3;
        vec![
            subject("Core Subject 1", third, total_days, &["Fundamental concepts", "Practice problems"], TimeOfDay::Morning),
            subject("Core Subject 2", third, total_days, &["Key topics", "Review sessions"], TimeOfDay::Afternoon),
            subject("Review & Practice", daily_hours.saturating_sub(2 * third), total_days, &["Mock tests", "Revision"], TimeOfDay::Evening),
        ]
    };

    StudySchedule {
        exam_name: exam_name.to_string(),
        total_days: Some(total_days),
        daily_hours: Some(daily_hours),
        preferred_time_of_day: None,
        scheduling_style: None,
        include_breaks: Some(true),
        schedule,
    }
}

/// Markdown summary of a schedule for the chat reply.
pub fn render_schedule_summary(schedule: &StudySchedule) -> String {
    let mut out = format!(
        "I'll help you create a {exam} study schedule for the next {days} days:\n\n## {exam} Study Schedule\n\n",
        exam = schedule.exam_name,
        days = schedule.total_days.unwrap_or(DEFAULT_TOTAL_DAYS),
    );
    if let Some(hours) = schedule.daily_hours {
        let _ = writeln!(out, "**Daily Study Hours:** {} hours\n", hours);
    }
    out.push_str("### Subject Breakdown:\n");

    for plan in &schedule.schedule {
        let _ = writeln!(out, "**{}** ({} hours/day)", plan.subject, plan.hours());
        if let Some(time) = plan.preferred_time.filter(|t| *t != TimeOfDay::Any) {
            let _ = writeln!(out, "- Time: {:?}", time);
        }
        if !plan.topics.is_empty() {
            let _ = writeln!(out, "- Topics: {}", plan.topics.join(", "));
        }
        out.push('\n');
    }

    out.push_str(
        "This schedule provides a balanced approach to cover all major topics. \
         Would you like me to add these study sessions to your calendar?",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::create_test_config;

    fn unreachable_client() -> LlmClient {
        let mut config = create_test_config();
        config.llm_endpoints = vec!["http://127.0.0.1:1".to_string()];
        LlmClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_neet_template() {
        let schedule = template_schedule("NEET", 14, 8);
        let subjects: Vec<&str> = schedule.schedule.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Physics", "Chemistry", "Biology"]);
        assert!(schedule.schedule.iter().all(|s| s.sessions() == 14));
    }

    #[test]
    fn test_generic_template_splits_hours() {
        let schedule = template_schedule("GATE", 10, 8);
        let hours: Vec<u32> = schedule.schedule.iter().map(|s| s.hours()).collect();
        assert_eq!(hours, vec![2, 2, 4]);
    }

    #[test]
    fn test_generic_template_never_zero_hours() {
        let schedule = template_schedule("CAT", 5, 2);
        assert!(schedule.schedule.iter().all(|s| s.hours() >= 1));
    }

    #[test]
    fn test_summary_mentions_subjects() {
        let summary = render_schedule_summary(&template_schedule("NEET", 14, 8));
        assert!(summary.contains("## NEET Study Schedule"));
        assert!(summary.contains("**Physics** (3 hours/day)"));
        assert!(summary.contains("- Topics: Mechanics, Thermodynamics, Electromagnetism, Optics"));
    }

    #[tokio::test]
    async fn test_falls_back_when_llm_unreachable() {
        let generated = generate_study_schedule(&unreachable_client(), "JEE", 14, 6).await;
        assert_eq!(generated.origin, ScheduleOrigin::Template);
        assert_eq!(generated.schedule.exam_name, "JEE");
    }

    #[tokio::test]
    async fn test_uses_llm_schedule_when_present() {
        let mut server = mockito::Server::new_async().await;
        let reply = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content":
                "Plan below\n```json\n{\"examName\":\"JEE\",\"schedule\":[{\"subject\":\"Math\",\"hoursPerDay\":4,\"daysNeeded\":7}]}\n```"
            }}]
        });
        server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "max_tokens": 1000 })))
            .with_status(200)
            .with_body(reply.to_string())
            .create_async()
            .await;

        let mut config = create_test_config();
        config.llm_endpoints = vec![server.url()];
        let client = LlmClient::from_config(&config).unwrap();

        let generated = generate_study_schedule(&client, "JEE", 14, 6).await;
        assert_eq!(generated.origin, ScheduleOrigin::Llm);
        assert_eq!(generated.schedule.schedule[0].subject, "Math");
        assert_eq!(generated.schedule.schedule[0].sessions(), 7);
    }
}
