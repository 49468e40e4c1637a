//! Schedule module - study schedules, their extraction from LLM text and
//! their expansion into calendar events

pub mod calendar;
pub mod extractor;
pub mod generator;
pub mod intent;
pub mod model;

pub use calendar::format_for_calendar;
pub use extractor::extract_schedule;
pub use generator::{generate_study_schedule, render_schedule_summary, template_schedule, GeneratedSchedule, ScheduleOrigin};
pub use intent::{detect_exam_name, detect_scheduling_intent};
pub use model::{CalendarEvent, StudySchedule, SubjectPlan, TimeOfDay};
