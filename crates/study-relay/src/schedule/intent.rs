//! Keyword heuristics for spotting scheduling requests.

use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::TextUtils;

const SCHEDULING_KEYWORDS: &[&str] = &[
    "schedule", "calendar", "plan", "timetable", "agenda", "itinerary",
    "studying", "study plan", "routine", "prepare", "exam", "test", "neet",
    "preparation", "organize", "set up", "reminder",
];

pub const DEFAULT_EXAM: &str = "NEET";

lazy_static! {
    static ref EXAM_NAMES: Vec<(&'static str, Regex)> = ["JEE", "CAT", "GATE"]
        .iter()
        .map(|name| (*name, Regex::new(&format!(r"(?i)\b{}\b", name)).unwrap()))
        .collect();
}

/// Does the message look like a request for a study plan or calendar entry?
pub fn detect_scheduling_intent(message: &str) -> bool {
    SCHEDULING_KEYWORDS
        .iter()
        .any(|keyword| TextUtils::contains_ignore_case(message, keyword))
}

/// Exam the user is talking about; NEET unless another one is named.
pub fn detect_exam_name(message: &str) -> &'static str {
    EXAM_NAMES
        .iter()
        .find(|(_, pattern)| pattern.is_match(message))
        .map(|(name, _)| *name)
        .unwrap_or(DEFAULT_EXAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_messages() {
        for message in [
            "Can you make me a study plan?",
            "Add this to my CALENDAR",
            "I need to prepare for NEET",
            "set up a reminder for tomorrow",
        ] {
            assert!(detect_scheduling_intent(message), "{}", message);
        }
    }

    #[test]
    fn test_plain_chat() {
        for message in ["Hello there", "What is photosynthesis?", ""] {
            assert!(!detect_scheduling_intent(message), "{}", message);
        }
    }

    #[test]
    fn test_exam_names() {
        assert_eq!(detect_exam_name("help me with jee advanced"), "JEE");
        assert_eq!(detect_exam_name("GATE 2027 prep"), "GATE");
        assert_eq!(detect_exam_name("my CAT exam"), "CAT");
        assert_eq!(detect_exam_name("an education plan"), DEFAULT_EXAM);
        assert_eq!(detect_exam_name("study schedule"), DEFAULT_EXAM);
    }
}
