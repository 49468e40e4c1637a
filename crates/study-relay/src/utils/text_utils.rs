//! Text helpers for intent matching and log previews

use std::borrow::Cow;

pub struct TextUtils;

impl TextUtils {
    /// Case-insensitive substring check
    pub fn contains_ignore_case(text: &str, pattern: &str) -> bool {
        if pattern.len() > text.len() {
            return false;
        }
        text.to_lowercase().contains(&pattern.to_lowercase())
    }

    /// Truncate to at most `max_chars` characters, ending in "..." when cut.
    /// Counts characters, not bytes, so it never splits a code point.
    pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
        if text.chars().count() <= max_chars {
            Cow::Borrowed(text)
        } else if max_chars <= 3 {
            Cow::Borrowed("...")
        } else {
            let mut result: String = text.chars().take(max_chars - 3).collect();
            result.push_str("...");
            Cow::Owned(result)
        }
    }
}
