//! Small string helpers shared by the pipeline stages.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-.]+").expect("unsafe chars pattern is valid"));

const SAFE_NAME_MAX: usize = 100;

/// Make a string usable as a file name component.
#[must_use]
pub fn safe_name(s: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(s, "_");
    let clipped: String = replaced.chars().take(SAFE_NAME_MAX).collect();
    clipped.trim_matches(|c| matches!(c, '.' | '_' | '-')).to_string()
}

/// Clip to `max_chars` characters, appending a truncation marker when cut.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}\n... [truncated]", &s[..byte_index]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_replaces_and_trims() {
        assert_eq!(safe_name("BRSET"), "BRSET");
        assert_eq!(safe_name("Celeb A/HQ"), "Celeb_A_HQ");
        assert_eq!(safe_name("..weird name!!"), "weird_name");
        assert_eq!(safe_name(&"x".repeat(150)).len(), 100);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ééééé", 2), "éé\n... [truncated]");
    }
}
