//! Step text preparation for speech.
//!
//! Pure functions, no I/O. Models sometimes slip formatting into "plain"
//! steps; none of it should be read aloud.

use regex::Regex;
use std::sync::LazyLock;

// Compiled regexes — allocated once, reused across calls.
static RE_INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static RE_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static RE_LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").unwrap());
static RE_STEP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^step\s+\d+\s*[:.)-]\s*").unwrap());
static RE_MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip list markers, "Step N:" prefixes and markdown emphasis so a step
/// reads naturally when spoken.
///
/// Falls back to the trimmed input if cleaning would leave nothing.
pub fn prepare_for_speech(step: &str) -> String {
    let mut c = step.trim().to_string();

    c = RE_LIST_MARKER.replace(&c, "").into_owned();
    c = RE_STEP_PREFIX.replace(&c, "").into_owned();
    c = RE_LINK.replace_all(&c, "$1").into_owned();
    c = RE_INLINE_CODE.replace_all(&c, "$1").into_owned();
    c = RE_BOLD.replace_all(&c, "$1").into_owned();
    c = RE_ITALIC.replace_all(&c, "$1").into_owned();
    c = RE_MULTI_SPACE.replace_all(&c, " ").into_owned();

    let c = c.trim();
    if c.chars().any(|ch| ch.is_alphanumeric()) {
        c.to_string()
    } else {
        step.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_step_unchanged() {
        assert_eq!(prepare_for_speech("Crack eggs into a bowl."), "Crack eggs into a bowl.");
    }

    #[test]
    fn strips_numbering() {
        assert_eq!(prepare_for_speech("1. Crack eggs"), "Crack eggs");
        assert_eq!(prepare_for_speech("12) Serve hot"), "Serve hot");
    }

    #[test]
    fn strips_bullets() {
        assert_eq!(prepare_for_speech("- Whisk"), "Whisk");
        assert_eq!(prepare_for_speech("• Whisk"), "Whisk");
    }

    #[test]
    fn strips_step_prefix() {
        assert_eq!(prepare_for_speech("Step 3: Cook for two minutes"), "Cook for two minutes");
        assert_eq!(prepare_for_speech("step 1 - Preheat"), "Preheat");
    }

    #[test]
    fn strips_emphasis() {
        assert_eq!(
            prepare_for_speech("Cook on **low** heat, *stirring* often"),
            "Cook on low heat, stirring often"
        );
    }

    #[test]
    fn keeps_underscores_in_words() {
        assert_eq!(
            prepare_for_speech("Season the sous_vide bag and the snake_case_name"),
            "Season the sous_vide bag and the snake_case_name"
        );
    }

    #[test]
    fn strips_links_and_code() {
        assert_eq!(
            prepare_for_speech("See [the guide](https://example.com) and use `medium` heat"),
            "See the guide and use medium heat"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(prepare_for_speech("  Add   salt \n and pepper "), "Add salt and pepper");
    }

    #[test]
    fn keeps_numbers_inside_text() {
        assert_eq!(prepare_for_speech("Bake at 180 degrees for 20 minutes"), "Bake at 180 degrees for 20 minutes");
    }

    #[test]
    fn falls_back_when_nothing_speakable_remains() {
        assert_eq!(prepare_for_speech(" ** "), "**");
    }
}
