//! Title, seed and file-name text helpers

/// Fallback title when nothing usable remains
pub const UNTITLED: &str = "Untitled";

/// Lyric language instruction appended to every lyrics seed
pub const LYRICS_LANGUAGE_INSTRUCTION: &str =
    "Write lyrics in English unless another language is explicitly requested. Keep verses and choruses labeled.";

/// Seed used for idea expansion when the user typed nothing
pub const EMPTY_IDEA_SEED: &str = "Describe a song idea in one sentence.";

/// Lyrics value sent for instrumental requests
pub const INSTRUMENTAL_LYRICS: &str = "[Instrumental]";

/// Form sentinel meaning "let the model decide"
const AUTO_SENTINEL: &str = "Auto";

const DISPLAY_MAX_WORDS: usize = 6;
const DISPLAY_MAX_CHARS: usize = 60;
const FILE_NAME_MAX_CHARS: usize = 60;

/// Strip everything but ASCII letters, digits and whitespace, then collapse whitespace
///
/// ```
/// use ace_orchestrator::text::sanitize_title;
///
/// assert_eq!(sanitize_title("Song!!  Title???"), "Song Title");
/// assert_eq!(sanitize_title("?!?"), "Untitled");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    let cleaned = collapse_whitespace(&kept);
    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned
    }
}

/// Display form of a title: first 6 words, capped at 60 characters plus "…"
pub fn truncate_title(title: &str) -> String {
    let collapsed = collapse_whitespace(title);
    let words = collapsed
        .split(' ')
        .take(DISPLAY_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if words.chars().count() > DISPLAY_MAX_CHARS {
        let head: String = words.chars().take(DISPLAY_MAX_CHARS).collect();
        format!("{}…", head)
    } else if words.is_empty() {
        UNTITLED.to_string()
    } else {
        words
    }
}

/// Append the lyric language instruction unless the seed already carries it
pub fn with_lyrics_instruction(seed: &str) -> String {
    if seed.contains(LYRICS_LANGUAGE_INSTRUCTION) {
        seed.to_string()
    } else {
        format!("{}\n{}", seed, LYRICS_LANGUAGE_INSTRUCTION)
    }
}

/// Request text for the title task
pub fn title_seed(prompt: &str) -> String {
    format!(
        "Generate a short, catchy song title (max 6 words) for this concept: {}",
        prompt
    )
}

/// Map the "Auto" form sentinel (and blanks) to unset
pub fn unset_auto(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(AUTO_SENTINEL))
        .map(str::to_string)
}

/// File name stem for a downloaded track
///
/// Keeps `[A-Za-z0-9 _-]`, falls back when nothing is left, caps at 60 chars.
pub fn sanitize_file_name(title: &str, fallback: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim();
    let chosen = if cleaned.is_empty() { fallback } else { cleaned };
    chosen.chars().take(FILE_NAME_MAX_CHARS).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_punctuation() {
        assert_eq!(sanitize_title("Song!!  Title???"), "Song Title");
        assert_eq!(sanitize_title("  \"Neon\" Dreams\n"), "Neon Dreams");
        assert_eq!(sanitize_title("Café 2049"), "Caf 2049");
    }

    #[test]
    fn test_sanitize_punctuation_only() {
        assert_eq!(sanitize_title("!!! ??? ..."), UNTITLED);
        assert_eq!(sanitize_title(""), UNTITLED);
    }

    #[test]
    fn test_truncate_to_six_words() {
        let title = "one two three four five six seven eight nine ten";
        assert_eq!(truncate_title(title), "one two three four five six");
    }

    #[test]
    fn test_truncate_long_words_capped_with_ellipsis() {
        let word = "abcdefghijklmno"; // 15 chars
        let title = vec![word; 10].join(" ");
        let truncated = truncate_title(&title);

        assert!(truncated.ends_with('…'));
        assert_eq!(truncated.chars().count(), 61);
        assert!(truncated.starts_with(word));
    }

    #[test]
    fn test_truncate_exactly_sixty_chars_untouched() {
        let title = "a".repeat(60);
        assert_eq!(truncate_title(&title), title);
    }

    #[test]
    fn test_truncate_empty_is_untitled() {
        assert_eq!(truncate_title("   "), UNTITLED);
    }

    #[test]
    fn test_lyrics_instruction_appended_once() {
        let once = with_lyrics_instruction("A song about rain");
        let twice = with_lyrics_instruction(&once);

        assert_eq!(once, twice);
        assert_eq!(twice.matches(LYRICS_LANGUAGE_INSTRUCTION).count(), 1);
        assert!(once.starts_with("A song about rain\n"));
    }

    #[test]
    fn test_unset_auto() {
        assert_eq!(unset_auto(Some("Auto")), None);
        assert_eq!(unset_auto(Some("")), None);
        assert_eq!(unset_auto(None), None);
        assert_eq!(unset_auto(Some("C Major")), Some("C Major".to_string()));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Song: Remix!", "id-1"), "My Song Remix");
        assert_eq!(sanitize_file_name("???", "id-1"), "id-1");
        assert_eq!(sanitize_file_name(&"x".repeat(80), "id").len(), 60);
    }
}
