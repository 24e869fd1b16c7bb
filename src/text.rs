//! Text utilities shared by the detectors: normalization, tokenization,
//! Levenshtein distance and paraphrase-tolerant phrase matching.

use regex::Regex;
use std::sync::OnceLock;

/// Number of characters inspected before a match by [`has_negation_before`]
pub const NEGATION_WINDOW_CHARS: usize = 60;

const NEGATION_WORDS: &[&str] = &["not", "no", "never", "none"];

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{P}$+<>=^`|~]").expect("static punctuation regex"))
}

/// Lower-case, straighten curly quotes, turn punctuation into spaces,
/// collapse whitespace and trim.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => '\'',
            other => other,
        })
        .collect();
    let spaced = punctuation_re().replace_all(&lowered, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize then split on whitespace
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Levenshtein distance over Unicode scalar values (single-row DP).
pub fn edit_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (row[j] + 1).min(row[j + 1] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

/// Default per-token tolerance: a quarter of the length, at least one edit.
fn token_tolerance(token: &str) -> usize {
    (token.chars().count() / 4).max(1)
}

/// True when `phrase` occurs in `text`, tolerating paraphrase.
///
/// Tiers, cheapest first: exact word-bounded match on normalized text; any
/// token window of the phrase's length within `max_distance` edits of the
/// phrase; any single phrase token within its own tolerance of a text token.
/// `max_distance` defaults to a quarter of the normalized phrase length.
pub fn fuzzy_contains(text: &str, phrase: &str, max_distance: Option<usize>) -> bool {
    let normalized_phrase = normalize(phrase);
    if normalized_phrase.is_empty() {
        return false;
    }
    let normalized_text = normalize(text);

    let padded_text = format!(" {} ", normalized_text);
    if padded_text.contains(&format!(" {} ", normalized_phrase)) {
        return true;
    }

    let text_tokens: Vec<&str> = normalized_text.split_whitespace().collect();
    let phrase_tokens: Vec<&str> = normalized_phrase.split_whitespace().collect();
    let window = phrase_tokens.len().max(1);
    let threshold = max_distance.unwrap_or_else(|| token_tolerance(&normalized_phrase));

    if text_tokens.len() >= window {
        for slice in text_tokens.windows(window) {
            if edit_distance(&slice.join(" "), &normalized_phrase) <= threshold {
                return true;
            }
        }
    }

    phrase_tokens.iter().any(|pt| {
        let tolerance = token_tolerance(pt);
        text_tokens
            .iter()
            .any(|tt| edit_distance(pt, tt) <= tolerance)
    })
}

/// Phrases from `phrases` that [`fuzzy_contains`] finds in `text`, in input order.
pub fn fuzzy_contains_any<'a, S: AsRef<str>>(text: &str, phrases: &'a [S]) -> Vec<&'a str> {
    phrases
        .iter()
        .map(|p: &'a S| -> &'a str { p.as_ref() })
        .filter(|p| !p.is_empty() && fuzzy_contains(text, p, None))
        .collect()
}

/// True when a negation word occurs in the 60 characters before byte offset `index`.
///
/// Contractions are recognized after normalization splits them (`don't` -> `don t`).
pub fn has_negation_before(text: &str, index: usize) -> bool {
    let end = floor_char_boundary(text, index);
    let prefix = &text[..end];
    let start = prefix
        .char_indices()
        .rev()
        .nth(NEGATION_WINDOW_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let window = normalize(&prefix[start..]);
    let tokens: Vec<&str> = window.split_whitespace().collect();

    tokens.iter().any(|t| NEGATION_WORDS.contains(t))
        || tokens
            .windows(2)
            .any(|pair| pair[1] == "t" && pair[0].ends_with('n'))
}

/// Largest char boundary at or below `index`
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Byte range covering up to `before` characters before byte offset `start`
/// and `after` characters from it.
pub fn char_window(text: &str, start: usize, before: usize, after: usize) -> (usize, usize) {
    let start = floor_char_boundary(text, start);
    let lo = match before {
        0 => start,
        n => text[..start]
            .char_indices()
            .rev()
            .nth(n - 1)
            .map(|(i, _)| i)
            .unwrap_or(0),
    };
    let hi = text[start..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len());
    (lo, hi)
}

/// Slice of `text` spanning up to `before` characters before `start` and
/// `after` characters from it.
pub fn window_around(text: &str, start: usize, before: usize, after: usize) -> &str {
    let (lo, hi) = char_window(text, start, before, after);
    &text[lo..hi]
}

/// Character span of a byte range, formatted as an issue location
pub fn char_span(text: &str, start: usize, end: usize) -> String {
    let start_char = text[..floor_char_boundary(text, start)].chars().count();
    let end_char = text[..floor_char_boundary(text, end)].chars().count();
    format!("{}..{}", start_char, end_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Hello,   WORLD!  "), "hello world");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\u{201C}Quoted\u{201D} text"), "quoted text");
    }

    #[test]
    fn test_normalize_symbols_become_spaces() {
        assert_eq!(normalize("a+b=c"), "a b c");
        assert_eq!(normalize("that's 10%"), "that s 10");
    }

    #[test]
    fn test_tokenize_drops_empty_tokens() {
        assert_eq!(tokenize("  one, two;; three  "), vec!["one", "two", "three"]);
        assert!(tokenize("...").is_empty());
    }

    #[test]
    fn test_edit_distance_known_values() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn test_edit_distance_counts_chars_not_bytes() {
        assert_eq!(edit_distance("café", "cafe"), 1);
    }

    #[test]
    fn test_fuzzy_contains_exact() {
        assert!(fuzzy_contains("Studies show it works", "studies show", None));
    }

    #[test]
    fn test_fuzzy_contains_paraphrase_window() {
        assert!(fuzzy_contains(
            "The company grew 10 percent",
            "grew ten percent",
            None
        ));
    }

    #[test]
    fn test_fuzzy_contains_token_fallback() {
        assert!(fuzzy_contains("they were obviosly wrong", "obviously", None));
    }

    #[test]
    fn test_fuzzy_contains_rejects_unrelated() {
        assert!(!fuzzy_contains("The weather is pleasant", "terrorists", None));
        assert!(!fuzzy_contains("anything", "", None));
        assert!(!fuzzy_contains("", "criminals", None));
    }

    #[test]
    fn test_fuzzy_contains_explicit_distance() {
        // Window tier with zero tolerance; token tier still applies its own tolerance
        assert!(!fuzzy_contains(
            "alpha beta gamma",
            "zzzzzzzz yyyyyyyy",
            Some(0)
        ));
    }

    #[test]
    fn test_fuzzy_contains_any_preserves_order() {
        let phrases = ["subhuman", "", "obviously", "parasites"];
        let found = fuzzy_contains_any("Obviously they are parasites", &phrases);
        assert_eq!(found, vec!["obviously", "parasites"]);
    }

    #[test]
    fn test_has_negation_before() {
        let text = "This is not guaranteed to work";
        let idx = text.find("guaranteed").unwrap();
        assert!(has_negation_before(text, idx));

        let text = "This is guaranteed to work";
        let idx = text.find("guaranteed").unwrap();
        assert!(!has_negation_before(text, idx));
    }

    #[test]
    fn test_has_negation_before_contraction() {
        let text = "It isn't certainly true";
        let idx = text.find("certainly").unwrap();
        assert!(has_negation_before(text, idx));
    }

    #[test]
    fn test_has_negation_window_is_bounded() {
        let text = format!("not {} guaranteed", "x".repeat(80));
        let idx = text.find("guaranteed").unwrap();
        assert!(!has_negation_before(&text, idx));
    }

    #[test]
    fn test_window_around_respects_char_boundaries() {
        let text = "ééééé 42 ééééé";
        let idx = text.find("42").unwrap();
        assert_eq!(window_around(text, idx, 3, 5), "éé 42 éé");
    }

    #[test]
    fn test_char_window_counts_characters() {
        let text = "日本語のテキスト 42";
        let idx = text.find("42").unwrap();
        let (lo, hi) = char_window(text, idx, 4, 10);
        assert_eq!(&text[lo..hi], "キスト 42");
        assert_eq!(char_window(text, 0, 5, 0), (0, 0));
        assert_eq!(char_window("", 0, 3, 3), (0, 0));
    }

    #[test]
    fn test_char_span() {
        assert_eq!(char_span("é 42", 3, 5), "2..4");
    }
}
