// src/text_normalize.rs

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fold scanned, typed or catalog text into a comparable form.
///
/// Lowercases, decomposes (NFD) and drops combining marks so that "é" and "e"
/// compare equal, then trims and collapses whitespace runs to single spaces.
pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Like [`normalize`], but every non-alphanumeric character becomes a space.
///
/// Used for OCR matching where punctuation in the transcription is noise.
pub fn normalize_alnum(raw: &str) -> String {
    let stripped: String = normalize(raw)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace tokens of at least `min_len` characters.
pub fn tokens(text: &str, min_len: usize) -> Vec<&str> {
    text.split_whitespace()
        .filter(|t| t.chars().count() >= min_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_case() {
        assert_eq!(normalize("Crème Brûlée"), "creme brulee");
        assert_eq!(normalize("ÉPONGE"), "eponge");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  Gants \t latex\n\nM  "), "gants latex m");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
        assert_eq!(normalize_alnum(" -- "), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Gants latex M",
            "  Çà   et là ",
            "İstanbul",
            "e\u{301}\u{301} x",
            "ﬁ ligature ß",
            "GL-M-01 / lot#4",
            "\u{301} lone mark",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "normalize not idempotent for {s:?}");
            let once = normalize_alnum(s);
            assert_eq!(normalize_alnum(&once), once, "normalize_alnum not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_alnum_replaces_punctuation() {
        assert_eq!(normalize_alnum("Gants-latex (M), boîte:100"), "gants latex m boite 100");
        // the plain variant keeps punctuation for exact code lookups
        assert_eq!(normalize("GL-M-01"), "gl-m-01");
    }

    #[test]
    fn test_tokens_min_len() {
        let text = normalize_alnum("gants latex m x taille");
        assert_eq!(tokens(&text, 3), vec!["gants", "latex", "taille"]);
        assert_eq!(tokens("été ab", 3), vec!["été"]);
    }
}
