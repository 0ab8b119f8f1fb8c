// src/ocr_rank.rs

use crate::catalog::CatalogIndex;
use crate::text_normalize::{normalize_alnum, tokens};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Default size of the shortlist shown for disambiguation.
pub const DEFAULT_SHORTLIST: usize = 30;

/// Tokens shorter than this are stray OCR characters.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 3;

/// Score for the whole OCR line appearing inside a product name.
const FULL_TEXT_BONUS: u32 = 3;

/// Ranking knobs, usually taken from `[matching]` in the config file.
#[derive(Debug, Clone, Copy)]
pub struct RankOptions {
    pub shortlist: usize,
    pub min_token_len: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            shortlist: DEFAULT_SHORTLIST,
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
        }
    }
}

/// A product proposed for an OCR transcription. Never auto-selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub name: String,
    pub brand: Option<String>,
    pub code_value: String,
    pub score: u32,
}

/// Rank catalog products against free-form OCR text by token overlap.
///
/// Sorted by score (descending), then name. Products scoring zero are left out.
pub fn rank(index: &CatalogIndex, ocr_text: &str, opts: RankOptions) -> Vec<ScoredCandidate> {
    let full = normalize_alnum(ocr_text);
    if full.is_empty() {
        return Vec::new();
    }

    // OCR repeats words when a label wraps or is read twice; one word scores once.
    let mut words = tokens(&full, opts.min_token_len);
    words.sort_unstable();
    words.dedup();

    let mut scored: Vec<(u32, &str, ScoredCandidate)> = index
        .entries()
        .iter()
        .filter_map(|entry| {
            let mut score = 0;
            if entry.name_alnum.contains(&full) {
                score += FULL_TEXT_BONUS;
            }
            score += words.iter().filter(|w| entry.name_alnum.contains(**w)).count() as u32;
            (score > 0).then(|| {
                (
                    score,
                    entry.name_key.as_str(),
                    ScoredCandidate {
                        name: entry.name.clone(),
                        brand: entry.brand.clone(),
                        code_value: entry.code_value.clone(),
                        score,
                    },
                )
            })
        })
        .collect();

    scored.sort_by(|a, b| match b.0.cmp(&a.0) {
        Ordering::Equal => a.1.cmp(b.1).then_with(|| a.2.name.cmp(&b.2.name)),
        other => other,
    });
    scored.truncate(opts.shortlist);

    debug!(tokens = words.len(), candidates = scored.len(), "OCR ranking");
    scored.into_iter().map(|(_, _, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> CatalogIndex {
        CatalogIndex::from_json(
            &json!([
                {"name": "Seringue 10ml", "brand": "BD"},
                {"name": "Gants nitrile L", "sku": "GN-L"},
                {"name": "Gants latex M", "sku": "GL-M-01", "brand": "MEDI"},
                {"name": "Compresse stérile"},
                {"name": "Latex bandes"}
            ])
            .to_string(),
        )
    }

    #[test]
    fn test_token_overlap_ranks_best_first() {
        let ranked = rank(&catalog(), "gants latex medium taille m", RankOptions::default());
        assert_eq!(ranked[0].name, "Gants latex M");
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[0].code_value, "GL-M-01");
        assert_eq!(ranked[0].brand.as_deref(), Some("MEDI"));

        let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Gants latex M", "Gants nitrile L", "Latex bandes"]);
    }

    #[test]
    fn test_full_text_bonus() {
        let ranked = rank(&catalog(), "GANTS-LATEX", RankOptions::default());
        assert_eq!(ranked[0].name, "Gants latex M");
        assert_eq!(ranked[0].score, 3 + 2);
    }

    #[test]
    fn test_short_tokens_ignored() {
        // "m" and "10" are below the minimum token length
        let ranked = rank(&catalog(), "m 10", RankOptions::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_tie_break_by_name() {
        let ranked = rank(&catalog(), "gants", RankOptions::default());
        let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Gants latex M", "Gants nitrile L"]);
        assert!(ranked.iter().all(|c| c.score == 4));
    }

    #[test]
    fn test_accents_and_noise() {
        let ranked = rank(&catalog(), "**COMPRESSE  STERILE**", RankOptions::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "Compresse stérile");
    }

    #[test]
    fn test_repeated_tokens_count_once() {
        let ranked = rank(&catalog(), "latex latex latex", RankOptions::default());
        assert!(ranked.iter().all(|c| c.score == 1));
    }

    #[test]
    fn test_shortlist_cap_and_empty() {
        let opts = RankOptions {
            shortlist: 1,
            ..RankOptions::default()
        };
        assert_eq!(rank(&catalog(), "gants", opts).len(), 1);
        assert!(rank(&catalog(), "  ...  ", RankOptions::default()).is_empty());
        assert!(rank(&catalog(), "tournevis", RankOptions::default()).is_empty());
    }
}
