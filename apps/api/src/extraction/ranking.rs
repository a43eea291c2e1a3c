use std::cmp::Ordering;
use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::Tunables;
use crate::extraction::candidates::CandidatePhrase;
use crate::extraction::normalizer::NormalizedText;
use crate::lexicon::{KeywordCategory, Lexicon};

/// Hard cap on the keyword set.
pub const MAX_KEYWORDS: usize = 30;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Weights for the three score components.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub term_frequency: f64,
    pub section_proximity: f64,
    pub specificity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            term_frequency: 0.4,
            section_proximity: 0.3,
            specificity: 0.3,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [self.term_frequency, self.section_proximity, self.specificity];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("scoring weights must be finite and non-negative, got {all:?}");
        }
        if all.iter().sum::<f64>() <= 0.0 {
            bail!("at least one scoring weight must be positive");
        }
        Ok(())
    }
}

/// Specificity constants.
const SPECIFICITY_BASE: f64 = 0.5;
const MULTIWORD_BONUS: f64 = 0.25;
const WHITELIST_BONUS: f64 = 0.35;
const GENERIC_NOUN_PENALTY: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedKeyword {
    pub canonical_text: String,
    pub score: f64,
    pub is_whitelisted: bool,
    pub source_positions: BTreeSet<usize>,
    pub category: Option<KeywordCategory>,
    pub length_in_words: usize,
}

impl RankedKeyword {
    pub fn tokens(&self) -> Vec<String> {
        self.canonical_text
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Scores every candidate and returns them in rank order.
pub fn rank_candidates(
    candidates: &[CandidatePhrase],
    text: &NormalizedText,
    lexicon: &Lexicon,
    tunables: &Tunables,
) -> Vec<RankedKeyword> {
    let max_frequency = candidates.iter().map(|c| c.frequency).max().unwrap_or(1).max(1);
    let weights = &tunables.weights;

    let mut ranked: Vec<RankedKeyword> = candidates
        .iter()
        .map(|c| {
            let tf = c.frequency as f64 / max_frequency as f64;
            let proximity = section_proximity(c, text, tunables.proximity_window);
            let specificity = specificity(c, lexicon);
            let score = weights.term_frequency * tf
                + weights.section_proximity * proximity
                + weights.specificity * specificity;

            RankedKeyword {
                canonical_text: c.text.clone(),
                score: round_score(score),
                is_whitelisted: c.is_whitelisted,
                source_positions: c.positions.clone(),
                category: c.category,
                length_in_words: c.length_in_words,
            }
        })
        .collect();

    ranked.sort_by(compare_rank);
    ranked
}

/// Score desc; ties: more tokens, whitelisted, then lexicographic.
pub fn compare_rank(a: &RankedKeyword, b: &RankedKeyword) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.length_in_words.cmp(&a.length_in_words))
        .then_with(|| b.is_whitelisted.cmp(&a.is_whitelisted))
        .then_with(|| a.canonical_text.cmp(&b.canonical_text))
}

/// Best occurrence wins: `1 - d / (window + 1)` for an occurrence `d`
/// segments below a boosting heading, 0 outside any boosted section.
fn section_proximity(candidate: &CandidatePhrase, text: &NormalizedText, window: usize) -> f64 {
    candidate
        .segments
        .iter()
        .filter_map(|&segment| text.boost_distance(segment))
        .filter(|&d| d <= window)
        .map(|d| 1.0 - d as f64 / (window + 1) as f64)
        .fold(0.0, f64::max)
}

fn specificity(candidate: &CandidatePhrase, lexicon: &Lexicon) -> f64 {
    let mut value = SPECIFICITY_BASE;
    if candidate.length_in_words > 1 {
        value += MULTIWORD_BONUS;
    }
    if candidate.is_whitelisted {
        value += WHITELIST_BONUS;
    }
    if candidate.length_in_words == 1 && lexicon.is_generic_noun(&candidate.text) {
        value -= GENERIC_NOUN_PENALTY;
    }
    value.clamp(0.0, 1.0)
}

fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::normalizer::normalize;
    use crate::lexicon::{test_lexicon, tokens};

    fn candidate(text: &str, positions: &[usize], segment: usize) -> CandidatePhrase {
        let mut c = CandidatePhrase::new(tokens(text), positions[0], segment);
        c.positions = positions.iter().copied().collect();
        c.frequency = positions.len();
        c
    }

    fn keyword(text: &str, score: f64, whitelisted: bool) -> RankedKeyword {
        RankedKeyword {
            canonical_text: text.to_string(),
            score,
            is_whitelisted: whitelisted,
            source_positions: BTreeSet::new(),
            category: None,
            length_in_words: text.split_whitespace().count(),
        }
    }

    #[test]
    fn test_default_weights_are_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
        let zero = ScoringWeights {
            term_frequency: 0.0,
            section_proximity: 0.0,
            specificity: 0.0,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_specificity_components() {
        let lexicon = test_lexicon();
        let mut figma = candidate("figma", &[0], 0);
        figma.is_whitelisted = true;
        assert!((specificity(&figma, lexicon) - 0.85).abs() < 1e-9);

        let generic = candidate("design", &[0], 0);
        assert!((specificity(&generic, lexicon) - 0.35).abs() < 1e-9);

        let mut phrase = candidate("usability testing", &[0], 0);
        phrase.is_whitelisted = true;
        assert!((specificity(&phrase, lexicon) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_section_proximity_decays_with_distance() {
        let lexicon = test_lexicon();
        let text = normalize(
            "Intro line\nResponsibilities\nalpha\nbeta\ngamma",
            lexicon,
        );
        let window = 8;
        let outside = candidate("intro", &[0], 0);
        let near = candidate("alpha", &[2], 2);
        let far = candidate("gamma", &[4], 4);
        assert_eq!(section_proximity(&outside, &text, window), 0.0);
        let near_score = section_proximity(&near, &text, window);
        let far_score = section_proximity(&far, &text, window);
        assert!((near_score - (1.0 - 1.0 / 9.0)).abs() < 1e-9);
        assert!(near_score > far_score);
    }

    #[test]
    fn test_rank_order_ties() {
        let mut ranked = vec![
            keyword("beta", 0.5, false),
            keyword("alpha", 0.5, false),
            keyword("gamma", 0.5, true),
            keyword("delta epsilon", 0.5, false),
            keyword("zeta", 0.9, false),
        ];
        ranked.sort_by(compare_rank);
        let order: Vec<_> = ranked.iter().map(|k| k.canonical_text.as_str()).collect();
        assert_eq!(order, vec!["zeta", "delta epsilon", "gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_term_frequency_is_normalized_by_max() {
        let lexicon = test_lexicon();
        let text = normalize("figma figma figma sketch", lexicon);
        let candidates = vec![candidate("figma", &[0, 1, 2], 0), candidate("sketch", &[3], 0)];
        let tunables = Tunables {
            weights: ScoringWeights {
                term_frequency: 1.0,
                section_proximity: 0.0,
                specificity: 0.0,
            },
            ..Tunables::default()
        };
        let ranked = rank_candidates(&candidates, &text, lexicon, &tunables);
        assert_eq!(ranked[0].canonical_text, "figma");
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
        assert!((ranked[1].score - 0.3333).abs() < 1e-9);
    }
}
