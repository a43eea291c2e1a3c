use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Tunables;
use crate::extraction::normalizer::normalize;
use crate::extraction::ranking::RankedKeyword;
use crate::lexicon::{contains_sequence, Lexicon};
use crate::matching::similarity::{phrase_similarity, SimilarityError, SimilarityScorer};

/// Cap on the missing list.
pub const MAX_MISSING: usize = 7;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    Lemma,
    Fuzzy,
    Semantic,
}

/// How (and whether) one keyword was found in the CV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordPresence {
    pub keyword: String,
    pub rule: Option<MatchRule>,
    /// Closest same-length CV window, lemma-normalized.
    pub best_window: Option<String>,
    pub lexical_similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: BTreeSet<String>,
    /// Rank order, at most `MAX_MISSING`.
    pub missing: Vec<String>,
    /// One entry per keyword, in rank order.
    pub presence: Vec<KeywordPresence>,
}

impl MatchResult {
    pub fn from_presence(presence: Vec<KeywordPresence>) -> Self {
        let matched = presence
            .iter()
            .filter(|p| p.rule.is_some())
            .map(|p| p.keyword.clone())
            .collect();
        let missing = presence
            .iter()
            .filter(|p| p.rule.is_none())
            .take(MAX_MISSING)
            .map(|p| p.keyword.clone())
            .collect();
        Self {
            matched,
            missing,
            presence,
        }
    }

    /// Matched keywords in rank order rather than alphabetical.
    pub fn matched_in_rank_order(&self) -> Vec<String> {
        self.presence
            .iter()
            .filter(|p| p.rule.is_some())
            .map(|p| p.keyword.clone())
            .collect()
    }
}

/// What the semantic booster did for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BoosterOutcome {
    /// No enhanced scorer configured.
    NotConfigured,
    /// No keyword fell in the borderline band.
    Skipped,
    Applied { checked: usize, promoted: usize },
    TimedOut,
    Failed,
}

/// Token views of the CV, one entry per chunk, built once per request.
/// Matches never span a chunk or sentence boundary.
struct CvIndex {
    tokens: Vec<Vec<String>>,
    lemmas: Vec<Vec<String>>,
}

impl CvIndex {
    fn new(cv_text: &str, lexicon: &Lexicon) -> Self {
        let tokens: Vec<Vec<String>> = normalize(cv_text, lexicon)
            .segments
            .into_iter()
            .flat_map(|segment| segment.chunks)
            .collect();
        let lemmas = tokens
            .iter()
            .map(|chunk| lexicon.lemma_tokens(&lexicon.apply_synonyms(chunk)))
            .collect();
        Self { tokens, lemmas }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic matching
// ────────────────────────────────────────────────────────────────────────────

/// Exact, then lemma, then fuzzy. Never consults the booster.
pub fn match_keywords(
    keywords: &[RankedKeyword],
    cv_text: &str,
    lexicon: &Lexicon,
    tunables: &Tunables,
) -> MatchResult {
    let cv = CvIndex::new(cv_text, lexicon);
    let presence = keywords
        .iter()
        .map(|k| check_presence(&k.canonical_text, &cv, lexicon, tunables.fuzzy_threshold))
        .collect();
    MatchResult::from_presence(presence)
}

fn check_presence(
    keyword: &str,
    cv: &CvIndex,
    lexicon: &Lexicon,
    fuzzy_threshold: f64,
) -> KeywordPresence {
    let tokens: Vec<String> = keyword.split_whitespace().map(str::to_string).collect();
    let found = |rule: MatchRule| KeywordPresence {
        keyword: keyword.to_string(),
        rule: Some(rule),
        best_window: Some(keyword.to_string()),
        lexical_similarity: 1.0,
    };

    if cv.tokens.iter().any(|chunk| contains_sequence(chunk, &tokens)) {
        return found(MatchRule::Exact);
    }
    let lemmas = lexicon.lemma_tokens(&tokens);
    if cv.lemmas.iter().any(|chunk| contains_sequence(chunk, &lemmas)) {
        return found(MatchRule::Lemma);
    }

    let (similarity, window) = closest_window(&lemmas, &cv.lemmas);
    KeywordPresence {
        keyword: keyword.to_string(),
        rule: (similarity >= fuzzy_threshold).then_some(MatchRule::Fuzzy),
        best_window: window,
        lexical_similarity: similarity,
    }
}

/// Best phrase similarity over every same-length window inside a CV chunk.
/// The earliest window wins ties.
fn closest_window(needle: &[String], chunks: &[Vec<String>]) -> (f64, Option<String>) {
    if needle.is_empty() {
        return (0.0, None);
    }
    let mut best: (f64, Option<&[String]>) = (0.0, None);
    for window in chunks.iter().flat_map(|chunk| chunk.windows(needle.len())) {
        let similarity = phrase_similarity(needle, window);
        if similarity > best.0 {
            best = (similarity, Some(window));
        }
    }
    (best.0, best.1.map(|w| w.join(" ")))
}

// ────────────────────────────────────────────────────────────────────────────
// Semantic booster
// ────────────────────────────────────────────────────────────────────────────

/// Lexical matching plus a time-boxed semantic pass over borderline keywords.
///
/// Only keywords that are unmatched but whose closest window already reaches
/// the borderline threshold are sent to the scorer, so the booster can never
/// be the sole reason an unrelated keyword matches. On timeout or error the
/// lexical result is returned unchanged.
pub async fn match_keywords_boosted(
    keywords: &[RankedKeyword],
    cv_text: &str,
    lexicon: &Lexicon,
    tunables: &Tunables,
    booster: &dyn SimilarityScorer,
    timeout: Duration,
) -> (MatchResult, BoosterOutcome) {
    let lexical = match_keywords(keywords, cv_text, lexicon, tunables);
    if !booster.is_enhanced() {
        return (lexical, BoosterOutcome::NotConfigured);
    }

    let borderline: Vec<usize> = lexical
        .presence
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            p.rule.is_none()
                && p.best_window.is_some()
                && p.lexical_similarity >= tunables.borderline_threshold
        })
        .map(|(i, _)| i)
        .collect();
    if borderline.is_empty() {
        return (lexical, BoosterOutcome::Skipped);
    }

    let checks = async {
        let mut promoted = Vec::new();
        for &i in &borderline {
            let p = &lexical.presence[i];
            let window = p.best_window.as_deref().unwrap_or_default();
            let similarity = booster.similarity(&p.keyword, window).await?;
            if similarity >= tunables.semantic_threshold {
                promoted.push(i);
            }
        }
        Ok::<_, SimilarityError>(promoted)
    };

    let result = match tokio::time::timeout(timeout, checks).await {
        Ok(result) => result,
        Err(_) => Err(SimilarityError::Timeout {
            ms: timeout.as_millis() as u64,
        }),
    };

    match result {
        Ok(promoted) => {
            debug!(
                backend = booster.backend(),
                checked = borderline.len(),
                promoted = promoted.len(),
                "semantic booster applied"
            );
            let outcome = BoosterOutcome::Applied {
                checked: borderline.len(),
                promoted: promoted.len(),
            };
            let mut presence = lexical.presence;
            for i in promoted {
                presence[i].rule = Some(MatchRule::Semantic);
            }
            (MatchResult::from_presence(presence), outcome)
        }
        Err(e @ SimilarityError::Timeout { .. }) => {
            warn!(backend = booster.backend(), "{e}; using lexical matches only");
            (lexical, BoosterOutcome::TimedOut)
        }
        Err(e) => {
            warn!(
                backend = booster.backend(),
                "semantic booster failed: {e}; using lexical matches only"
            );
            (lexical, BoosterOutcome::Failed)
        }
    }
}
