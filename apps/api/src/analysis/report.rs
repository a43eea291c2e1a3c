//! Analyze report metrics: keyword coverage, whole-text similarity, overall score.

use std::collections::HashMap;

use crate::extraction::normalizer::normalize;
use crate::lexicon::Lexicon;

/// Share of the overall score carried by keyword coverage; the rest is text similarity.
const COVERAGE_WEIGHT: f64 = 0.7;
const SIMILARITY_WEIGHT: f64 = 0.3;

/// `matched / total`, or 0 when there are no keywords.
pub fn keyword_coverage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round4(matched as f64 / total as f64)
}

/// Cosine similarity of lemma term-frequency vectors, stopwords removed.
pub fn text_similarity(jd_text: &str, cv_text: &str, lexicon: &Lexicon) -> f64 {
    let jd = term_frequencies(jd_text, lexicon);
    let cv = term_frequencies(cv_text, lexicon);
    if jd.is_empty() || cv.is_empty() {
        return 0.0;
    }

    let dot: f64 = jd
        .iter()
        .filter_map(|(term, a)| cv.get(term).map(|b| a * b))
        .sum();
    let norm = |v: &HashMap<String, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
    round4(dot / (norm(&jd) * norm(&cv)))
}

/// `round(100 * (0.7 * coverage + 0.3 * similarity))`, clamped to 0..=100.
pub fn overall_score(coverage: f64, similarity: f64) -> u32 {
    let raw = 100.0 * (COVERAGE_WEIGHT * coverage + SIMILARITY_WEIGHT * similarity);
    raw.round().clamp(0.0, 100.0) as u32
}

fn term_frequencies(text: &str, lexicon: &Lexicon) -> HashMap<String, f64> {
    let tokens: Vec<String> = normalize(text, lexicon)
        .tokens()
        .filter(|t| !lexicon.is_stopword(t))
        .cloned()
        .collect();

    let mut counts = HashMap::new();
    for lemma in lexicon.lemma_tokens(&tokens) {
        *counts.entry(lemma).or_insert(0.0) += 1.0;
    }
    counts
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::test_lexicon;

    #[test]
    fn test_keyword_coverage() {
        assert_eq!(keyword_coverage(0, 0), 0.0);
        assert_eq!(keyword_coverage(3, 4), 0.75);
        assert_eq!(keyword_coverage(1, 3), 0.3333);
    }

    #[test]
    fn test_identical_texts_are_fully_similar() {
        let text = "Usability testing and figma prototyping for onboarding flows";
        assert!((text_similarity(text, text, test_lexicon()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_texts_have_zero_similarity() {
        assert_eq!(
            text_similarity("figma prototyping", "kubernetes operators", test_lexicon()),
            0.0
        );
        assert_eq!(text_similarity("figma", "", test_lexicon()), 0.0);
    }

    #[test]
    fn test_similarity_uses_lemmas_and_ignores_stopwords() {
        let sim = text_similarity("the personas", "a persona", test_lexicon());
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score() {
        assert_eq!(overall_score(1.0, 1.0), 100);
        assert_eq!(overall_score(0.0, 0.0), 0);
        assert_eq!(overall_score(0.5, 0.5), 50);
        assert_eq!(overall_score(0.8, 0.5), 71);
    }
}
