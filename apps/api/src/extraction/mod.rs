//! Keyword extraction: JD text → ranked, deduplicated keyword set plus
//! domain/role tags.
//!
//! Stages run in a fixed order and each one is a pure function of its input
//! and the shared `Lexicon`:
//! normalize → candidates → filter → canonicalize (and re-filter) → rank → dedup.

pub mod candidates;
pub mod canonical;
pub mod dedup;
pub mod filter;
pub mod normalizer;
pub mod ranking;

use tracing::debug;

use crate::config::Tunables;
use crate::errors::PipelineError;
use crate::extraction::candidates::generate_candidates;
use crate::extraction::canonical::canonicalize_candidates;
use crate::extraction::dedup::deduplicate;
use crate::extraction::filter::{filter_candidates, DropReason, DroppedCandidate};
use crate::extraction::normalizer::normalize;
use crate::extraction::ranking::{rank_candidates, RankedKeyword};
use crate::lexicon::Lexicon;

/// Everything one extraction run produces.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Rank order, at most 30.
    pub keywords: Vec<RankedKeyword>,
    pub domain_tags: Vec<String>,
    pub role_tags: Vec<String>,
    pub dropped_examples: Vec<DroppedCandidate>,
    pub candidate_count: usize,
}

impl Extraction {
    pub fn keyword_texts(&self) -> Vec<String> {
        self.keywords.iter().map(|k| k.canonical_text.clone()).collect()
    }
}

pub fn extract_keywords(
    jd_text: &str,
    lexicon: &Lexicon,
    tunables: &Tunables,
) -> Result<Extraction, PipelineError> {
    let text = normalize(jd_text, lexicon);
    if text.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let chars = jd_text.trim().chars().count();
    if chars < tunables.min_jd_chars {
        return Err(PipelineError::InputTooShort {
            chars,
            min: tunables.min_jd_chars,
        });
    }

    let candidates = generate_candidates(&text);
    let candidate_count = candidates.len();

    let mut filtered = filter_candidates(candidates, lexicon);
    let kept_after_filter = filtered.kept.len();

    let canonicalized = canonicalize_candidates(std::mem::take(&mut filtered.kept), lexicon);
    let canonical = filtered.siphon_canonical(canonicalized, lexicon);
    let ranked = rank_candidates(&canonical, &text, lexicon, tunables);
    let deduped = deduplicate(ranked, lexicon, tunables.dedup_threshold);

    for phrase in deduped.discarded {
        filtered.record_drop(phrase, DropReason::Duplicate);
    }

    debug!(
        segments = text.segments.len(),
        candidates = candidate_count,
        kept_after_filter,
        canonical = canonical.len(),
        keywords = deduped.kept.len(),
        dropped = filtered.dropped_total,
        "keyword extraction finished"
    );

    Ok(Extraction {
        keywords: deduped.kept,
        domain_tags: filtered.domain_tags,
        role_tags: filtered.role_tags,
        dropped_examples: filtered.dropped,
        candidate_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::test_lexicon;

    const EXAMPLE_JD: &str = "Senior Product Designer for consumer apps. Fully remote, Europe. \
        Responsibilities: lead discovery, usability testing, and figma prototyping.";

    fn extract(jd: &str) -> Extraction {
        extract_keywords(jd, test_lexicon(), &Tunables::default()).unwrap()
    }

    #[test]
    fn test_example_scenario() {
        let extraction = extract(EXAMPLE_JD);
        let keywords = extraction.keyword_texts();

        for expected in ["discovery", "usability testing", "figma"] {
            assert!(keywords.contains(&expected.to_string()), "missing {expected}");
        }
        for excluded in ["remote", "europe", "senior", "please", "join"] {
            assert!(!keywords.contains(&excluded.to_string()), "unexpected {excluded}");
        }
        assert!(extraction.domain_tags.contains(&"consumer apps".to_string()));
        assert!(extraction.domain_tags.contains(&"fully remote".to_string()));
        assert!(extraction.domain_tags.contains(&"europe".to_string()));
        assert!(extraction
            .role_tags
            .contains(&"senior product designer".to_string()));
    }

    #[test]
    fn test_mobile_app_design_scenario() {
        let extraction = extract(
            "We need someone strong in mobile app design. Please join our mobile app team today.",
        );
        let keywords = extraction.keyword_texts();
        assert!(keywords.contains(&"mobile app design".to_string()));
        assert!(!keywords.contains(&"mobile".to_string()));
        assert!(!keywords.contains(&"app".to_string()));
    }

    #[test]
    fn test_output_invariants() {
        let jd = "Requirements: 5+ years of UX research, user interviews, personas, journey mapping, \
            wireframing, prototyping in Figma and Framer, usability testing, A/B testing, \
            accessibility, design systems, interaction design, visual design, Jira, Confluence, \
            Miro, Amplitude, Mixpanel, SQL, stakeholder management, design critique, OKRs, \
            conversion rate, retention, onboarding completion, service blueprints, style guide, \
            component library, information architecture, card sorting, heuristic evaluation.";
        let extraction = extract(jd);
        assert!(extraction.keywords.len() <= 30);

        let mut seen = std::collections::HashSet::new();
        for keyword in &extraction.keywords {
            let text = &keyword.canonical_text;
            assert_eq!(text, &text.to_lowercase());
            assert_eq!(text, text.trim());
            assert!(seen.insert(text.clone()), "duplicate {text}");

            let tokens = keyword.tokens();
            assert!(!test_lexicon().is_stopword(&tokens[0]));
            assert!(!test_lexicon().is_stopword(&tokens[tokens.len() - 1]));
            assert!(tokens.windows(2).all(|w| w[0] != w[1]));
        }
        for pair in extraction.keywords.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_synonym_targets_land_in_domain_tags() {
        let extraction = extract(
            "Work on-site in our e-commerce team. \
             Responsibilities: run usability testing and build figma prototypes.",
        );
        for keyword in extraction.keyword_texts() {
            for term in ["onsite", "ecommerce", "on-site", "e-commerce"] {
                assert!(
                    !keyword.split_whitespace().any(|t| t == term),
                    "{keyword} still carries {term}"
                );
            }
        }
        assert!(extraction.domain_tags.contains(&"onsite".to_string()));
        assert!(extraction.domain_tags.contains(&"ecommerce".to_string()));
        assert!(extraction.keyword_texts().contains(&"usability testing".to_string()));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let a = extract(EXAMPLE_JD);
        let b = extract(EXAMPLE_JD);
        assert_eq!(a.keywords, b.keywords);
        assert_eq!(a.domain_tags, b.domain_tags);
        assert_eq!(a.role_tags, b.role_tags);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = extract_keywords("   \n\t ", test_lexicon(), &Tunables::default()).unwrap_err();
        assert_eq!(err, PipelineError::EmptyInput);
    }

    #[test]
    fn test_short_input_is_rejected() {
        let err = extract_keywords("Figma designer", test_lexicon(), &Tunables::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InputTooShort { min: 40, .. }));
    }
}
