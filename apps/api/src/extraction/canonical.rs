use std::collections::HashMap;

use crate::extraction::candidates::{sort_by_occurrence, CandidatePhrase};
use crate::extraction::filter::trim_stopwords;
use crate::lexicon::Lexicon;

/// Upper bound on rewrite passes. Synonym targets are stable, so the fixpoint
/// is reached in two or three.
const MAX_PASSES: usize = 8;

/// Maps a token sequence to its canonical form: repeated tokens collapsed,
/// synonyms applied, stopwords trimmed, repeated until nothing changes.
pub fn canonicalize(tokens: &[String], lexicon: &Lexicon) -> Vec<String> {
    let mut current = tokens.to_vec();
    for _ in 0..MAX_PASSES {
        let collapsed = collapse_repeats(&current);
        let rewritten = lexicon.apply_synonyms(&collapsed);
        let (trimmed, _) = trim_stopwords(&rewritten, lexicon);
        if trimmed == current.as_slice() {
            break;
        }
        current = trimmed.to_vec();
    }
    current
}

/// Canonicalizes every candidate and merges those that land on the same text.
pub fn canonicalize_candidates(
    candidates: Vec<CandidatePhrase>,
    lexicon: &Lexicon,
) -> Vec<CandidatePhrase> {
    let mut merged: Vec<CandidatePhrase> = Vec::with_capacity(candidates.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut candidate in candidates {
        let tokens = canonicalize(&candidate.tokens, lexicon);
        if tokens.is_empty() {
            continue;
        }
        if tokens != candidate.tokens {
            candidate.set_tokens(tokens, 0);
            let category = lexicon.whitelist_category(&candidate.tokens);
            candidate.category = category.or(candidate.category);
            candidate.is_whitelisted |=
                category.is_some() || lexicon.is_allowed_phrase(&candidate.text);
        }

        match index.get(&candidate.text) {
            Some(&i) => merged[i].absorb(candidate),
            None => {
                index.insert(candidate.text.clone(), merged.len());
                merged.push(candidate);
            }
        }
    }

    sort_by_occurrence(&mut merged);
    merged
}

fn collapse_repeats(tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if out.last() != Some(token) {
            out.push(token.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{test_lexicon, tokens};

    fn canonicalize_text(text: &str, lexicon: &Lexicon) -> String {
        canonicalize(&tokens(text), lexicon).join(" ")
    }

    #[test]
    fn test_collapses_immediate_repeats() {
        assert_eq!(
            canonicalize(&tokens("design design system"), test_lexicon()),
            tokens("design system")
        );
    }

    #[test]
    fn test_applies_synonyms_and_trims() {
        let lexicon = test_lexicon();
        assert_eq!(
            canonicalize_text("the user-center design", lexicon),
            "user-centered design"
        );
        assert_eq!(
            canonicalize_text("cross functional collaboration", lexicon),
            "cross-functional collaboration"
        );
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let lexicon = test_lexicon();
        for input in [
            "design-system design-system",
            "the cross functional teams of",
            "user-center design",
            "figma figma prototyping",
            "usability testing",
        ] {
            let once = canonicalize_text(input, lexicon);
            let twice = canonicalize_text(&once, lexicon);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_candidates_merging_on_same_canonical_text() {
        let lexicon = test_lexicon();
        let a = CandidatePhrase::new(tokens("design-system"), 0, 0);
        let b = CandidatePhrase::new(tokens("design system"), 5, 1);
        let merged = canonicalize_candidates(vec![a, b], lexicon);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "design system");
        assert_eq!(merged[0].frequency, 2);
        assert!(merged[0].is_whitelisted);
    }
}
