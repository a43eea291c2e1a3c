//! Filter: drops noise candidates, flags approved terms and siphons
//! domain/role phrases into tag sets.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::extraction::candidates::{sort_by_occurrence, CandidatePhrase};
use crate::lexicon::Lexicon;

/// Dropped candidates kept for diagnostics.
pub const MAX_DROPPED_EXAMPLES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Blacklisted,
    StopwordOnly,
    InteriorConnective,
    TooShort,
    NoNoun,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedCandidate {
    pub phrase: String,
    pub reason: DropReason,
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<CandidatePhrase>,
    pub domain_tags: Vec<String>,
    pub role_tags: Vec<String>,
    pub dropped: Vec<DroppedCandidate>,
    pub dropped_total: usize,
}

impl FilterOutcome {
    pub fn record_drop(&mut self, phrase: String, reason: DropReason) {
        self.dropped_total += 1;
        if self.dropped.len() < MAX_DROPPED_EXAMPLES {
            self.dropped.push(DroppedCandidate { phrase, reason });
        }
    }

    /// Re-checks canonical candidates. A synonym rewrite can land on a
    /// blacklisted phrase or pull in a domain or role term ("e-commerce" to
    /// "ecommerce"), which the first pass could not see.
    pub fn siphon_canonical(
        &mut self,
        candidates: Vec<CandidatePhrase>,
        lexicon: &Lexicon,
    ) -> Vec<CandidatePhrase> {
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if lexicon.is_blacklisted(&candidate.text) {
                self.record_drop(candidate.text, DropReason::Blacklisted);
            } else if lexicon.is_allowed_phrase(&candidate.text) {
                kept.push(candidate);
            } else {
                let domain_terms = lexicon.domain_terms_in(&candidate.tokens);
                if !domain_terms.is_empty() {
                    self.domain_tags.extend(domain_terms);
                } else if lexicon.is_role_phrase(&candidate.tokens) {
                    self.role_tags.push(candidate.text);
                } else {
                    kept.push(candidate);
                }
            }
        }
        self.domain_tags = clean_tags(std::mem::take(&mut self.domain_tags));
        self.role_tags = clean_tags(std::mem::take(&mut self.role_tags));
        kept
    }
}

enum Verdict {
    Keep(CandidatePhrase),
    Domain(Vec<String>),
    Role(String),
    Drop(DropReason),
}

pub fn filter_candidates(candidates: Vec<CandidatePhrase>, lexicon: &Lexicon) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let mut kept_index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let phrase = candidate.text.clone();
        match classify(candidate, lexicon) {
            Verdict::Keep(candidate) => match kept_index.get(&candidate.text) {
                Some(&i) => outcome.kept[i].absorb(candidate),
                None => {
                    kept_index.insert(candidate.text.clone(), outcome.kept.len());
                    outcome.kept.push(candidate);
                }
            },
            Verdict::Domain(terms) => outcome.domain_tags.extend(terms),
            Verdict::Role(tag) => outcome.role_tags.push(tag),
            Verdict::Drop(reason) => outcome.record_drop(phrase, reason),
        }
    }

    sort_by_occurrence(&mut outcome.kept);
    outcome.domain_tags = clean_tags(outcome.domain_tags);
    outcome.role_tags = clean_tags(outcome.role_tags);
    outcome
}

fn classify(mut candidate: CandidatePhrase, lexicon: &Lexicon) -> Verdict {
    if lexicon.is_blacklisted(&candidate.text) {
        return Verdict::Drop(DropReason::Blacklisted);
    }
    if lexicon.is_allowed_phrase(&candidate.text) {
        return Verdict::Keep(flag_allowed(candidate, lexicon));
    }

    let (trimmed, leading_removed) = trim_stopwords(&candidate.tokens, lexicon);
    if trimmed.is_empty() {
        return Verdict::Drop(DropReason::StopwordOnly);
    }
    if trimmed.len() != candidate.tokens.len() {
        let trimmed = trimmed.to_vec();
        candidate.set_tokens(trimmed, leading_removed);
        if lexicon.is_blacklisted(&candidate.text) {
            return Verdict::Drop(DropReason::Blacklisted);
        }
        if lexicon.is_allowed_phrase(&candidate.text) {
            return Verdict::Keep(flag_allowed(candidate, lexicon));
        }
    }

    let category = lexicon.whitelist_category(&candidate.tokens);
    let tokens = &candidate.tokens;

    if category.is_none() && has_interior_stopword(tokens, lexicon) {
        return Verdict::Drop(DropReason::InteriorConnective);
    }
    if category.is_none() && tokens.len() == 1 && !is_substantial_word(&tokens[0]) {
        return Verdict::Drop(DropReason::TooShort);
    }
    if tokens.iter().all(|t| lexicon.is_non_noun(t)) {
        return Verdict::Drop(DropReason::NoNoun);
    }

    candidate.category = category;
    candidate.is_whitelisted = category.is_some();

    let domain_terms = lexicon.domain_terms_in(&candidate.tokens);
    if !domain_terms.is_empty() {
        return Verdict::Domain(domain_terms);
    }
    if lexicon.is_role_phrase(&candidate.tokens) {
        return Verdict::Role(candidate.text);
    }
    Verdict::Keep(candidate)
}

/// Strips leading and trailing stopwords. Returns the remaining span and the
/// number of tokens removed from the front.
pub fn trim_stopwords<'a>(tokens: &'a [String], lexicon: &Lexicon) -> (&'a [String], usize) {
    let start = tokens
        .iter()
        .position(|t| !lexicon.is_stopword(t))
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| !lexicon.is_stopword(t))
        .map_or(start, |i| i + 1);
    (&tokens[start..end], start)
}

fn flag_allowed(mut candidate: CandidatePhrase, lexicon: &Lexicon) -> CandidatePhrase {
    candidate.is_whitelisted = true;
    candidate.category = lexicon.whitelist_category(&candidate.tokens);
    candidate
}

fn has_interior_stopword(tokens: &[String], lexicon: &Lexicon) -> bool {
    tokens.len() > 2 && tokens[1..tokens.len() - 1].iter().any(|t| lexicon.is_stopword(t))
}

/// At least four characters, and not a bare number.
fn is_substantial_word(token: &str) -> bool {
    token.chars().count() >= 4 && token.chars().any(char::is_alphabetic)
}

/// De-duplicates tags (first occurrence wins) and removes any tag whose token
/// set is a strict subset of another tag's.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = tags.into_iter().filter(|t| seen.insert(t.clone())).collect();

    let token_sets: Vec<HashSet<&str>> = unique
        .iter()
        .map(|t| t.split_whitespace().collect())
        .collect();

    unique
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            !token_sets.iter().enumerate().any(|(j, other)| {
                *i != j
                    && token_sets[*i].len() < other.len()
                    && token_sets[*i].is_subset(other)
            })
        })
        .map(|(_, t)| t.clone())
        .collect()
}
