use std::collections::{BTreeSet, HashMap};

use crate::extraction::normalizer::NormalizedText;
use crate::lexicon::KeywordCategory;

/// Longest n-gram ever generated.
pub const MAX_NGRAM: usize = 4;

/// A contiguous token span of the JD, aggregated over all its occurrences.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePhrase {
    pub text: String,
    pub tokens: Vec<String>,
    /// Token offset of the first occurrence.
    pub start_offset: usize,
    pub frequency: usize,
    pub length_in_words: usize,
    /// Token offsets of every occurrence.
    pub positions: BTreeSet<usize>,
    /// Segment indices of every occurrence.
    pub segments: BTreeSet<usize>,
    pub is_whitelisted: bool,
    pub category: Option<KeywordCategory>,
}

impl CandidatePhrase {
    pub fn new(tokens: Vec<String>, position: usize, segment: usize) -> Self {
        Self {
            text: tokens.join(" "),
            length_in_words: tokens.len(),
            tokens,
            start_offset: position,
            frequency: 1,
            positions: BTreeSet::from([position]),
            segments: BTreeSet::from([segment]),
            is_whitelisted: false,
            category: None,
        }
    }

    fn record(&mut self, position: usize, segment: usize) {
        self.positions.insert(position);
        self.segments.insert(segment);
        self.frequency = self.positions.len();
        self.start_offset = self.start_offset.min(position);
    }

    /// Replaces the token sequence, e.g. after stopword trimming. Occurrence
    /// offsets move forward by the number of tokens removed from the front.
    pub fn set_tokens(&mut self, tokens: Vec<String>, leading_removed: usize) {
        self.text = tokens.join(" ");
        self.length_in_words = tokens.len();
        self.tokens = tokens;
        if leading_removed > 0 {
            self.positions = self.positions.iter().map(|p| p + leading_removed).collect();
            self.start_offset += leading_removed;
        }
    }

    /// Merges another candidate with the same text. Positions are unioned so
    /// an occurrence reached through two spans is only counted once.
    pub fn absorb(&mut self, other: CandidatePhrase) {
        self.positions.extend(other.positions);
        self.segments.extend(other.segments);
        self.frequency = self.positions.len();
        self.start_offset = self.start_offset.min(other.start_offset);
        self.is_whitelisted |= other.is_whitelisted;
        self.category = self.category.or(other.category);
    }
}

/// Every 1..=4 token span inside a chunk, aggregated by exact text.
/// Spans without a single alphabetic character are skipped.
pub fn generate_candidates(text: &NormalizedText) -> Vec<CandidatePhrase> {
    let mut by_text: HashMap<String, CandidatePhrase> = HashMap::new();
    let mut offset = 0;

    for (segment_idx, segment) in text.segments.iter().enumerate() {
        for chunk in &segment.chunks {
            for start in 0..chunk.len() {
                let longest = MAX_NGRAM.min(chunk.len() - start);
                for len in 1..=longest {
                    let window = &chunk[start..start + len];
                    if !window
                        .iter()
                        .any(|t| t.chars().any(char::is_alphabetic))
                    {
                        continue;
                    }

                    let position = offset + start;
                    by_text
                        .entry(window.join(" "))
                        .and_modify(|c| c.record(position, segment_idx))
                        .or_insert_with(|| {
                            CandidatePhrase::new(window.to_vec(), position, segment_idx)
                        });
                }
            }
            offset += chunk.len();
        }
    }

    let mut candidates: Vec<CandidatePhrase> = by_text.into_values().collect();
    sort_by_occurrence(&mut candidates);
    candidates
}

/// First offset, then shorter first, then text. Keeps every later stage deterministic.
pub fn sort_by_occurrence(candidates: &mut [CandidatePhrase]) {
    candidates.sort_by(|a, b| {
        a.start_offset
            .cmp(&b.start_offset)
            .then_with(|| a.length_in_words.cmp(&b.length_in_words))
            .then_with(|| a.text.cmp(&b.text))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::normalizer::normalize;
    use crate::lexicon::test_lexicon;

    fn candidates_for(text: &str) -> Vec<CandidatePhrase> {
        generate_candidates(&normalize(text, test_lexicon()))
    }

    fn find<'a>(candidates: &'a [CandidatePhrase], text: &str) -> Option<&'a CandidatePhrase> {
        candidates.iter().find(|c| c.text == text)
    }

    #[test]
    fn test_generates_all_spans_up_to_four_tokens() {
        let candidates = candidates_for("alpha beta gamma delta epsilon");
        assert_eq!(candidates.len(), 5 + 4 + 3 + 2);
        assert!(find(&candidates, "alpha beta gamma delta").is_some());
        assert!(find(&candidates, "alpha beta gamma delta epsilon").is_none());
        assert!(candidates.iter().all(|c| c.length_in_words <= MAX_NGRAM));
    }

    #[test]
    fn test_spans_never_cross_chunk_boundaries() {
        let candidates = candidates_for("figma, sketch");
        assert!(find(&candidates, "figma sketch").is_none());
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_frequency_and_first_offset() {
        let candidates = candidates_for("usability testing. more usability testing.");
        let c = find(&candidates, "usability testing").unwrap();
        assert_eq!(c.frequency, 2);
        assert_eq!(c.start_offset, 0);
        assert_eq!(c.positions, BTreeSet::from([0, 3]));
        assert_eq!(c.segments, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_numeric_spans_are_skipped() {
        let candidates = candidates_for("2024 100 prototypes");
        assert!(find(&candidates, "2024").is_none());
        assert!(find(&candidates, "2024 100").is_none());
        assert!(find(&candidates, "100 prototypes").is_some());
    }

    #[test]
    fn test_absorb_unions_positions_without_double_counting() {
        let mut a = CandidatePhrase::new(vec!["figma".into()], 3, 0);
        let mut b = CandidatePhrase::new(vec!["the".into(), "figma".into()], 2, 0);
        b.set_tokens(vec!["figma".into()], 1);
        a.absorb(b);
        assert_eq!(a.frequency, 1);
        assert_eq!(a.positions, BTreeSet::from([3]));
    }

    #[test]
    fn test_output_order_is_deterministic() {
        let first = candidates_for("lead discovery and usability testing with figma");
        let second = candidates_for("lead discovery and usability testing with figma");
        assert_eq!(first, second);
        assert_eq!(first[0].text, "lead");
        assert_eq!(first[1].text, "lead discovery");
    }
}
