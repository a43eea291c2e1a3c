//! Normalizer: turns raw JD/CV text into segments, phrase chunks and tokens.
//!
//! A *segment* is a line or sentence; it is the unit of distance for section
//! proximity. A *chunk* is a run of tokens between phrase boundaries (commas,
//! colons, brackets, bullets, spaced dashes). Candidate phrases never cross a
//! chunk boundary.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::lexicon::{HeadingKind, Lexicon};

/// A word hyphenated across a line break: "proto-\ntyping".
static LINE_BREAK_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\p{L}+)-[ \t]*\n[ \t]*(\p{L}+)").expect("line-break hyphen pattern is valid")
});

const CHUNK_BREAKS: &[char] = &[
    ',', ';', ':', '(', ')', '[', ']', '{', '}', '"', '|', '•', '·', '\u{25AA}', '\u{2023}',
];

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub heading: Option<HeadingKind>,
    pub chunks: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedText {
    pub segments: Vec<Segment>,
    /// Per segment: distance to the nearest preceding heading, when that heading is a boosting one.
    boost_distance: Vec<Option<usize>>,
}

impl NormalizedText {
    pub fn token_count(&self) -> usize {
        self.segments
            .iter()
            .flat_map(|s| &s.chunks)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }

    /// All tokens in document order, ignoring chunk boundaries.
    pub fn tokens(&self) -> impl Iterator<Item = &String> {
        self.segments.iter().flat_map(|s| s.chunks.iter().flatten())
    }

    /// Segments between `segment` and the boosting heading above it, if any.
    pub fn boost_distance(&self, segment: usize) -> Option<usize> {
        self.boost_distance.get(segment).copied().flatten()
    }
}

/// Normalizes raw text. Never fails: text with nothing usable yields an empty result.
pub fn normalize(text: &str, lexicon: &Lexicon) -> NormalizedText {
    let folded = fold_unicode(text);
    let rejoined = rejoin_line_hyphens(&folded, lexicon);

    let mut segments = Vec::new();
    for line in rejoined.lines() {
        for sentence in split_sentences(line) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }

            // The heading marker itself is not content; whatever follows its colon is.
            let (heading, body) = match lexicon.match_heading(sentence) {
                Some(m) => (Some(m.kind), &sentence[m.end..]),
                None => (None, sentence),
            };

            let chunks = split_chunks(body);
            if heading.is_none() && chunks.is_empty() {
                continue;
            }
            segments.push(Segment { heading, chunks });
        }
    }

    let boost_distance = compute_boost_distances(&segments);
    NormalizedText {
        segments,
        boost_distance,
    }
}

/// Lowercases a single raw word and strips everything except alphanumerics and
/// internal hyphens/slashes. Returns `None` for punctuation-only words.
pub fn clean_token(word: &str) -> Option<String> {
    let word = word
        .strip_suffix("'s")
        .or_else(|| word.strip_suffix("s'"))
        .unwrap_or(word);

    let mut token = String::with_capacity(word.len());
    for c in word.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            token.push(c);
        } else if (c == '-' || c == '/') && !token.ends_with(c) {
            token.push(c);
        }
    }

    let token = token.trim_matches(|c| c == '-' || c == '/');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn fold_unicode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkc() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' | '`' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2010}' | '\u{2011}' | '\u{2013}' | '\u{2212}' => out.push('-'),
            '\u{2014}' => out.push_str(" - "),
            '\u{00AD}' | '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Joins a word split across a line break. The hyphen is dropped only when the
/// joined form is a known word; otherwise the compound keeps it.
fn rejoin_line_hyphens(text: &str, lexicon: &Lexicon) -> String {
    LINE_BREAK_HYPHEN
        .replace_all(text, |caps: &Captures| {
            let (head, tail) = (&caps[1], &caps[2]);
            let joined = format!("{head}{tail}");
            if lexicon.is_known_word(&joined.to_lowercase()) {
                joined
            } else {
                format!("{head}-{tail}")
            }
        })
        .into_owned()
}

/// Splits on `.`, `!`, `?` followed by whitespace or end of line, so "node.js" survives.
fn split_sentences(line: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                sentences.push(&line[start..i]);
                start = i + c.len_utf8();
            }
        }
    }
    if start < line.len() {
        sentences.push(&line[start..]);
    }
    sentences
}

fn split_chunks(body: &str) -> Vec<Vec<String>> {
    body.split(|c: char| CHUNK_BREAKS.contains(&c))
        .flat_map(|piece| piece.split(" - "))
        .flat_map(tokenize_piece)
        .collect()
}

/// Tokenizes one chunk candidate. A punctuation-only word ("&", "+", "-")
/// also acts as a phrase boundary.
fn tokenize_piece(piece: &str) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for word in piece.split_whitespace() {
        match clean_token(word) {
            Some(token) => current.push(token),
            None => {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn compute_boost_distances(segments: &[Segment]) -> Vec<Option<usize>> {
    let mut last_heading: Option<(usize, HeadingKind)> = None;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if let Some(kind) = segment.heading {
                last_heading = Some((i, kind));
            }
            match last_heading {
                Some((at, HeadingKind::Boosting)) => Some(i - at),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{test_lexicon, tokens};

    fn chunk_texts(text: &NormalizedText) -> Vec<String> {
        text.segments
            .iter()
            .flat_map(|s| &s.chunks)
            .map(|c| c.join(" "))
            .collect()
    }

    #[test]
    fn test_lowercases_and_splits_on_punctuation() {
        let text = normalize("Figma, Sketch & Miro!", test_lexicon());
        assert_eq!(chunk_texts(&text), vec!["figma", "sketch", "miro"]);
    }

    #[test]
    fn test_keeps_internal_hyphens_and_slashes() {
        let text = normalize("Own end-to-end A/B testing.", test_lexicon());
        assert_eq!(chunk_texts(&text), vec!["own end-to-end a/b testing"]);
    }

    #[test]
    fn test_sentence_split_keeps_dotted_names() {
        let text = normalize("Build with node.js. Ship weekly.", test_lexicon());
        assert_eq!(text.segments.len(), 2);
        assert_eq!(chunk_texts(&text), vec!["build with nodejs", "ship weekly"]);
    }

    #[test]
    fn test_inline_heading_is_stripped_and_recorded() {
        let text = normalize(
            "Fully remote, Europe. Responsibilities: lead discovery, usability testing.",
            test_lexicon(),
        );
        assert_eq!(text.segments.len(), 2);
        assert_eq!(text.segments[1].heading, Some(HeadingKind::Boosting));
        assert_eq!(
            text.segments[1].chunks,
            vec![tokens("lead discovery"), tokens("usability testing")]
        );
        assert_eq!(text.boost_distance(0), None);
        assert_eq!(text.boost_distance(1), Some(0));
    }

    #[test]
    fn test_boost_distance_counts_segments_and_resets_on_neutral_heading() {
        let jd = "What you\u{2019}ll do\nRun interviews\nShip prototypes\nAbout us\nWe sell shoes";
        let text = normalize(jd, test_lexicon());
        assert_eq!(text.segments[0].heading, Some(HeadingKind::Boosting));
        assert_eq!(text.boost_distance(1), Some(1));
        assert_eq!(text.boost_distance(2), Some(2));
        assert_eq!(text.segments[3].heading, Some(HeadingKind::Neutral));
        assert_eq!(text.boost_distance(4), None);
    }

    #[test]
    fn test_line_break_hyphen_joins_known_word() {
        let text = normalize("Rapid proto-\ntyping skills", test_lexicon());
        assert_eq!(chunk_texts(&text), vec!["rapid prototyping skills"]);
    }

    #[test]
    fn test_line_break_hyphen_keeps_compound() {
        let text = normalize("Strong cross-\nfunctional partner", test_lexicon());
        assert_eq!(chunk_texts(&text), vec!["strong cross-functional partner"]);
    }

    #[test]
    fn test_clean_token_rules() {
        assert_eq!(clean_token("Designer's"), Some("designer".to_string()));
        assert_eq!(clean_token("--end--to-end--"), Some("end-to-end".to_string()));
        assert_eq!(clean_token("&"), None);
        assert_eq!(clean_token("100%"), Some("100".to_string()));
    }

    #[test]
    fn test_empty_and_punctuation_only_input() {
        assert!(normalize("", test_lexicon()).is_empty());
        assert!(normalize("  !!! ... ---  ", test_lexicon()).is_empty());
    }
}
