//! Lexicon Store: the closed vocabularies every pipeline stage reads from.
//!
//! Built once at startup from JSON (embedded defaults, or a `LEXICON_DIR`
//! override), validated, and then shared read-only as `Arc<Lexicon>`.
//! A lexicon that fails to load or validate is fatal: extraction quality
//! depends on every collection being present.

pub mod lemma;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexicon::lemma::lemmatize;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon file {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lexicon file {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid section heading pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("bullet template in '{category}' is missing {placeholder}: {template}")]
    InvalidTemplate {
        category: &'static str,
        placeholder: &'static str,
        template: String,
    },

    #[error("synonym chain starting at '{0}' never resolves")]
    SynonymCycle(String),

    #[error("synonym target '{0}' is rewritten again by the synonym table")]
    UnstableSynonym(String),

    #[error("lexicon collection '{0}' is empty")]
    EmptyCollection(&'static str),
}

/// Approved keyword categories. Drives the whitelist flag, specificity bonus
/// and bullet template selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Method,
    Tool,
    Deliverable,
    Process,
    Metric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingKind {
    /// Responsibilities, requirements, what you'll do... Nearby phrases score higher.
    Boosting,
    /// About us, benefits... Closes a boosted section.
    Neutral,
}

/// A section heading found at the start of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingMatch {
    pub kind: HeadingKind,
    /// Byte offset just past the heading (and its colon, when present).
    pub end: usize,
}

/// One bullet template with a shorter fallback for when the full one is too long.
#[derive(Debug, Clone, Deserialize)]
pub struct BulletTemplate {
    pub full: String,
    pub short: String,
}

// ────────────────────────────────────────────────────────────────────────────
// On-disk file shapes
// ────────────────────────────────────────────────────────────────────────────

struct LexiconFile {
    name: &'static str,
    embedded: &'static str,
}

const FILTERS_FILE: LexiconFile = LexiconFile {
    name: "filters.json",
    embedded: include_str!("../../lexicon/filters.json"),
};
const WHITELIST_FILE: LexiconFile = LexiconFile {
    name: "whitelist.json",
    embedded: include_str!("../../lexicon/whitelist.json"),
};
const TAGS_FILE: LexiconFile = LexiconFile {
    name: "tags.json",
    embedded: include_str!("../../lexicon/tags.json"),
};
const MORPHOLOGY_FILE: LexiconFile = LexiconFile {
    name: "morphology.json",
    embedded: include_str!("../../lexicon/morphology.json"),
};
const SECTIONS_FILE: LexiconFile = LexiconFile {
    name: "sections.json",
    embedded: include_str!("../../lexicon/sections.json"),
};
const BULLETS_FILE: LexiconFile = LexiconFile {
    name: "bullets.json",
    embedded: include_str!("../../lexicon/bullets.json"),
};

#[derive(Debug, Deserialize)]
struct FilterFile {
    blacklist: Vec<String>,
    allowed_phrases: Vec<String>,
    stopwords: Vec<String>,
    verbs: Vec<String>,
    modifiers: Vec<String>,
    generic_nouns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WhitelistFile {
    methods: Vec<String>,
    tools: Vec<String>,
    deliverables: Vec<String>,
    process: Vec<String>,
    metrics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TagFile {
    domain_terms: Vec<String>,
    seniority: Vec<String>,
    titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MorphologyFile {
    synonyms: BTreeMap<String, String>,
    lemmas: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SectionFile {
    boost: Vec<String>,
    neutral: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BulletFile {
    action_verbs: Vec<String>,
    templates: TemplateFile,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    method: Vec<BulletTemplate>,
    #[serde(default)]
    tool: Vec<BulletTemplate>,
    #[serde(default)]
    deliverable: Vec<BulletTemplate>,
    #[serde(default)]
    process: Vec<BulletTemplate>,
    #[serde(default)]
    metric: Vec<BulletTemplate>,
    generic: Vec<BulletTemplate>,
}

// ────────────────────────────────────────────────────────────────────────────
// Lexicon
// ────────────────────────────────────────────────────────────────────────────

/// Immutable, process-wide vocabularies. Never mutated after `load`.
#[derive(Debug)]
pub struct Lexicon {
    blacklist: HashSet<String>,
    allowed_phrases: HashSet<String>,
    stopwords: HashSet<String>,
    verbs: HashSet<String>,
    modifiers: HashSet<String>,
    generic_nouns: HashSet<String>,
    /// Keyed by lemma key (see `lemma_key`).
    whitelist: HashMap<String, KeywordCategory>,
    /// Lemma token sequences; only count when paired with another token.
    metric_terms: Vec<Vec<String>>,
    domain_terms: Vec<Vec<String>>,
    seniority: HashSet<String>,
    titles: HashSet<String>,
    /// Longest phrase first so overlapping keys resolve deterministically.
    phrase_synonyms: Vec<(Vec<String>, Vec<String>)>,
    token_synonyms: HashMap<String, Vec<String>>,
    lemmas: HashMap<String, String>,
    heading_pattern: Regex,
    boost_headings: HashSet<String>,
    vocabulary: HashSet<String>,
    action_verbs: Vec<String>,
    templates: HashMap<KeywordCategory, Vec<BulletTemplate>>,
    generic_templates: Vec<BulletTemplate>,
}

impl Lexicon {
    /// Loads every lexicon file from `dir`, or the embedded defaults when `dir` is `None`.
    pub fn load(dir: Option<&Path>) -> Result<Self, LexiconError> {
        let filters: FilterFile = read_file(dir, &FILTERS_FILE)?;
        let whitelist: WhitelistFile = read_file(dir, &WHITELIST_FILE)?;
        let tags: TagFile = read_file(dir, &TAGS_FILE)?;
        let morphology: MorphologyFile = read_file(dir, &MORPHOLOGY_FILE)?;
        let sections: SectionFile = read_file(dir, &SECTIONS_FILE)?;
        let bullets: BulletFile = read_file(dir, &BULLETS_FILE)?;

        Self::build(filters, whitelist, tags, morphology, sections, bullets)
    }

    /// The lexicon compiled into the binary.
    #[cfg(test)]
    pub fn embedded() -> Result<Self, LexiconError> {
        Self::load(None)
    }

    fn build(
        filters: FilterFile,
        whitelist: WhitelistFile,
        tags: TagFile,
        morphology: MorphologyFile,
        sections: SectionFile,
        bullets: BulletFile,
    ) -> Result<Self, LexiconError> {
        let stopwords = entry_set(&filters.stopwords, "stopwords")?;
        let blacklist = entry_set(&filters.blacklist, "blacklist")?;

        let lemmas: HashMap<String, String> = morphology
            .lemmas
            .iter()
            .map(|(k, v)| (normalize_entry(k), normalize_entry(v)))
            .collect();

        let mut whitelist_map = HashMap::new();
        for (entries, category) in [
            (&whitelist.methods, KeywordCategory::Method),
            (&whitelist.tools, KeywordCategory::Tool),
            (&whitelist.deliverables, KeywordCategory::Deliverable),
            (&whitelist.process, KeywordCategory::Process),
        ] {
            for entry in entries {
                let tokens = entry_tokens(entry);
                // First category wins for terms listed twice.
                whitelist_map
                    .entry(lemma_key_with(&tokens, &lemmas))
                    .or_insert(category);
            }
        }
        if whitelist_map.is_empty() {
            return Err(LexiconError::EmptyCollection("whitelist"));
        }

        let metric_terms: Vec<Vec<String>> = whitelist
            .metrics
            .iter()
            .map(|m| lemma_tokens_with(&entry_tokens(m), &lemmas))
            .filter(|t| !t.is_empty())
            .collect();

        let domain_terms: Vec<Vec<String>> = tags
            .domain_terms
            .iter()
            .map(|t| entry_tokens(t))
            .filter(|t| !t.is_empty())
            .collect();
        if domain_terms.is_empty() {
            return Err(LexiconError::EmptyCollection("domain_terms"));
        }

        let (phrase_synonyms, token_synonyms) = resolve_synonyms(&morphology.synonyms)?;

        let boost_headings = entry_set(&sections.boost, "section_headings.boost")?;
        let heading_pattern = build_heading_pattern(&sections.boost, &sections.neutral)?;

        let action_verbs: Vec<String> = bullets
            .action_verbs
            .iter()
            .map(|v| normalize_entry(v))
            .filter(|v| !v.is_empty())
            .collect();
        if action_verbs.is_empty() {
            return Err(LexiconError::EmptyCollection("action_verbs"));
        }

        let TemplateFile {
            method,
            tool,
            deliverable,
            process,
            metric,
            generic,
        } = bullets.templates;
        if generic.is_empty() {
            return Err(LexiconError::EmptyCollection("templates.generic"));
        }
        validate_templates("generic", &generic)?;
        let mut templates = HashMap::new();
        for (name, category, list) in [
            ("method", KeywordCategory::Method, method),
            ("tool", KeywordCategory::Tool, tool),
            ("deliverable", KeywordCategory::Deliverable, deliverable),
            ("process", KeywordCategory::Process, process),
            ("metric", KeywordCategory::Metric, metric),
        ] {
            validate_templates(name, &list)?;
            if !list.is_empty() {
                templates.insert(category, list);
            }
        }

        let mut lexicon = Lexicon {
            blacklist,
            allowed_phrases: entry_set(&filters.allowed_phrases, "allowed_phrases")?,
            stopwords,
            verbs: entry_set(&filters.verbs, "verbs")?,
            modifiers: entry_set(&filters.modifiers, "modifiers")?,
            generic_nouns: entry_set(&filters.generic_nouns, "generic_nouns")?,
            whitelist: whitelist_map,
            metric_terms,
            domain_terms,
            seniority: entry_set(&tags.seniority, "seniority")?,
            titles: entry_set(&tags.titles, "titles")?,
            phrase_synonyms,
            token_synonyms,
            lemmas,
            heading_pattern,
            boost_headings,
            vocabulary: HashSet::new(),
            action_verbs,
            templates,
            generic_templates: generic,
        };
        lexicon.vocabulary = lexicon.collect_vocabulary(&whitelist);
        Ok(lexicon)
    }

    fn collect_vocabulary(&self, whitelist: &WhitelistFile) -> HashSet<String> {
        let whitelist_entries = whitelist
            .methods
            .iter()
            .chain(&whitelist.tools)
            .chain(&whitelist.deliverables)
            .chain(&whitelist.process)
            .chain(&whitelist.metrics)
            .flat_map(|e| entry_tokens(e));

        let phrase_sets = self
            .blacklist
            .iter()
            .chain(&self.allowed_phrases)
            .flat_map(|e| entry_tokens(e));

        let synonym_targets = self
            .phrase_synonyms
            .iter()
            .flat_map(|(_, to)| to.iter().cloned())
            .chain(self.token_synonyms.values().flatten().cloned());

        whitelist_entries
            .chain(phrase_sets)
            .chain(synonym_targets)
            .chain(self.stopwords.iter().cloned())
            .chain(self.verbs.iter().cloned())
            .chain(self.modifiers.iter().cloned())
            .chain(self.generic_nouns.iter().cloned())
            .chain(self.titles.iter().cloned())
            .chain(self.lemmas.keys().cloned())
            .chain(self.lemmas.values().cloned())
            .chain(self.domain_terms.iter().flatten().cloned())
            .collect()
    }

    // ── Filter vocabularies ────────────────────────────────────────────────

    pub fn is_blacklisted(&self, phrase: &str) -> bool {
        self.blacklist.contains(phrase)
    }

    pub fn is_allowed_phrase(&self, phrase: &str) -> bool {
        self.allowed_phrases.contains(phrase)
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// True for tokens known to be verbs, adjectives or adverbs. Unknown tokens
    /// are assumed to be nouns.
    pub fn is_non_noun(&self, token: &str) -> bool {
        self.verbs.contains(token) || self.modifiers.contains(token)
    }

    pub fn is_generic_noun(&self, token: &str) -> bool {
        self.generic_nouns.contains(token)
    }

    /// Words the de-hyphenation step may produce by joining two halves.
    pub fn is_known_word(&self, word: &str) -> bool {
        self.vocabulary.contains(word)
    }

    /// Category of an approved keyword, if any. Metric terms only count when
    /// paired with at least one other token ("conversion rate", not "conversion").
    pub fn whitelist_category(&self, tokens: &[String]) -> Option<KeywordCategory> {
        let lemmas = self.lemma_tokens(tokens);
        if let Some(category) = self.whitelist.get(&lemmas.join(" ")) {
            return Some(*category);
        }
        if tokens.len() >= 2
            && self
                .metric_terms
                .iter()
                .any(|term| contains_sequence(&lemmas, term))
        {
            return Some(KeywordCategory::Metric);
        }
        None
    }

    // ── Tag vocabularies ───────────────────────────────────────────────────

    /// Domain-context terms (employment type, work arrangement, location,
    /// sector) occurring in `tokens`, in lexicon order.
    pub fn domain_terms_in(&self, tokens: &[String]) -> Vec<String> {
        self.domain_terms
            .iter()
            .filter(|term| contains_sequence(tokens, term))
            .map(|term| term.join(" "))
            .collect()
    }

    /// Contains a seniority word or ends in a role title.
    pub fn is_role_phrase(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|t| self.seniority.contains(t))
            || tokens.last().is_some_and(|t| self.titles.contains(t))
    }

    // ── Sections ───────────────────────────────────────────────────────────

    pub fn match_heading(&self, segment: &str) -> Option<HeadingMatch> {
        let caps = self.heading_pattern.captures(segment)?;
        let whole = caps.get(0)?;
        let heading = caps
            .get(1)?
            .as_str()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let kind = if self.boost_headings.contains(&heading) {
            HeadingKind::Boosting
        } else {
            HeadingKind::Neutral
        };
        Some(HeadingMatch {
            kind,
            end: whole.end(),
        })
    }

    // ── Morphology ─────────────────────────────────────────────────────────

    pub fn lemma(&self, token: &str) -> String {
        lemmatize(token, &self.lemmas)
    }

    /// Lemma-normalized tokens. Hyphenated tokens are split so that
    /// "cross-functional" and "cross functional" compare equal.
    pub fn lemma_tokens(&self, tokens: &[String]) -> Vec<String> {
        lemma_tokens_with(tokens, &self.lemmas)
    }

    /// Rewrites synonym phrases, then single-token synonyms.
    pub fn apply_synonyms(&self, tokens: &[String]) -> Vec<String> {
        rewrite_synonyms(tokens, &self.phrase_synonyms, &self.token_synonyms)
    }

    // ── Bullets ────────────────────────────────────────────────────────────

    pub fn action_verbs(&self) -> &[String] {
        &self.action_verbs
    }

    /// Templates for a category, falling back to the generic set.
    pub fn templates_for(&self, category: Option<KeywordCategory>) -> &[BulletTemplate] {
        category
            .and_then(|c| self.templates.get(&c))
            .map(Vec::as_slice)
            .unwrap_or(&self.generic_templates)
    }

    pub fn generic_templates(&self) -> &[BulletTemplate] {
        &self.generic_templates
    }

    /// Rough size of the loaded lexicon, for the startup log.
    pub fn entry_count(&self) -> usize {
        self.blacklist.len()
            + self.allowed_phrases.len()
            + self.stopwords.len()
            + self.whitelist.len()
            + self.metric_terms.len()
            + self.domain_terms.len()
            + self.phrase_synonyms.len()
            + self.token_synonyms.len()
            + self.lemmas.len()
    }
}

/// True when `needle` occurs as a contiguous run inside `haystack`.
pub fn contains_sequence<T: PartialEq>(haystack: &[T], needle: &[T]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

// ────────────────────────────────────────────────────────────────────────────
// Loading helpers
// ────────────────────────────────────────────────────────────────────────────

fn read_file<T: DeserializeOwned>(
    dir: Option<&Path>,
    file: &LexiconFile,
) -> Result<T, LexiconError> {
    let raw: Cow<'static, str> = match dir {
        Some(dir) => {
            let path = dir.join(file.name);
            let text = std::fs::read_to_string(&path).map_err(|source| LexiconError::Io {
                file: path.display().to_string(),
                source,
            })?;
            Cow::Owned(text)
        }
        None => Cow::Borrowed(file.embedded),
    };
    serde_json::from_str(&raw).map_err(|source| LexiconError::Parse {
        file: file.name.to_string(),
        source,
    })
}

fn normalize_entry(entry: &str) -> String {
    entry
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn entry_tokens(entry: &str) -> Vec<String> {
    entry
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn entry_set(entries: &[String], name: &'static str) -> Result<HashSet<String>, LexiconError> {
    let set: HashSet<String> = entries
        .iter()
        .map(|e| normalize_entry(e))
        .filter(|e| !e.is_empty())
        .collect();
    if set.is_empty() {
        return Err(LexiconError::EmptyCollection(name));
    }
    Ok(set)
}

fn lemma_tokens_with(tokens: &[String], lemmas: &HashMap<String, String>) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|t| t.split('-'))
        .filter(|part| !part.is_empty())
        .map(|part| lemmatize(part, lemmas))
        .collect()
}

fn lemma_key_with(tokens: &[String], lemmas: &HashMap<String, String>) -> String {
    lemma_tokens_with(tokens, lemmas).join(" ")
}

type PhraseSynonyms = Vec<(Vec<String>, Vec<String>)>;
type TokenSynonyms = HashMap<String, Vec<String>>;

/// Follows synonym chains to their final form and splits the table into
/// multi-token and single-token keys. Every target must be a fixpoint of the
/// resulting table, otherwise canonicalization could not be idempotent.
fn resolve_synonyms(
    raw: &BTreeMap<String, String>,
) -> Result<(PhraseSynonyms, TokenSynonyms), LexiconError> {
    let table: BTreeMap<String, String> = raw
        .iter()
        .map(|(k, v)| (normalize_entry(k), normalize_entry(v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();

    let mut phrases: PhraseSynonyms = Vec::new();
    let mut tokens: TokenSynonyms = HashMap::new();

    for from in table.keys() {
        let mut seen = HashSet::new();
        let mut current = from.clone();
        while let Some(next) = table.get(&current) {
            if !seen.insert(current.clone()) {
                return Err(LexiconError::SynonymCycle(from.clone()));
            }
            current = next.clone();
        }

        let to = entry_tokens(&current);
        let from_tokens = entry_tokens(from);
        if from_tokens.len() > 1 {
            phrases.push((from_tokens, to));
        } else {
            tokens.insert(from.clone(), to);
        }
    }

    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    let targets = phrases.iter().map(|(_, to)| to).chain(tokens.values());
    for to in targets {
        if &rewrite_synonyms(to, &phrases, &tokens) != to {
            return Err(LexiconError::UnstableSynonym(to.join(" ")));
        }
    }

    Ok((phrases, tokens))
}

fn rewrite_synonyms(
    tokens: &[String],
    phrases: &[(Vec<String>, Vec<String>)],
    singles: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let mut phrase_pass = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        match phrases
            .iter()
            .find(|(from, _)| tokens[i..].starts_with(from))
        {
            Some((from, to)) => {
                phrase_pass.extend(to.iter().cloned());
                i += from.len();
            }
            None => {
                phrase_pass.push(tokens[i].clone());
                i += 1;
            }
        }
    }

    phrase_pass
        .into_iter()
        .flat_map(|t| match singles.get(&t) {
            Some(to) => to.clone(),
            None => vec![t],
        })
        .collect()
}

fn build_heading_pattern(boost: &[String], neutral: &[String]) -> Result<Regex, LexiconError> {
    let mut headings: Vec<String> = boost
        .iter()
        .chain(neutral)
        .map(|h| normalize_entry(h))
        .filter(|h| !h.is_empty())
        .collect();
    if headings.is_empty() {
        return Err(LexiconError::EmptyCollection("section_headings"));
    }
    // Longest first: the alternation takes the first branch that matches.
    headings.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    headings.dedup();

    let alternatives = headings
        .iter()
        .map(|h| regex::escape(h).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");

    Ok(Regex::new(&format!(
        r"(?i)^[\s#*•>\-]*({alternatives})\s*(?::|$)"
    ))?)
}

fn validate_templates(
    category: &'static str,
    templates: &[BulletTemplate],
) -> Result<(), LexiconError> {
    for template in templates {
        for text in [&template.full, &template.short] {
            for placeholder in ["{verb}", "{keyword}"] {
                if !text.contains(placeholder) {
                    return Err(LexiconError::InvalidTemplate {
                        category,
                        placeholder,
                        template: text.clone(),
                    });
                }
            }
            if !text.contains("{pct}") && !text.contains("{count}") {
                return Err(LexiconError::InvalidTemplate {
                    category,
                    placeholder: "{pct} or {count}",
                    template: text.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_lexicon() -> &'static Lexicon {
    use std::sync::LazyLock;
    static LEXICON: LazyLock<Lexicon> =
        LazyLock::new(|| Lexicon::embedded().expect("embedded lexicon must load"));
    &LEXICON
}

#[cfg(test)]
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
