//! Bullet Generator: templated CV bullet suggestions for missing keywords.
//!
//! Every bullet carries an action verb, the target keyword, a context phrase and
//! a measurable outcome. Verbs rotate so no two bullets in one response open the
//! same way until the verb pool runs out.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::lexicon::{contains_sequence, BulletTemplate, Lexicon};

pub const PCT_RANGE: RangeInclusive<u32> = 10..=45;
pub const COUNT_RANGE: RangeInclusive<u32> = 2..=12;

/// Ceiling for a filled bullet; longer ones fall back to the short variant.
pub const MAX_BULLET_CHARS: usize = 150;
pub const MAX_BULLET_WORDS: usize = 26;

/// Last resort when every template overflows the ceiling.
const MINIMAL_TEMPLATE: &str = "{verb} {keyword}, +{pct}%";

pub const MIN_BULLETS: usize = 3;
pub const MAX_BULLETS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulletSuggestion {
    pub text: String,
    pub used_verb: String,
    pub used_keyword: String,
}

/// Rotation state for one `generate_bullets` call.
struct BulletState {
    used_verbs: HashSet<String>,
    used_keywords: HashSet<String>,
    /// (keyword, verb, template)
    used_combinations: HashSet<(String, String, String)>,
    rng: StdRng,
}

impl BulletState {
    fn new(missing: &[String]) -> Self {
        Self {
            used_verbs: HashSet::new(),
            used_keywords: HashSet::new(),
            used_combinations: HashSet::new(),
            rng: StdRng::seed_from_u64(seed_for(missing)),
        }
    }

    /// First verb not used in this response whose combination with `keyword`
    /// and `template` is also fresh. The pool is reset once every verb is used.
    fn pick_verb(&mut self, keyword: &str, template: &str, verbs: &[String]) -> Option<String> {
        if verbs.iter().all(|v| self.used_verbs.contains(v)) {
            self.used_verbs.clear();
        }
        let fresh = |v: &&String| {
            !self
                .used_combinations
                .contains(&(keyword.to_string(), v.to_string(), template.to_string()))
        };
        verbs
            .iter()
            .filter(|v| !self.used_verbs.contains(*v))
            .find(fresh)
            .or_else(|| verbs.iter().find(fresh))
            .cloned()
    }

    fn compose(
        &mut self,
        keyword: &str,
        missing: &[String],
        lexicon: &Lexicon,
    ) -> Option<BulletSuggestion> {
        let keyword_tokens = split(keyword);
        let category = lexicon.whitelist_category(&keyword_tokens);
        let specific = lexicon.templates_for(category);
        let generic = lexicon.generic_templates();

        let start = self.rng.random_range(0..specific.len());
        let ordered = specific[start..]
            .iter()
            .chain(&specific[..start])
            .chain(generic.iter());

        for template in ordered {
            let Some(verb) = self.pick_verb(keyword, &template.full, lexicon.action_verbs()) else {
                continue;
            };
            let Some(text) = self.fill_within_limits(template, &verb, keyword) else {
                continue;
            };
            if mentions_other_missing(&text, &keyword_tokens, missing) {
                continue;
            }

            self.record(keyword, &verb, &template.full);
            return Some(BulletSuggestion {
                text,
                used_verb: verb,
                used_keyword: keyword.to_string(),
            });
        }
        self.compose_minimal(keyword, lexicon)
    }

    /// `"{verb} {keyword}, +{pct}%"` with the keyword cut down to its trailing
    /// tokens until the bullet fits.
    fn compose_minimal(&mut self, keyword: &str, lexicon: &Lexicon) -> Option<BulletSuggestion> {
        let verb = self.pick_verb(keyword, MINIMAL_TEMPLATE, lexicon.action_verbs())?;
        let pct = self.rng.random_range(PCT_RANGE);
        let shortened = shorten_to_fit(&split(keyword), &verb, pct)?;
        let text = fill(MINIMAL_TEMPLATE, &verb, &shortened, pct, 0);

        self.record(keyword, &verb, MINIMAL_TEMPLATE);
        Some(BulletSuggestion {
            text,
            used_verb: verb,
            used_keyword: shortened,
        })
    }

    fn record(&mut self, keyword: &str, verb: &str, template: &str) {
        self.used_verbs.insert(verb.to_string());
        self.used_keywords.insert(keyword.to_string());
        self.used_combinations
            .insert((keyword.to_string(), verb.to_string(), template.to_string()));
    }

    fn fill_within_limits(
        &mut self,
        template: &BulletTemplate,
        verb: &str,
        keyword: &str,
    ) -> Option<String> {
        let pct = self.rng.random_range(PCT_RANGE);
        let count = self.rng.random_range(COUNT_RANGE);
        [&template.full, &template.short]
            .into_iter()
            .map(|t| fill(t, verb, keyword, pct, count))
            .find(|text| within_limits(text))
    }
}

/// Generates up to `max_count` (clamped to 3..=5) bullets for the missing
/// keywords, taken in rank order. When fewer than three keywords are missing,
/// they are revisited with fresh verb/template combinations until three
/// bullets exist.
pub fn generate_bullets(
    missing: &[String],
    max_count: usize,
    lexicon: &Lexicon,
) -> Vec<BulletSuggestion> {
    if missing.is_empty() {
        return Vec::new();
    }
    let target = max_count.clamp(MIN_BULLETS, MAX_BULLETS);
    let mut state = BulletState::new(missing);
    let mut bullets = Vec::with_capacity(target);

    for keyword in missing {
        if bullets.len() >= target {
            break;
        }
        if state.used_keywords.contains(keyword) {
            continue;
        }
        bullets.extend(state.compose(keyword, missing, lexicon));
    }

    while bullets.len() < MIN_BULLETS {
        let before = bullets.len();
        for keyword in missing {
            if bullets.len() >= MIN_BULLETS {
                break;
            }
            bullets.extend(state.compose(keyword, missing, lexicon));
        }
        if bullets.len() == before {
            break;
        }
    }

    bullets
}

fn fill(template: &str, verb: &str, keyword: &str, pct: u32, count: u32) -> String {
    let filled = template
        .replace("{verb}", verb)
        .replace("{keyword}", keyword)
        .replace("{count}", &count.to_string())
        .replace("{pct}", &pct.to_string());
    filled
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Longest token suffix of the keyword that fits the minimal template. A
/// single token that still overflows is truncated.
fn shorten_to_fit(tokens: &[String], verb: &str, pct: u32) -> Option<String> {
    let bullet = |keyword: &str| fill(MINIMAL_TEMPLATE, verb, keyword, pct, 0);
    if let Some(fits) = (0..tokens.len())
        .map(|start| tokens[start..].join(" "))
        .find(|keyword| within_limits(&bullet(keyword)))
    {
        return Some(fits);
    }
    let overhead = bullet("").chars().count();
    let last = tokens.last()?;
    Some(last.chars().take(MAX_BULLET_CHARS.saturating_sub(overhead)).collect())
}

fn within_limits(text: &str) -> bool {
    text.chars().count() <= MAX_BULLET_CHARS && text.split_whitespace().count() <= MAX_BULLET_WORDS
}

/// True when the bullet also names a different missing keyword, which would
/// make it ambiguous which gap it fills. Keywords nested in (or containing)
/// the target do not count.
fn mentions_other_missing(text: &str, target: &[String], missing: &[String]) -> bool {
    let bullet_tokens = split(&text.replace([',', '%'], " "));
    missing.iter().any(|other| {
        let other = split(other);
        other.as_slice() != target
            && !contains_sequence(target, &other)
            && !contains_sequence(&other, target)
            && contains_sequence(&bullet_tokens, &other)
    })
}

fn split(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// FNV-1a over the missing keywords, so identical requests get identical bullets.
fn seed_for(missing: &[String]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    missing
        .iter()
        .flat_map(|k| k.bytes().chain(std::iter::once(b'\n')))
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::test_lexicon;

    fn missing(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn numbers_in(text: &str) -> Vec<u32> {
        text.split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    #[test]
    fn test_no_missing_keywords_no_bullets() {
        assert!(generate_bullets(&[], 5, test_lexicon()).is_empty());
    }

    #[test]
    fn test_count_is_clamped_between_three_and_five() {
        let kws = missing(&[
            "usability testing",
            "figma",
            "wireframes",
            "agile",
            "conversion rate",
            "stakeholder alignment",
            "journey mapping",
        ]);
        assert_eq!(generate_bullets(&kws, 5, test_lexicon()).len(), 5);
        assert_eq!(generate_bullets(&kws, 10, test_lexicon()).len(), 5);
        assert_eq!(generate_bullets(&kws, 1, test_lexicon()).len(), 3);
    }

    #[test]
    fn test_single_missing_keyword_is_revisited() {
        let bullets = generate_bullets(&missing(&["figma"]), 5, test_lexicon());
        assert_eq!(bullets.len(), 3);

        let combos: HashSet<_> = bullets.iter().map(|b| b.text.clone()).collect();
        assert_eq!(combos.len(), 3);
        let verbs: HashSet<_> = bullets.iter().map(|b| b.used_verb.clone()).collect();
        assert_eq!(verbs.len(), 3);
    }

    #[test]
    fn test_every_bullet_is_well_formed() {
        let kws = missing(&["usability testing", "figma", "design system", "okrs", "retention rate"]);
        let bullets = generate_bullets(&kws, 5, test_lexicon());
        for bullet in &bullets {
            assert!(bullet.text.starts_with(&bullet.used_verb), "{}", bullet.text);
            assert!(bullet.text.contains(&bullet.used_keyword), "{}", bullet.text);
            assert!(test_lexicon().action_verbs().contains(&bullet.used_verb));
            assert!(bullet.text.chars().count() <= MAX_BULLET_CHARS);
            assert!(bullet.text.split_whitespace().count() <= MAX_BULLET_WORDS);
            assert_eq!(bullet.text, bullet.text.to_lowercase());

            let numbers = numbers_in(&bullet.text);
            assert!(!numbers.is_empty(), "no outcome in {}", bullet.text);
            for n in numbers {
                assert!(COUNT_RANGE.contains(&n) || PCT_RANGE.contains(&n), "{n} out of range");
            }
        }
    }

    #[test]
    fn test_verbs_do_not_repeat_while_pool_lasts() {
        let kws = missing(&["figma", "sketch", "miro", "jira", "notion"]);
        let bullets = generate_bullets(&kws, 5, test_lexicon());
        let verbs: HashSet<_> = bullets.iter().map(|b| b.used_verb.as_str()).collect();
        assert_eq!(verbs.len(), bullets.len());
    }

    #[test]
    fn test_bullets_are_deterministic() {
        let kws = missing(&["usability testing", "figma", "wireframes"]);
        assert_eq!(
            generate_bullets(&kws, 5, test_lexicon()),
            generate_bullets(&kws, 5, test_lexicon())
        );
    }

    #[test]
    fn test_bullet_does_not_name_another_missing_keyword() {
        let kws = missing(&["usability testing", "task success"]);
        let bullets = generate_bullets(&kws, 5, test_lexicon());
        for bullet in bullets.iter().filter(|b| b.used_keyword == "usability testing") {
            assert!(!bullet.text.contains("task success"), "{}", bullet.text);
        }
    }

    fn long_keyword(parts: &[(char, usize)]) -> String {
        parts
            .iter()
            .map(|(c, n)| c.to_string().repeat(*n))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_oversized_keyword_still_gets_three_bullets() {
        let keyword = long_keyword(&[('a', 28), ('b', 28), ('c', 30), ('d', 29)]);
        assert_eq!(keyword.len(), 118);
        let bullets = generate_bullets(&missing(&[&keyword]), 5, test_lexicon());
        assert_eq!(bullets.len(), 3);
        for bullet in &bullets {
            assert!(bullet.text.chars().count() <= MAX_BULLET_CHARS, "{}", bullet.text);
            assert!(bullet.text.starts_with(&bullet.used_verb));
            assert!(bullet.text.contains(&bullet.used_keyword));
        }
    }

    #[test]
    fn test_keyword_is_cut_to_trailing_tokens_when_nothing_fits() {
        let keyword = long_keyword(&[('a', 49), ('b', 49), ('c', 49), ('d', 49)]);
        let bullets = generate_bullets(&missing(&[&keyword]), 5, test_lexicon());
        assert_eq!(bullets.len(), 3);
        let tail = format!("{} {}", "c".repeat(49), "d".repeat(49));
        for bullet in &bullets {
            assert_eq!(bullet.used_keyword, tail);
            assert_eq!(
                bullet.text,
                format!("{} {tail}, +{}%", bullet.used_verb, numbers_in(&bullet.text)[0])
            );
            assert!(bullet.text.chars().count() <= MAX_BULLET_CHARS);
        }
        let verbs: HashSet<_> = bullets.iter().map(|b| b.used_verb.as_str()).collect();
        assert_eq!(verbs.len(), 3);
    }

    #[test]
    fn test_single_huge_token_is_truncated_to_fit() {
        let tokens = vec!["x".repeat(400)];
        let shortened = shorten_to_fit(&tokens, "led", 20).unwrap();
        let text = fill(MINIMAL_TEMPLATE, "led", &shortened, 20, 0);
        assert_eq!(text.chars().count(), MAX_BULLET_CHARS);
        assert!(text.starts_with("led xxx"));
    }

    #[test]
    fn test_long_template_falls_back_to_short_variant() {
        let template = BulletTemplate {
            full: format!("{{verb}} {{keyword}} {} by {{pct}}%", "word ".repeat(30)),
            short: "{verb} {keyword} by {pct}%".to_string(),
        };
        let mut state = BulletState::new(&missing(&["figma"]));
        let text = state.fill_within_limits(&template, "led", "figma").unwrap();
        assert!(text.starts_with("led figma by "));
    }
}
