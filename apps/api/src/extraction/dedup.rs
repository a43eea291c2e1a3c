use std::collections::HashSet;

use crate::extraction::ranking::{compare_rank, RankedKeyword, MAX_KEYWORDS};
use crate::lexicon::Lexicon;

#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Rank order, at most `MAX_KEYWORDS`.
    pub kept: Vec<RankedKeyword>,
    /// Canonical texts discarded as near-duplicates, in the order they were dropped.
    pub discarded: Vec<String>,
}

/// Collapses near-duplicate keywords, then truncates to the keyword cap.
///
/// `ranked` must already be in rank order. A lower-ranked keyword `b` is a
/// near-duplicate of a kept `a` when their comparison sets have Jaccard
/// similarity `>= threshold`, or when `b`'s set is contained in `a`'s. The
/// lower-ranked one goes, except that a whitelisted `b` evicts non-whitelisted
/// duplicates instead.
pub fn deduplicate(ranked: Vec<RankedKeyword>, lexicon: &Lexicon, threshold: f64) -> DedupOutcome {
    let mut kept: Vec<(RankedKeyword, HashSet<String>)> = Vec::new();
    let mut discarded = Vec::new();

    for keyword in ranked {
        let key = comparison_set(&keyword, lexicon);
        let conflicts: Vec<usize> = kept
            .iter()
            .enumerate()
            .filter(|(_, (_, kept_key))| is_near_duplicate(kept_key, &key, threshold))
            .map(|(i, _)| i)
            .collect();

        if conflicts.is_empty() {
            kept.push((keyword, key));
            continue;
        }

        let protected = keyword.is_whitelisted
            && conflicts.iter().all(|&i| !kept[i].0.is_whitelisted);
        if !protected {
            discarded.push(keyword.canonical_text);
            continue;
        }

        for &i in conflicts.iter().rev() {
            let (evicted, _) = kept.remove(i);
            discarded.push(evicted.canonical_text);
        }
        kept.push((keyword, key));
    }

    let mut kept: Vec<RankedKeyword> = kept.into_iter().map(|(k, _)| k).collect();
    kept.sort_by(compare_rank);
    kept.truncate(MAX_KEYWORDS);
    DedupOutcome { kept, discarded }
}

/// Stopword-stripped, lemma-normalized token set.
fn comparison_set(keyword: &RankedKeyword, lexicon: &Lexicon) -> HashSet<String> {
    lexicon
        .lemma_tokens(&keyword.tokens())
        .into_iter()
        .filter(|t| !lexicon.is_stopword(t))
        .collect()
}

fn is_near_duplicate(higher: &HashSet<String>, lower: &HashSet<String>, threshold: f64) -> bool {
    if !lower.is_empty() && lower.is_subset(higher) {
        return true;
    }
    jaccard(higher, lower) >= threshold
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
