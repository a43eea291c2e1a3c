use std::collections::HashMap;

/// Shortest token the suffix rules will touch. "aws", "ios" and friends stay put.
const MIN_INFLECTED_LEN: usize = 4;

/// Endings that look plural but belong to the singular ("process", "status", "analysis").
const SINGULAR_ENDINGS: &[&str] = &["ss", "us", "is"];

/// Endings whose plural adds "es" rather than "s".
const ES_ENDINGS: &[&str] = &["sses", "shes", "ches", "xes", "zes"];

/// Reduces a single lowercase token to its dictionary form.
///
/// Irregular forms come from the lexicon; everything else goes through a small
/// set of English plural rules. Verb and gerund forms are left alone: "testing"
/// and "test" are reconciled by fuzzy matching, not here.
pub fn lemmatize(token: &str, irregular: &HashMap<String, String>) -> String {
    if let Some(lemma) = irregular.get(token) {
        return lemma.clone();
    }
    if token.chars().count() < MIN_INFLECTED_LEN || !token.ends_with('s') {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem.chars().count() >= 2 {
            return format!("{stem}y");
        }
    }
    if ES_ENDINGS.iter().any(|end| token.ends_with(end)) {
        return token[..token.len() - 2].to_string();
    }
    if SINGULAR_ENDINGS.iter().any(|end| token.ends_with(end)) {
        return token.to_string();
    }
    token[..token.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn irregular() -> HashMap<String, String> {
        HashMap::from([
            ("analyses".to_string(), "analysis".to_string()),
            ("kubernetes".to_string(), "kubernetes".to_string()),
        ])
    }

    #[test]
    fn test_regular_plural_strips_s() {
        assert_eq!(lemmatize("personas", &irregular()), "persona");
        assert_eq!(lemmatize("prototypes", &irregular()), "prototype");
    }

    #[test]
    fn test_ies_becomes_y() {
        assert_eq!(lemmatize("studies", &irregular()), "study");
        assert_eq!(lemmatize("strategies", &irregular()), "strategy");
    }

    #[test]
    fn test_es_after_sibilant() {
        assert_eq!(lemmatize("processes", &irregular()), "process");
        assert_eq!(lemmatize("sketches", &irregular()), "sketch");
        assert_eq!(lemmatize("boxes", &irregular()), "box");
    }

    #[test]
    fn test_singular_endings_untouched() {
        assert_eq!(lemmatize("process", &irregular()), "process");
        assert_eq!(lemmatize("status", &irregular()), "status");
        assert_eq!(lemmatize("analysis", &irregular()), "analysis");
    }

    #[test]
    fn test_irregular_table_wins() {
        assert_eq!(lemmatize("analyses", &irregular()), "analysis");
        assert_eq!(lemmatize("kubernetes", &irregular()), "kubernetes");
    }

    #[test]
    fn test_short_tokens_and_gerunds_untouched() {
        assert_eq!(lemmatize("aws", &irregular()), "aws");
        assert_eq!(lemmatize("testing", &irregular()), "testing");
        assert_eq!(lemmatize("figma", &irregular()), "figma");
    }
}
