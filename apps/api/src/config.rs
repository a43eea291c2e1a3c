use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::extraction::ranking::ScoringWeights;

/// Application configuration loaded from environment variables.
/// Every variable is optional; defaults reproduce the stock pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory with lexicon JSON overrides. Embedded lexicon when unset.
    pub lexicon_dir: Option<PathBuf>,
    /// Embedding endpoint for the semantic booster. Booster disabled when unset.
    pub embedding_url: Option<String>,
    pub booster_timeout: Duration,
    pub tunables: Tunables,
}

/// Pipeline constants that have no documented derivation and are therefore
/// exposed as tunables. Output caps (30 keywords, 7 missing) are not tunable.
#[derive(Debug, Clone)]
pub struct Tunables {
    pub weights: ScoringWeights,
    /// Jaccard similarity at which two keywords are near-duplicates.
    pub dedup_threshold: f64,
    /// Token-set similarity for the fuzzy match rule.
    pub fuzzy_threshold: f64,
    /// Cosine similarity the semantic booster must reach.
    pub semantic_threshold: f64,
    /// Lowest lexical similarity for which the booster is consulted at all.
    pub borderline_threshold: f64,
    /// Segments after a boosting heading that still count as "near" it.
    pub proximity_window: usize,
    pub min_jd_chars: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            dedup_threshold: 0.75,
            fuzzy_threshold: 0.90,
            semantic_threshold: 0.85,
            borderline_threshold: 0.75,
            proximity_window: 8,
            min_jd_chars: 40,
        }
    }
}

impl Tunables {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("DEDUP_THRESHOLD", self.dedup_threshold),
            ("FUZZY_THRESHOLD", self.fuzzy_threshold),
            ("SEMANTIC_THRESHOLD", self.semantic_threshold),
            ("BORDERLINE_THRESHOLD", self.borderline_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                bail!("{name} must be in (0, 1], got {value}");
            }
        }
        if self.borderline_threshold > self.fuzzy_threshold {
            bail!("BORDERLINE_THRESHOLD must not exceed FUZZY_THRESHOLD");
        }
        self.weights.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            lexicon_dir: None,
            embedding_url: None,
            booster_timeout: Duration::from_millis(1200),
            tunables: Tunables::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Tunables::default();
        let weights = match optional_env("SCORE_WEIGHTS") {
            Some(raw) => parse_weights(&raw).context("SCORE_WEIGHTS is invalid")?,
            None => defaults.weights.clone(),
        };

        let tunables = Tunables {
            weights,
            dedup_threshold: parse_env("DEDUP_THRESHOLD", defaults.dedup_threshold)?,
            fuzzy_threshold: parse_env("FUZZY_THRESHOLD", defaults.fuzzy_threshold)?,
            semantic_threshold: parse_env("SEMANTIC_THRESHOLD", defaults.semantic_threshold)?,
            borderline_threshold: parse_env(
                "BORDERLINE_THRESHOLD",
                defaults.borderline_threshold,
            )?,
            proximity_window: parse_env("PROXIMITY_WINDOW", defaults.proximity_window)?,
            min_jd_chars: parse_env("MIN_JD_CHARS", defaults.min_jd_chars)?,
        };
        tunables.validate()?;

        Ok(Config {
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            lexicon_dir: optional_env("LEXICON_DIR").map(PathBuf::from),
            embedding_url: optional_env("EMBEDDING_URL"),
            booster_timeout: Duration::from_millis(parse_env("BOOSTER_TIMEOUT_MS", 1200u64)?),
            tunables,
        })
    }
}

/// Parses `"tf,proximity,specificity"`, e.g. `"0.4,0.3,0.3"`.
pub fn parse_weights(raw: &str) -> Result<ScoringWeights> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .with_context(|| format!("'{}' is not a number", p.trim()))
        })
        .collect::<Result<_>>()?;

    let [term_frequency, section_proximity, specificity] = parts.as_slice() else {
        bail!("expected three comma-separated weights, got {}", parts.len());
    };

    let weights = ScoringWeights {
        term_frequency: *term_frequency,
        section_proximity: *section_proximity,
        specificity: *specificity,
    };
    weights.validate()?;
    Ok(weights)
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tunables_are_valid() {
        assert!(Tunables::default().validate().is_ok());
    }

    #[test]
    fn test_parse_weights_three_values() {
        let w = parse_weights("0.5, 0.25, 0.25").unwrap();
        assert!((w.term_frequency - 0.5).abs() < f64::EPSILON);
        assert!((w.section_proximity - 0.25).abs() < f64::EPSILON);
        assert!((w.specificity - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_weights_wrong_arity() {
        assert!(parse_weights("0.5,0.5").is_err());
        assert!(parse_weights("0.2,0.2,0.2,0.4").is_err());
    }

    #[test]
    fn test_parse_weights_rejects_garbage() {
        assert!(parse_weights("a,b,c").is_err());
        assert!(parse_weights("-1,0.5,0.5").is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let tunables = Tunables {
            fuzzy_threshold: 1.5,
            ..Tunables::default()
        };
        assert!(tunables.validate().is_err());
    }

    #[test]
    fn test_borderline_above_fuzzy_rejected() {
        let tunables = Tunables {
            borderline_threshold: 0.95,
            ..Tunables::default()
        };
        assert!(tunables.validate().is_err());
    }
}
