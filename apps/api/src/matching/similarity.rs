//! Similarity scorers: pluggable, trait-based phrase similarity.
//!
//! Default: `LexicalScorer` (edit-based phrase similarity, deterministic).
//! Optional: `EmbeddingScorer` (cosine of embeddings from an HTTP endpoint),
//! used only as a best-effort booster for borderline keywords.
//!
//! `AppState` holds an `Arc<dyn SimilarityScorer>`, chosen at startup via config.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding endpoint returned status {status}")]
    Status { status: u16 },

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("similarity check timed out after {ms}ms")]
    Timeout { ms: u64 },
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    /// Short name reported in diagnostics.
    fn backend(&self) -> &'static str;

    /// Whether this scorer adds anything beyond the built-in lexical rules.
    /// The matcher skips the booster phase entirely when it does not.
    fn is_enhanced(&self) -> bool {
        false
    }

    /// Similarity of two phrases in `[0, 1]` (cosine may dip below 0).
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LexicalScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct LexicalScorer;

#[async_trait]
impl SimilarityScorer for LexicalScorer {
    fn backend(&self) -> &'static str {
        "lexical"
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        let a: Vec<String> = a.split_whitespace().map(str::to_string).collect();
        let b: Vec<String> = b.split_whitespace().map(str::to_string).collect();
        Ok(phrase_similarity(&a, &b))
    }
}

/// Indel ratio of the two phrases joined with single spaces:
/// `2 * lcs / (len_a + len_b)` over characters. Tolerates suffixes and typos
/// but keeps short, different words apart ("react" vs "reach" is 0.8).
pub fn phrase_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.join(" ").chars().collect();
    let b: Vec<char> = b.join(" ").chars().collect();
    2.0 * lcs_len(&a, &b) as f64 / (a.len() + b.len()) as f64
}

/// Longest common subsequence length, two-row table.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

// ────────────────────────────────────────────────────────────────────────────
// EmbeddingScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 2],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Calls an embedding endpoint (`POST {"input": [a, b]}` →
/// `{"embeddings": [[..], [..]]}`) and returns the cosine similarity.
#[derive(Clone)]
pub struct EmbeddingScorer {
    client: Client,
    endpoint: String,
}

impl EmbeddingScorer {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, SimilarityError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SimilarityScorer for EmbeddingScorer {
    fn backend(&self) -> &'static str {
        "embedding"
    }

    fn is_enhanced(&self) -> bool {
        true
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { input: [a, b] })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SimilarityError::Status {
                status: status.as_u16(),
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        match body.embeddings.as_slice() {
            [left, right] => cosine(left, right),
            other => Err(SimilarityError::Malformed(format!(
                "expected 2 embeddings, got {}",
                other.len()
            ))),
        }
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(SimilarityError::Malformed(format!(
            "embedding dimensions differ or are empty ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}
