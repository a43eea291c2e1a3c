use std::sync::Arc;

use crate::config::Config;
use crate::lexicon::Lexicon;
use crate::matching::similarity::SimilarityScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Loaded once at startup, read-only afterwards.
    pub lexicon: Arc<Lexicon>,
    /// Pluggable similarity scorer. Default: LexicalScorer. EmbeddingScorer when EMBEDDING_URL is set.
    pub similarity: Arc<dyn SimilarityScorer>,
}
