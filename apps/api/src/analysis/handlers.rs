//! Axum route handlers for the keyword and analyze API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::analysis::pipeline::{run_analysis, run_keyword_pipeline, KeywordReport, PipelineContext};
use crate::errors::AppError;
use crate::extraction::filter::DroppedCandidate;
use crate::lexicon::KeywordCategory;
use crate::matching::matcher::{BoosterOutcome, KeywordPresence};
use crate::state::AppState;
use crate::suggestions::bullets::BulletSuggestion;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractKeywordsRequest {
    pub jd_text: String,
    /// Optional CV; without it every keyword is reported missing.
    #[serde(default)]
    pub cv_text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractKeywordsResponse {
    pub all_keywords: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub bullet_suggestions: Vec<String>,
    pub debug: ExtractionDebug,
}

#[derive(Debug, Serialize)]
pub struct KeywordScore {
    pub keyword: String,
    pub score: f64,
    pub is_whitelisted: bool,
    pub category: Option<KeywordCategory>,
}

/// Diagnostics that explain how the keyword lists were reached.
#[derive(Debug, Serialize)]
pub struct ExtractionDebug {
    pub domain_tags: Vec<String>,
    pub role_tags: Vec<String>,
    pub dropped_examples: Vec<DroppedCandidate>,
    pub candidate_count: usize,
    pub keyword_scores: Vec<KeywordScore>,
    pub presence: Vec<KeywordPresence>,
    pub similarity_backend: &'static str,
    pub booster: BoosterOutcome,
    pub bullets: Vec<BulletSuggestion>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume_file_text: String,
    pub job_description_text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub score: u32,
    #[serde(rename = "textSimilarity")]
    pub text_similarity: f64,
    #[serde(rename = "keywordCoverage")]
    pub keyword_coverage: f64,
    pub all_keywords: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub bullet_suggestions: Vec<String>,
    pub domain_tags: Vec<String>,
    pub role_tags: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

fn pipeline_context(state: &AppState) -> PipelineContext<'_> {
    PipelineContext {
        lexicon: &state.lexicon,
        tunables: &state.config.tunables,
        scorer: state.similarity.as_ref(),
        booster_timeout: state.config.booster_timeout,
    }
}

fn bullet_texts(bullets: &[BulletSuggestion]) -> Vec<String> {
    bullets.iter().map(|b| b.text.clone()).collect()
}

/// POST /api/v1/keywords/extract
///
/// Ranked JD keywords, matched/missing against the optional CV, bullet
/// suggestions for the gaps, and a debug block.
pub async fn handle_extract_keywords(
    State(state): State<AppState>,
    Json(request): Json<ExtractKeywordsRequest>,
) -> Result<Json<ExtractKeywordsResponse>, AppError> {
    let ctx = pipeline_context(&state);
    let report = run_keyword_pipeline(&request.jd_text, &request.cv_text, &ctx).await?;
    let backend = state.similarity.backend();

    let KeywordReport {
        extraction,
        matches,
        booster,
        bullets,
    } = report;

    let keyword_scores = extraction
        .keywords
        .iter()
        .map(|k| KeywordScore {
            keyword: k.canonical_text.clone(),
            score: k.score,
            is_whitelisted: k.is_whitelisted,
            category: k.category,
        })
        .collect();

    Ok(Json(ExtractKeywordsResponse {
        all_keywords: extraction.keyword_texts(),
        matched_keywords: matches.matched_in_rank_order(),
        missing_keywords: matches.missing,
        bullet_suggestions: bullet_texts(&bullets),
        debug: ExtractionDebug {
            domain_tags: extraction.domain_tags,
            role_tags: extraction.role_tags,
            dropped_examples: extraction.dropped_examples,
            candidate_count: extraction.candidate_count,
            keyword_scores,
            presence: matches.presence,
            similarity_backend: backend,
            booster,
            bullets,
        },
    }))
}

/// POST /api/v1/analyze
///
/// Scores a resume against a job description.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let ctx = pipeline_context(&state);
    let report = run_analysis(
        &request.resume_file_text,
        &request.job_description_text,
        &ctx,
    )
    .await?;

    let keywords = report.keywords;
    Ok(Json(AnalyzeResponse {
        score: report.score,
        text_similarity: report.text_similarity,
        keyword_coverage: report.keyword_coverage,
        all_keywords: keywords.extraction.keyword_texts(),
        matched_keywords: keywords.matches.matched_in_rank_order(),
        missing_keywords: keywords.matches.missing,
        bullet_suggestions: bullet_texts(&keywords.bullets),
        domain_tags: keywords.extraction.domain_tags,
        role_tags: keywords.extraction.role_tags,
    }))
}
