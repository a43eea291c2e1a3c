//! Orchestrates the two public operations on top of the pipeline stages:
//! keyword extraction (with optional CV matching) and the analyze report.

use std::time::Duration;

use tracing::info;

use crate::analysis::report::{keyword_coverage, overall_score, text_similarity};
use crate::config::Tunables;
use crate::errors::PipelineError;
use crate::extraction::{extract_keywords, Extraction};
use crate::lexicon::Lexicon;
use crate::matching::matcher::{match_keywords_boosted, BoosterOutcome, MatchResult};
use crate::matching::similarity::SimilarityScorer;
use crate::suggestions::bullets::{generate_bullets, BulletSuggestion, MAX_BULLETS};

/// Shared inputs every pipeline run needs.
pub struct PipelineContext<'a> {
    pub lexicon: &'a Lexicon,
    pub tunables: &'a Tunables,
    pub scorer: &'a dyn SimilarityScorer,
    pub booster_timeout: Duration,
}

/// Extraction, matching and bullet suggestions for one JD/CV pair.
#[derive(Debug, Clone)]
pub struct KeywordReport {
    pub extraction: Extraction,
    pub matches: MatchResult,
    pub booster: BoosterOutcome,
    pub bullets: Vec<BulletSuggestion>,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub score: u32,
    pub text_similarity: f64,
    pub keyword_coverage: f64,
    pub keywords: KeywordReport,
}

pub async fn run_keyword_pipeline(
    jd_text: &str,
    cv_text: &str,
    ctx: &PipelineContext<'_>,
) -> Result<KeywordReport, PipelineError> {
    let extraction = extract_keywords(jd_text, ctx.lexicon, ctx.tunables)?;

    let (matches, booster) = match_keywords_boosted(
        &extraction.keywords,
        cv_text,
        ctx.lexicon,
        ctx.tunables,
        ctx.scorer,
        ctx.booster_timeout,
    )
    .await;

    let bullets = generate_bullets(&matches.missing, MAX_BULLETS, ctx.lexicon);

    info!(
        keywords = extraction.keywords.len(),
        matched = matches.matched.len(),
        missing = matches.missing.len(),
        bullets = bullets.len(),
        domain_tags = extraction.domain_tags.len(),
        role_tags = extraction.role_tags.len(),
        "keyword pipeline complete"
    );

    Ok(KeywordReport {
        extraction,
        matches,
        booster,
        bullets,
    })
}

/// Full resume-vs-JD analysis. Unlike extraction, an empty resume is an error.
pub async fn run_analysis(
    resume_text: &str,
    jd_text: &str,
    ctx: &PipelineContext<'_>,
) -> Result<AnalysisReport, PipelineError> {
    if resume_text.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let keywords = run_keyword_pipeline(jd_text, resume_text, ctx).await?;
    let coverage = keyword_coverage(
        keywords.matches.matched.len(),
        keywords.extraction.keywords.len(),
    );
    let similarity = text_similarity(jd_text, resume_text, ctx.lexicon);
    let score = overall_score(coverage, similarity);

    info!(score, coverage, similarity, "analysis complete");

    Ok(AnalysisReport {
        score,
        text_similarity: similarity,
        keyword_coverage: coverage,
        keywords,
    })
}
