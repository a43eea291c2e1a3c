mod analysis;
mod config;
mod errors;
mod extraction;
mod lexicon;
mod matching;
mod routes;
mod state;
mod suggestions;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::lexicon::Lexicon;
use crate::matching::similarity::{EmbeddingScorer, LexicalScorer, SimilarityScorer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobFit API v{}", env!("CARGO_PKG_VERSION"));

    // Lexicon is required: without it extraction is meaningless.
    let lexicon = Lexicon::load(config.lexicon_dir.as_deref())
        .context("failed to load lexicon, refusing to serve")?;
    info!(
        "Lexicon loaded from {} ({} entries)",
        config
            .lexicon_dir
            .as_ref()
            .map_or_else(|| "embedded defaults".to_string(), |d| d.display().to_string()),
        lexicon.entry_count()
    );

    // Initialize similarity scorer (LexicalScorer unless EMBEDDING_URL is set)
    let similarity: Arc<dyn SimilarityScorer> = match &config.embedding_url {
        Some(url) => {
            let scorer = EmbeddingScorer::new(url.clone(), config.booster_timeout)
                .context("failed to build embedding client")?;
            info!("Semantic booster enabled ({url}, timeout {:?})", config.booster_timeout);
            Arc::new(scorer)
        }
        None => {
            info!("Semantic booster disabled; lexical matching only");
            Arc::new(LexicalScorer)
        }
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        lexicon: Arc::new(lexicon),
        similarity,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
