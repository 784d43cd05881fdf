//! Entox API Server
//!
//! REST API server for causal relation extraction.

use anyhow::Context;
use entox_api::{create_router, state::AppState};
use entox_core::{AppConfig, LoggingConfig};
use entox_extractor::{NlpPipeline, TreebankPipeline};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static PIPELINE: OnceCell<Arc<dyn NlpPipeline>> = OnceCell::new();

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "entox_api={level},entox_extractor={level},tower_http=info",
            level = logging.level
        )
        .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::var("ENTOX_CONFIG") {
        Ok(path) => Ok(AppConfig::from_file(path)?.with_env_override()?),
        Err(_) => Ok(AppConfig::from_env()?),
    }
}

/// Load the pipeline once per process
fn pipeline(config: &AppConfig) -> anyhow::Result<Arc<dyn NlpPipeline>> {
    PIPELINE
        .get_or_try_init(|| {
            let path = config
                .pipeline
                .treebank
                .as_ref()
                .context("no treebank configured (set ENTOX_TREEBANK)")?;
            let pipeline = TreebankPipeline::from_file(path)?;
            Ok::<_, anyhow::Error>(Arc::new(pipeline) as Arc<dyn NlpPipeline>)
        })
        .cloned()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let pipeline = pipeline(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, pipeline));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Entox API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
