//! Glossa application binary - composition root.
//!
//! Ties the Glossa crates together into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Pick a speech source (stdin lines, or a scripted demo)
//! 3. Pick an analysis service (HTTP client, or the built-in mock)
//! 4. Build the engine and start the axum REST API server
//!
//! The session itself is driven over HTTP: POST /session/start begins
//! listening, the dispatch scheduler flushes unsent transcript deltas on its
//! interval, and GET /history serves the analyzed chunks.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use glossa_analysis::{AnalysisService, HttpAnalysisClient, MockAnalysisService};
use glossa_api::AppState;
use glossa_core::config::GlossaConfig;
use glossa_core::error::GlossaError;
use glossa_core::types::AnalysisMode;
use glossa_engine::ListenEngine;
use glossa_source::{ScriptedSource, SpeechSource, StdinSource};

use cli::CliArgs;

/// A short scripted monologue for running without a microphone or stdin.
fn demo_source() -> ScriptedSource {
    let updates = [
        "so the quarterly numbers",
        "so the quarterly numbers are looking stronger than forecast",
        "so the quarterly numbers are looking stronger than forecast, mostly \
         driven by the kubernetes migration",
        "so the quarterly numbers are looking stronger than forecast, mostly \
         driven by the kubernetes migration finishing early and the support \
         backlog dropping",
    ];
    ScriptedSource::from_transcripts(
        updates.iter().map(|s| s.to_string()).collect(),
        Duration::from_secs(4),
    )
}

/// Build the engine around a concrete analysis service and serve.
async fn run<A: AnalysisService + 'static>(
    analysis: A,
    source: Arc<dyn SpeechSource>,
    config: &GlossaConfig,
    port: u16,
) -> Result<(), GlossaError> {
    let engine = Arc::new(ListenEngine::new(
        Arc::new(analysis),
        Some(source),
        config.dispatch.clone(),
    ));
    let state = AppState::new(engine, port);
    glossa_api::start_server(state).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first, so the log level override can come from the file.
    let config_file = args.resolve_config_path();
    let mut config = GlossaConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Glossa v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // CLI overrides.
    if let Some(url) = &args.base_url {
        config.analysis.base_url = url.clone();
    }
    if let Some(interval) = args.interval {
        config.dispatch.interval_secs = interval;
    }
    if let Some(mode) = &args.mode {
        config.dispatch.mode = match mode.as_str() {
            "keywords" => AnalysisMode::Keywords,
            "insights" => AnalysisMode::Insights,
            other => {
                return Err(
                    GlossaError::Config(format!("Unknown analysis mode '{}'", other)).into(),
                )
            }
        };
    }
    let port = args.resolve_port(config.general.port);

    // Speech source.
    let source: Arc<dyn SpeechSource> = match args.source.as_str() {
        "stdin" => {
            tracing::info!("Speech source: stdin (each line extends the transcript)");
            Arc::new(StdinSource::new())
        }
        "demo" => {
            tracing::info!("Speech source: scripted demo monologue");
            Arc::new(demo_source())
        }
        other => {
            return Err(GlossaError::Config(format!("Unknown source '{}'", other)).into());
        }
    };

    tracing::info!(
        interval_secs = config.dispatch.interval_secs,
        mode = %config.dispatch.mode,
        port,
        "Engine configured"
    );

    // Analysis service, then serve until interrupted.
    if args.mock {
        tracing::info!("Analysis service: built-in mock");
        run(MockAnalysisService::new(), source, &config, port).await?;
    } else {
        tracing::info!(base_url = %config.analysis.base_url, "Analysis service: HTTP");
        let client = HttpAnalysisClient::new(&config.analysis)
            .map_err(|e| GlossaError::Config(e.to_string()))?;
        run(client, source, &config, port).await?;
    }

    Ok(())
}
