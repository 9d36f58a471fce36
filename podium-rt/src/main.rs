//! podium-rt — real-time coaching feedback service entrypoint
//!
//! Constructs the collaborators once at process start and injects them
//! into the engine; no hidden global state.

use anyhow::Result;
use clap::Parser;
use podium_rt::analyzers::{OnboardAudioAnalyzer, OnboardVisionAnalyzer};
use podium_rt::api::{server, AppContext};
use podium_rt::baseline::NoBaselineStore;
use podium_rt::bus::MemoryBus;
use podium_rt::config::Config;
use podium_rt::engine::FeedbackEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "podium-rt", about = "Real-time coaching feedback service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "PODIUM_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(long, env = "PODIUM_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Podium Feedback (podium-rt) v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    info!(
        "frame_sample_rate={} feedback_interval_ms={} analyzer_timeout_ms={:?}",
        config.frame_sample_rate, config.feedback_interval_ms, config.analyzer_timeout_ms
    );

    // In-process side-channel; a networked substrate would implement
    // the same FeedbackBus trait
    let bus = Arc::new(MemoryBus::default());

    let engine = Arc::new(FeedbackEngine::new(
        &config,
        Arc::new(OnboardAudioAnalyzer),
        Arc::new(OnboardVisionAnalyzer),
        Arc::new(NoBaselineStore),
        bus,
    ));

    let ctx = AppContext::new(engine, &config);
    server::run(&config, ctx).await?;

    Ok(())
}
