use anyhow::{Context, Result};
use audio_relay::capture::CaptureConfig;
use audio_relay::error::SessionError;
use audio_relay::{create_router, AppState, Config, NatsTransport, RecordingSession, SessionConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "audio-relay", about = "Stream microphone audio to a remote endpoint")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/audio-relay")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Transport endpoint: {}", cfg.transport.url);
    info!("Recordings directory: {}", cfg.recordings.output_dir);

    // One transport connection for the lifetime of the process; its events
    // keep the connection flag current.
    let transport = Arc::new(
        NatsTransport::connect(&cfg.transport.url)
            .await
            .context("Failed to set up transport")?,
    );

    let session_config = SessionConfig {
        sample_rate: cfg.capture.sample_rate,
        channels: cfg.capture.channels,
        output_dir: PathBuf::from(&cfg.recordings.output_dir),
        ..SessionConfig::default()
    };

    let session = Arc::new(RecordingSession::new(
        session_config,
        transport.clone() as Arc<dyn audio_relay::ChunkTransport>,
    ));

    let capture = CaptureConfig {
        sample_rate: cfg.capture.sample_rate,
        channels: cfg.capture.channels,
        chunk_interval_ms: cfg.capture.chunk_interval_ms,
    };

    let state = AppState::new(session, transport, capture);
    let app = create_router(state.clone());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Finish any active recording before tearing the transport down
    match state.session.stop().await {
        Ok(stats) => info!(
            "Active recording finalized on shutdown ({} chunks)",
            stats.chunk_count
        ),
        Err(SessionError::NotRecording) => {}
        Err(e) => error!("Failed to finalize recording on shutdown: {}", e),
    }

    state.transport.close().await.ok();

    Ok(())
}
