//! Entry point: load configuration, build the three vendor adapters, bind
//! the listener, and serve until a shutdown signal arrives (spec.md §6's
//! CLI surface — one command, no subcommands, non-zero exit on
//! unrecoverable startup failure).

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use reqwest::Client;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use voice_gateway_clients::{ElevenLabsTtsClient, OpenAiLlmClient, SarvamSttClient};
use voice_gateway_config::Settings;
use voice_gateway_pipeline::TurnOrchestrator;
use voice_gateway_server::gateway::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before Settings::from_env so a present-but-not-yet-read .env
    // file can't race the ambient environment (see settings.rs).
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let http = Client::new();
    let orchestrator = Arc::new(TurnOrchestrator::new(
        Arc::new(SarvamSttClient::new(http.clone(), settings.sarvam_api_key.clone())),
        Arc::new(OpenAiLlmClient::new(http.clone(), settings.openai_api_key.clone())),
        Arc::new(ElevenLabsTtsClient::new(http.clone(), settings.elevenlabs_api_key.clone())),
    ));

    let state = AppState {
        orchestrator,
        language_hint: Arc::from(settings.stt_language_hint.as_str()),
        voice_id: Arc::from(settings.elevenlabs_voice_id.as_str()),
    };
    let app = voice_gateway_server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "voice gateway listening");

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "server exited with an error");
        return ExitCode::FAILURE;
    }

    tracing::info!("shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "voice_gateway=info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
