//! Roomgate Service
//!
//! Entry point for the room lifecycle and access orchestrator. Bridges a
//! multi-party room host to a policy backend over signed webhooks.

use roomgate_service::config::Config;
use roomgate_service::recording::RecordingPipeline;
use roomgate_service::rooms::RoomRegistry;
use roomgate_service::routes::{self, AppState};
use roomgate_service::validator::AccessValidator;
use roomgate_service::webhook::{WebhookClient, WebhookDispatcher};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomgate_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Roomgate");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        backend = %config.backend_base_url,
        bind_address = %config.bind_address,
        fail_policy = ?config.fail_policy,
        recording = config.recording.is_some(),
        "Configuration loaded successfully"
    );

    // Wire the backend client and the actor system
    let client = WebhookClient::new(&config)?;
    let dispatcher = WebhookDispatcher::new(client.clone());
    let validator = AccessValidator::new(client, config.fail_policy);
    let recording = RecordingPipeline::new(config.recording.clone());
    let recording_configured = recording.is_configured();

    let (registry, registry_task) = RoomRegistry::spawn(dispatcher, validator, recording);

    // Create application state
    let state = Arc::new(AppState {
        registry: registry.clone(),
        recording_configured,
    });

    // Build application routes
    let app = routes::build_routes(state);

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Roomgate listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the actor system after the HTTP server drains
    registry.shutdown().await;
    let _ = registry_task.await;

    info!("Roomgate shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
