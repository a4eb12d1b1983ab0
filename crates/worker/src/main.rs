use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comfypod_comfyui::api::ComfyUIApi;
use comfypod_comfyui::server::ComfyUIServer;
use comfypod_core::config::WorkerConfig;
use comfypod_worker::handler::JobHandler;
use comfypod_worker::ingress;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comfypod_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(api_url = %config.api_url(), "Loaded worker configuration");

    // --- ComfyUI ---
    // One instance per worker lifetime, never restarted. Startup
    // failures are fatal: no job may be accepted against a backend
    // that never came up.
    let server = ComfyUIServer::start(&config).expect("Failed to spawn ComfyUI");

    let api = ComfyUIApi::new(config.api_url());
    server
        .wait_ready(&api, config.startup_timeout())
        .await
        .expect("ComfyUI failed to start within timeout");

    // --- Job ingress ---
    let handler = Arc::new(JobHandler::new(config.clone()));
    let app = ingress::router(handler);

    let addr = SocketAddr::new(
        config
            .worker_host
            .parse()
            .expect("Invalid WORKER_HOST address"),
        config.worker_port,
    );
    tracing::info!(%addr, comfyui_pid = server.pid(), "Worker accepting jobs");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Worker shut down");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
