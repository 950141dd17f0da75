//! Stack calculator service binary.
//!
//! Run with: cargo run -p stackcalc-server
//!
//! Serves the WebSocket endpoints `/rpc` and `/interact`.

use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use stackcalc_session::Dispatcher;
use stackcalc_transport::websocket::create_router;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Multi-session stack calculator service.
#[derive(Parser, Debug)]
#[command(name = "stackcalc-server")]
#[command(about = "Stack calculator sessions over WebSocket")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:10000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let dispatcher = Arc::new(Dispatcher::new());
    let app = create_router(dispatcher).layer(CorsLayer::permissive());

    tracing::info!("Server listening on {}", args.addr);

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
