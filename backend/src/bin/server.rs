//! OpenAir HTTP server binary.
//!
//! # Usage
//!
//! ```bash
//! # In-memory repository (default)
//! cargo run --bin openair-server
//!
//! # PostgreSQL repository
//! cargo run --bin openair-server --features postgres-repo -- \
//!   --db-host localhost --db-user openair --db-pass openair
//!
//! # Repository from a config file
//! cargo run --bin openair-server --features postgres-repo -- --config repository.toml
//! ```
//!
//! `RUST_LOG` overrides the log filter selected by `--debug`.

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use openair_api::config::ServerArgs;
use openair_api::db;
use openair_api::http::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting OpenAir API server");

    let repository = db::init_repository(args.repository_builder()?).await?;
    info!("Repository initialized");

    let app = create_router(AppState::new(repository));

    let addr = args.bind_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            // Server exited on its own.
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("Stopping server");
            let _ = stop_tx.send(());
        }
    }

    match tokio::time::timeout(args.graceful_timeout, server).await {
        Ok(result) => result??,
        Err(_) => error!(
            timeout = ?args.graceful_timeout,
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("can't listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("can't listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
