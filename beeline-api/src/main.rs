//! beeline-api - BeeLine observation service
//!
//! Serves pollinator lookups and the shared observation map backed by a
//! local SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use beeline_common::config::{BeelineConfig, RootFolderInitializer, RootFolderResolver};
use beeline_common::SpeciesTable;
use beeline_api::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for beeline-api
#[derive(Parser, Debug)]
#[command(name = "beeline-api")]
#[command(about = "BeeLine plant observation service")]
#[command(version)]
struct Args {
    /// Root folder holding the database (BEELINE_ROOT_FOLDER is read by the resolver)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "BEELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long, env = "BEELINE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    // Build identification first, before any database delays
    info!(
        "Starting BeeLine API (beeline-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = BeelineConfig::load_or_default(args.config.as_deref());

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = config.database_path(initializer.root_folder());
    info!("Database path: {}", db_path.display());
    let pool = beeline_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let species = SpeciesTable::load_or_builtin(config.species_table.as_deref())
        .context("Failed to load species table")?;
    if species.is_empty() {
        warn!("Species table is empty; every species will resolve as unknown");
    }
    info!("Species table: {} entries", species.len());

    let state = AppState::new(pool, species)
        .with_ingest(config.ingest.clone())
        .with_query(config.query.clone());
    let app = build_router(state);

    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("beeline-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
