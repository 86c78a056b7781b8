//! clima-calc - Climate survey results engine
//!
//! Calculates, verifies and compares campaign results from the command line,
//! or serves the same operations over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clima_calc::{build_router, compare, verify, AppState, ResultsEngine, SqliteStore};
use clima_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use clima_common::db::init_database;

/// Command-line arguments for clima-calc
#[derive(Parser, Debug)]
#[command(name = "clima-calc")]
#[command(about = "Climate survey results engine")]
#[command(version)]
struct Args {
    /// Root folder holding clima.db
    #[arg(short, long, global = true, env = "CLIMA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recalculate results and analytics for a campaign
    Calculate { campaign_id: String },

    /// Check a campaign's stored results
    Verify { campaign_id: String },

    /// Compare global dimension results of two campaigns
    Compare {
        current_id: String,
        previous_id: String,
    },

    /// Serve the HTTP API
    Serve {
        /// Listen address, overrides [server] bind_addr
        #[arg(short, long, env = "CLIMA_BIND_ADDR")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clima-calc v{}", env!("CARGO_PKG_VERSION"));

    config
        .engine
        .validate()
        .context("Invalid [engine] configuration")?;

    let root_folder = RootFolderResolver::new("clima-calc")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(config.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let store = Arc::new(SqliteStore::new(pool));
    let engine = ResultsEngine::new(store, config.engine);

    match args.command {
        Command::Calculate { campaign_id } => {
            let summary = engine
                .calculate(&campaign_id)
                .await
                .with_context(|| format!("Calculation failed for campaign {}", campaign_id))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Verify { campaign_id } => {
            let report = verify::verify_campaign(
                engine.store(),
                &campaign_id,
                engine.settings().response_batch_size,
            )
            .await
            .with_context(|| format!("Verification failed for campaign {}", campaign_id))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.all_passed() {
                warn!("{} of {} checks failed", report.failed, report.checks.len());
                std::process::exit(1);
            }
        }
        Command::Compare {
            current_id,
            previous_id,
        } => {
            let comparison = compare::compare_campaigns(engine.store(), &current_id, &previous_id)
                .await
                .context("Comparison failed")?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        Command::Serve { bind } => {
            let addr = bind.unwrap_or(config.server.bind_addr);
            let app = build_router(AppState::new(engine));

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            info!("clima-calc listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
            info!("Server shutdown complete");
        }
    }

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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
