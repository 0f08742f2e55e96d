//! clinic-tuss - TUSS reference data service
//!
//! Downloads the ANS TUSS terminology archive on demand, loads the relevant
//! tables into the clinic database and serves statistics and code search.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use clinic_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_tuss::services::{ImporterConfig, TussImporter};
use clinic_tuss::{AppState, DEFAULT_PORT, MODULE_NAME};

#[derive(Parser, Debug)]
#[command(name = "clinic-tuss")]
#[command(about = "TUSS reference data import service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CLINIC_TUSS_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and working directory
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform search locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TUSS archive URL
    #[arg(long, env = "CLINIC_TUSS_SOURCE_URL")]
    source_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load(MODULE_NAME, args.config.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting {} v{} (git {}, built {}, {})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml(&toml_config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let db = clinic_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    let mut importer_config = ImporterConfig::new(initializer.work_dir());
    if let Some(url) = args.source_url.or(toml_config.tuss.source_url) {
        importer_config = importer_config.with_source_url(url);
    }
    if let Some(secs) = toml_config.tuss.download_timeout_secs {
        importer_config = importer_config.with_download_timeout(Duration::from_secs(secs));
    }
    info!(
        url = %importer_config.source_url,
        work_dir = %importer_config.work_dir.display(),
        "TUSS importer configured"
    );
    let importer = TussImporter::new(importer_config).context("Failed to build HTTP client")?;

    let app = clinic_tuss::build_router(AppState::new(db, importer));

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
