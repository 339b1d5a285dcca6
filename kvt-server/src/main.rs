//! kvt-server - media library backend
//!
//! Subcommands:
//! - `serve` (default): HTTP API plus the background ingestion pipeline
//! - `add-user`: create a login
//! - `scan-once`: run one ingestion cycle and print its report

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kvt_common::config::{load_config, AppConfig};
use kvt_server::{build_router, AppContext};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for kvt-server
#[derive(Parser, Debug)]
#[command(name = "kvt-server")]
#[command(about = "Personal media library server")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "KVT_CONFIG")]
    config: Option<PathBuf>,

    /// Library root folder (indexed audio, artwork, default database)
    #[arg(short, long, env = "KVT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Directory scanned for new audio files
    #[arg(short, long, env = "KVT_STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "KVT_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and ingest staged files (default)
    Serve,
    /// Create a user
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Run a single ingestion cycle and exit
    ScanOnce,
}

/// Wait for blocking threads at exit; a pending console read never returns
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(args.root_folder, args.staging_dir, args.port);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config);

    info!("Starting kvt-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Root folder: {}", config.root_folder().display());
    info!("Database path: {}", config.database_path().display());
    info!("Staging directory: {}", config.staging_dir().display());

    let config = Arc::new(config);
    let cancel = CancellationToken::new();
    let ctx = AppContext::open(Arc::clone(&config), cancel.clone())
        .await
        .context("Failed to open library")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(ctx, cancel).await,
        Command::AddUser { name, password } => add_user(&ctx, &name, &password).await,
        Command::ScanOnce => scan_once(&ctx, &cancel).await,
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            format!(
                "kvt_server={level},kvt_common={level},tower_http={level}",
                level = config.logging.level
            )
            .into()
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(ctx: AppContext, cancel: CancellationToken) -> Result<()> {
    let config = Arc::clone(&ctx.config);

    let pipeline_task = if config.ingest.enabled {
        let pipeline = ctx.ingestion_pipeline();
        let token = cancel.clone();
        Some(tokio::spawn(async move { pipeline.run(token).await }))
    } else {
        info!("Ingestion disabled by configuration");
        None
    };

    let app = build_router(ctx);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("kvt-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Some(task) = pipeline_task {
        if let Err(e) = task.await {
            error!("Ingestion pipeline task failed: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn add_user(ctx: &AppContext, name: &str, password: &str) -> Result<()> {
    let passwords = Arc::clone(&ctx.passwords);
    let plaintext = password.to_string();
    let hash = tokio::task::spawn_blocking(move || passwords.hash(&plaintext))
        .await
        .context("Password hashing task failed")?;

    let user = ctx
        .store
        .add_user(name, &hash)
        .await
        .with_context(|| format!("Failed to create user '{}'", name))?;

    println!("Created user {} (id {})", user.name, user.id);
    Ok(())
}

async fn scan_once(ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
    let pipeline = ctx.ingestion_pipeline();
    let report = pipeline
        .scan_once(cancel)
        .await
        .context("Scan failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
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
                warn!("Failed to install signal handler: {}", e);
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
