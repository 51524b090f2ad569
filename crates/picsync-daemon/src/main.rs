//! picsync Daemon - Background synchronization service
//!
//! This binary runs as a user service and:
//! - Loads and validates the configuration
//! - Connects to Google Drive with the tokens stored by `picsync auth login`
//! - Restores the sync context from the state database
//! - Runs the fixed-rate sync scheduler until SIGINT/SIGTERM
//!
//! # Exit codes
//!
//! - `0` after a graceful shutdown
//! - `1` when bootstrap fails (configuration, credentials, database)
//! - `2` when the scheduler halts on a fatal cycle error

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use picsync_cache::{DatabasePool, SqliteCursorStore};
use picsync_core::config::{expand_tilde, Config, LoggingConfig};
use picsync_core::domain::RemoteId;
use picsync_core::ports::{ICursorStore, IRemoteStore};
use picsync_sync::engine::{resolve_root_id, EngineOptions, SyncEngine};
use picsync_sync::filesystem::LocalFileSystemAdapter;
use picsync_sync::memory::InMemoryCursorStore;
use picsync_sync::scheduler::{SchedulerExit, SchedulerOptions, SyncScheduler};
use picsync_transform::TransformPipeline;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_BOOTSTRAP: u8 = 1;
const EXIT_HALTED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "picsyncd", version, about = "picsync background synchronization daemon")]
struct Args {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// Logging
// ============================================================================

/// Installs the global subscriber; `RUST_LOG` wins over `logging.level`
fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

async fn open_cursor_store(config: &Config) -> Result<Arc<dyn ICursorStore>> {
    if !config.sync.persist_cursor {
        info!("Cursor persistence disabled, keeping sync state in memory");
        return Ok(Arc::new(InMemoryCursorStore::new()));
    }
    let db_path = expand_tilde(&config.sync.state_db);
    let pool = DatabasePool::new(&db_path)
        .await
        .context("Failed to open state database")?;
    Ok(Arc::new(SqliteCursorStore::new(pool.pool().clone())))
}

/// Wires every adapter and returns a scheduler ready to run
async fn bootstrap(config: &Config) -> Result<SyncScheduler> {
    let remote: Arc<dyn IRemoteStore> = Arc::new(
        picsync_drive::auth::connect(&config.auth)
            .await
            .context("Failed to connect to Google Drive")?,
    );

    let configured_root =
        RemoteId::new(config.remote.root_id.clone()).context("Invalid remote.root_id")?;
    let root = resolve_root_id(remote.as_ref(), &configured_root).await?;

    let cursor_store = open_cursor_store(config).await?;
    let context = cursor_store
        .load()
        .await
        .context("Failed to load sync context")?
        .unwrap_or_default();
    info!(
        cursor = %context.cursor.last_sync_time(),
        backup = ?context.backup.as_ref().map(|b| b.name()),
        "Restored sync context"
    );

    let engine = SyncEngine::new(
        remote,
        Arc::new(LocalFileSystemAdapter::new()),
        root,
        EngineOptions::from_config(config),
    );

    let mut scheduler = SyncScheduler::new(
        engine,
        cursor_store,
        context,
        SchedulerOptions::from_config(config),
    );
    if config.transform.enabled {
        let pipeline = TransformPipeline::from_config(&config.transform)
            .context("Invalid transform configuration")?;
        scheduler = scheduler.with_transformer(Arc::new(pipeline));
    }

    Ok(scheduler)
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

fn exit_code(exit: &SchedulerExit) -> u8 {
    match exit {
        SchedulerExit::Cancelled => 0,
        SchedulerExit::Halted(_) => EXIT_HALTED,
    }
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Tracing is not installed yet, so configuration errors go to stderr.
    let config = match load_config(args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("picsyncd: {e:#}");
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    };
    init_tracing(&config.logging);

    info!("picsync daemon starting (picsyncd)");

    let mut scheduler = match bootstrap(&config).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Bootstrap failed");
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    };

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let exit = scheduler.run(shutdown_token).await;
    match &exit {
        SchedulerExit::Cancelled => info!("picsync daemon shut down gracefully"),
        SchedulerExit::Halted(reason) => error!(reason = %reason, "picsync daemon halted"),
    }

    ExitCode::from(exit_code(&exit))
}

// ============================================================================
// Tests
// ============================================================================
