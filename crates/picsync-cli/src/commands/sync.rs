//! Sync command - Run one synchronization cycle in the foreground
//!
//! Wires the same adapters as the daemon, runs a single cycle against the
//! stored sync context, saves the context and prints the cycle report.
//! A failed cycle leaves the stored cursor untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use picsync_cache::{DatabasePool, SqliteCursorStore};
use picsync_core::config::{expand_tilde, Config};
use picsync_core::domain::{CycleReport, RemoteId};
use picsync_core::ports::{ICursorStore, IImageTransformer, IRemoteStore};
use picsync_sync::engine::{resolve_root_id, EngineOptions, SyncEngine};
use picsync_sync::filesystem::LocalFileSystemAdapter;
use picsync_sync::memory::InMemoryCursorStore;
use picsync_transform::TransformPipeline;
use tracing::{info, warn};

use crate::output::{format_bytes, get_formatter, pluralize, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// List every matching file regardless of the stored cursor
    #[arg(long)]
    pub full: bool,

    /// Leave downloaded files where they are on Drive
    #[arg(long)]
    pub no_backup: bool,

    /// Skip the resize/convert step even if enabled in the config
    #[arg(long)]
    pub no_transform: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let config = super::load_config(config_path)?;

        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                fmt.error(&error.to_string());
            }
            bail!("Invalid configuration ({})", pluralize(errors.len(), "error"));
        }

        let remote: Arc<dyn IRemoteStore> = Arc::new(
            picsync_drive::auth::connect(&config.auth)
                .await
                .context("Failed to connect to Google Drive")?,
        );
        let configured_root =
            RemoteId::new(config.remote.root_id.clone()).context("Invalid remote.root_id")?;
        let root = resolve_root_id(remote.as_ref(), &configured_root).await?;

        let cursor_store = open_cursor_store(&config).await?;
        let mut context = cursor_store
            .load()
            .await
            .context("Failed to load sync context")?
            .unwrap_or_default();

        let engine = SyncEngine::new(
            remote,
            Arc::new(LocalFileSystemAdapter::new()),
            root,
            self.engine_options(&config),
        );

        fmt.info("Synchronizing pictures...");
        let report = engine.run_cycle(&mut context).await?;

        if let Err(e) = cursor_store.save(&context).await {
            warn!(error = %e, "Failed to persist sync context");
            fmt.warn(&format!("Sync context was not saved: {e:#}"));
        }

        let converted = if config.transform.enabled && !self.no_transform {
            self.transform(&config, &report).await?
        } else {
            Vec::new()
        };

        info!(
            cycle_id = %report.cycle_id,
            downloaded = report.downloaded.len(),
            converted = converted.len(),
            "Sync command finished"
        );
        print_report(&*fmt, format, &report, &converted);
        Ok(())
    }

    /// Engine options from the config with the command-line overrides applied
    fn engine_options(&self, config: &Config) -> EngineOptions {
        let mut options = EngineOptions::from_config(config);
        if self.full {
            options.incremental = false;
        }
        if self.no_backup {
            options.backup = false;
        }
        options
    }

    async fn transform(&self, config: &Config, report: &CycleReport) -> Result<Vec<PathBuf>> {
        let inputs = report.downloaded_paths();
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let pipeline = TransformPipeline::from_config(&config.transform)
            .context("Invalid transform configuration")?;
        tokio::task::spawn_blocking(move || pipeline.transform(&inputs))
            .await
            .context("Transform task panicked")
    }
}

async fn open_cursor_store(config: &Config) -> Result<Arc<dyn ICursorStore>> {
    if !config.sync.persist_cursor {
        return Ok(Arc::new(InMemoryCursorStore::new()));
    }
    let pool = DatabasePool::new(&expand_tilde(&config.sync.state_db))
        .await
        .context("Failed to open state database")?;
    Ok(Arc::new(SqliteCursorStore::new(pool.pool().clone())))
}

// ============================================================================
// Report rendering
// ============================================================================

fn report_json(report: &CycleReport, converted: &[PathBuf]) -> serde_json::Value {
    serde_json::json!({
        "cycle_id": report.cycle_id.to_string(),
        "state": report.final_state.to_string(),
        "started_at": report.started_at.to_rfc3339(),
        "duration_ms": report.duration_ms,
        "listed": report.listed,
        "pages": report.pages,
        "listing_complete": report.listing_complete,
        "downloaded": report.downloaded.iter().map(|r| serde_json::json!({
            "name": r.source.name().as_str(),
            "path": r.local_path.display().to_string(),
            "bytes": r.bytes,
        })).collect::<Vec<_>>(),
        "skipped": report.skipped,
        "backed_up": report.backed_up,
        "converted": converted.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "errors": report.errors,
        "cursor": report.cursor_after.to_rfc3339(),
    })
}

fn summary_lines(report: &CycleReport, converted: &[PathBuf]) -> Vec<String> {
    let bytes: u64 = report.downloaded.iter().map(|r| r.bytes).sum();
    let mut lines = vec![
        format!(
            "Listed:       {} in {}",
            pluralize(report.listed, "file"),
            pluralize(report.pages as usize, "page")
        ),
        format!(
            "Downloaded:   {} ({})",
            pluralize(report.downloaded.len(), "file"),
            format_bytes(bytes)
        ),
        format!("Skipped:      {} already present", report.skipped.len()),
        format!("Backed up:    {}", report.backed_up),
    ];
    if !converted.is_empty() {
        lines.push(format!("Converted:    {}", pluralize(converted.len(), "file")));
    }
    lines.push(format!(
        "Cursor:       {}",
        report.cursor_after.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines
}

fn print_report(
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
    report: &CycleReport,
    converted: &[PathBuf],
) {
    if format.is_json() {
        fmt.print_json(&report_json(report, converted));
        return;
    }

    if report.is_noop() && report.listing_complete {
        fmt.success("Everything is up to date");
    } else {
        fmt.success(&format!("Sync completed in {} ms", report.duration_ms));
    }
    for line in summary_lines(report, converted) {
        fmt.info(&line);
    }
    if !report.listing_complete {
        fmt.warn("Listing stopped early; remaining files will be picked up next time");
    }
    for error in &report.errors {
        fmt.warn(error);
    }
}
