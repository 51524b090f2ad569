//! Sync engine - one incremental sync cycle
//!
//! A cycle lists the remote root for files newer than the watermark,
//! downloads the ones without a local copy, optionally moves them into the
//! dated backup container, and finally advances the watermark to the instant
//! the cycle started.
//!
//! ## Design Notes
//!
//! - All cross-cycle state lives in the [`SyncContext`] passed in by the
//!   caller. The engine itself holds only collaborators and options.
//! - The watermark becomes the cycle *start* instant, never the completion
//!   instant, so a file modified while a long cycle runs is listed again
//!   next time instead of being skipped.
//! - A fatal error returns before the cursor step, leaving the watermark
//!   untouched so the next cycle re-lists the same window.
//! - A failed listing page is not fatal: the files from earlier pages are
//!   processed and the cycle completes. An authorization failure is fatal
//!   wherever it happens. It is recognized by the [`RemoteError`] marker
//!   the adapter attaches, never by message text.
//! - A backup container that cannot be resolved only disables the backup
//!   step for this cycle; the next cycle tries again.
//! - Dedup is by local path existence only.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use picsync_core::config::{expand_tilde, Config, FailurePolicy};
use picsync_core::domain::{
    BackupContainer, BackupPeriod, CycleReport, CycleState, DownloadRecord, ListQuery,
    RemoteFileDescriptor, RemoteId, SyncContext, SyncCursor,
};
use picsync_core::ports::{
    IClock, ILocalFileSystem, IRemoteStore, ProgressFn, RemoteError, SystemClock,
};

use crate::backup::BackupResolver;
use crate::paginator::ListingPaginator;
use crate::SyncError;

/// Resolve the configured root container to a concrete id
///
/// The `root` alias is looked up through the remote store; any other id
/// is returned unchanged.
pub async fn resolve_root_id(
    remote: &dyn IRemoteStore,
    configured: &RemoteId,
) -> anyhow::Result<RemoteId> {
    if !configured.is_root_alias() {
        return Ok(configured.clone());
    }
    let root = remote
        .root_id()
        .await
        .context("Failed to resolve the root folder id")?;
    debug!(root_id = %root, "Resolved root folder id");
    Ok(root)
}

// ============================================================================
// EngineOptions
// ============================================================================

/// Knobs of a sync cycle, usually taken from the `sync` config section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Directory that receives downloaded files
    pub download_dir: PathBuf,
    /// Listing page size
    pub page_size: u32,
    /// MIME allow-list for the listing
    pub mime_types: Vec<String>,
    /// Only list files modified at or after the watermark
    pub incremental: bool,
    /// Move downloaded files into the dated backup container
    pub backup: bool,
    /// What a failed download does to the cycle
    pub failure_policy: FailurePolicy,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            download_dir: expand_tilde(&config.sync.download_dir),
            page_size: config.sync.page_size,
            mime_types: config.sync.mime_types.clone(),
            incremental: config.sync.enable_incremental,
            backup: config.sync.enable_backup,
            failure_policy: config.sync.failure_policy,
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Runs sync cycles against a remote store and the local filesystem
pub struct SyncEngine {
    remote: Arc<dyn IRemoteStore>,
    local: Arc<dyn ILocalFileSystem>,
    clock: Arc<dyn IClock>,
    root: RemoteId,
    options: EngineOptions,
}

impl SyncEngine {
    /// Create a new engine listing the container `root`
    ///
    /// `root` should already be a concrete id: backup moves remove it from
    /// the file's parents.
    pub fn new(
        remote: Arc<dyn IRemoteStore>,
        local: Arc<dyn ILocalFileSystem>,
        root: RemoteId,
        options: EngineOptions,
    ) -> Self {
        Self {
            remote,
            local,
            clock: Arc::new(SystemClock),
            root,
            options,
        }
    }

    /// Replace the clock the cycle start instant is read from
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn IClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn root(&self) -> &RemoteId {
        &self.root
    }

    /// Run one full cycle over `context`
    ///
    /// On success the context's cursor equals the cycle start instant (or
    /// its previous value, whichever is later). On error the cursor is left
    /// exactly as it was.
    ///
    /// # Errors
    /// Returns a [`SyncError`] when the cycle aborts. Per-file failures
    /// tolerated by the failure policy and failed backup moves are reported
    /// in [`CycleReport::errors`] instead.
    #[tracing::instrument(skip(self, context), fields(root = %self.root, cursor = %context.cursor.last_sync_time()))]
    pub async fn run_cycle(&self, context: &mut SyncContext) -> Result<CycleReport, SyncError> {
        let started = Instant::now();
        let cycle_start = self.clock.now();
        let mut report = CycleReport::new(cycle_start, context.cursor.last_sync_time());
        let mut state = CycleState::Idle;

        info!(
            cycle_id = %report.cycle_id,
            cycle_start = %cycle_start,
            incremental = self.options.incremental,
            backup = self.options.backup,
            "Starting sync cycle"
        );
        state.transition_to(CycleState::Listing)?;

        let outcome = self
            .execute(context, cycle_start, &mut state, &mut report)
            .await;
        report.duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                report.final_state = state;
                info!(
                    cycle_id = %report.cycle_id,
                    listed = report.listed,
                    downloaded = report.downloaded.len(),
                    skipped = report.skipped.len(),
                    backed_up = report.backed_up,
                    errors = report.errors.len(),
                    cursor = %report.cursor_after,
                    duration_ms = report.duration_ms,
                    "Sync cycle complete"
                );
                Ok(report)
            }
            Err(err) => {
                let failed_in = state.name();
                if let Err(e) = state.transition_to(CycleState::Aborted(err.to_string())) {
                    warn!(error = %e, "Unexpected state while aborting cycle");
                }
                error!(
                    cycle_id = %report.cycle_id,
                    state = failed_in,
                    error = %err,
                    "Sync cycle aborted, cursor not advanced"
                );
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        context: &mut SyncContext,
        cycle_start: DateTime<Utc>,
        state: &mut CycleState,
        report: &mut CycleReport,
    ) -> Result<(), SyncError> {
        let download_dir = &self.options.download_dir;
        self.local
            .create_directory(download_dir)
            .await
            .map_err(|e| SyncError::LocalStorage {
                path: download_dir.clone(),
                reason: format!("{e:#}"),
            })?;

        let backup = if self.options.backup {
            self.ensure_backup_container(context, cycle_start, report)
                .await?
        } else {
            None
        };

        // LISTING
        let query = self.listing_query(&context.cursor);
        let listing = ListingPaginator::new(self.remote.as_ref(), self.options.page_size)
            .list_all(&self.root, &query)
            .await;
        report.listed = listing.entries.len();
        report.pages = listing.pages;
        report.listing_complete = listing.complete;

        if let Some(failure) = listing.failure {
            if RemoteError::is_unauthorized(&failure.error) {
                return Err(SyncError::Unauthorized(format!("{:#}", failure.error)));
            }
            report
                .errors
                .push(format!("listing page {}: {:#}", failure.page, failure.error));
        }

        if listing.entries.is_empty() {
            info!("No new files to download");
            state.transition_to(CycleState::AdvancingCursor)?;
        } else {
            // DOWNLOADING
            state.transition_to(CycleState::Downloading)?;
            for entry in &listing.entries {
                self.download_one(entry, report).await?;
            }

            // BACKING_UP
            if let Some(backup) = backup.filter(|_| !report.downloaded.is_empty()) {
                state.transition_to(CycleState::BackingUp)?;
                self.move_to_backup(&backup, report).await;
            }
            state.transition_to(CycleState::AdvancingCursor)?;
        }

        // ADVANCING_CURSOR
        if context.cursor.advance_to(cycle_start) {
            debug!(cursor = %cycle_start, "Advanced sync cursor");
        }
        report.cursor_after = context.cursor.last_sync_time();
        state.transition_to(CycleState::Idle)?;

        Ok(())
    }

    fn listing_query(&self, cursor: &SyncCursor) -> ListQuery {
        let query = ListQuery::new().with_mime_types(self.options.mime_types.iter().cloned());
        if self.options.incremental && !cursor.is_beginning() {
            query.with_modified_since(cursor.last_sync_time())
        } else {
            query
        }
    }

    /// Return the backup container for the period of `cycle_start`
    ///
    /// The cached container is reused while the period matches; otherwise
    /// it is looked up (or created) and cached in the context. A resolution
    /// failure other than rejected credentials is recorded in the report and
    /// yields `None`, so the cycle runs without the backup step.
    async fn ensure_backup_container(
        &self,
        context: &mut SyncContext,
        cycle_start: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<Option<BackupContainer>, SyncError> {
        let period = BackupPeriod::of(cycle_start);
        if let Some(cached) = context.backup_for(period) {
            debug!(container_id = %cached.id, period = %period, "Using cached backup container");
            return Ok(Some(cached.clone()));
        }

        let resolved = BackupResolver::new(self.remote.as_ref(), &self.root, self.options.page_size)
            .resolve(period)
            .await;
        match resolved {
            Ok(container) => {
                info!(container_id = %container.id, period = %period, "Backup container ready");
                context.backup = Some(container.clone());
                Ok(Some(container))
            }
            Err(e) if RemoteError::is_unauthorized(&e) => {
                Err(SyncError::Unauthorized(format!("{e:#}")))
            }
            Err(e) => {
                warn!(
                    period = %period,
                    error = %format!("{e:#}"),
                    "Backup container unavailable, skipping backup this cycle"
                );
                report.errors.push(format!("backup container {period}: {e:#}"));
                Ok(None)
            }
        }
    }

    async fn download_one(
        &self,
        entry: &RemoteFileDescriptor,
        report: &mut CycleReport,
    ) -> Result<(), SyncError> {
        let local_path = entry.local_path_in(&self.options.download_dir);

        match self.local.exists(&local_path).await {
            Ok(true) => {
                debug!(name = %entry.name(), path = %local_path.display(), "Local copy exists, skipping");
                report.skipped.push(entry.name().to_string());
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                let e = e.context(format!("Failed to check {}", local_path.display()));
                return self.handle_file_failure(entry, e, report);
            }
        }

        match self.fetch(entry, &local_path).await {
            Ok(bytes) => {
                info!(file_id = %entry.id(), name = %entry.name(), bytes, "Downloaded file");
                report.downloaded.push(DownloadRecord {
                    source: entry.clone(),
                    local_path,
                    bytes,
                });
                Ok(())
            }
            Err(e) => self.handle_file_failure(entry, e, report),
        }
    }

    async fn fetch(&self, entry: &RemoteFileDescriptor, local_path: &Path) -> anyhow::Result<u64> {
        let name = entry.name().to_string();
        let progress: ProgressFn = Box::new(move |received, total| {
            debug!(name = %name, received, total = ?total, "Download progress");
        });

        let data = self
            .remote
            .download(entry.id(), Some(progress))
            .await
            .with_context(|| format!("Failed to download {}", entry.name()))?;
        self.local
            .write_all(local_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))?;

        Ok(data.len() as u64)
    }

    fn handle_file_failure(
        &self,
        entry: &RemoteFileDescriptor,
        err: anyhow::Error,
        report: &mut CycleReport,
    ) -> Result<(), SyncError> {
        let reason = format!("{err:#}");
        if RemoteError::is_unauthorized(&err) {
            return Err(SyncError::Unauthorized(reason));
        }

        match self.options.failure_policy {
            FailurePolicy::Skip => {
                warn!(file_id = %entry.id(), name = %entry.name(), error = %reason, "Download failed, skipping file");
                report.errors.push(format!("{}: {reason}", entry.name()));
                Ok(())
            }
            FailurePolicy::Abort => Err(SyncError::DownloadAborted {
                name: entry.name().to_string(),
                reason,
            }),
        }
    }

    /// Reparent every downloaded file into `backup`
    ///
    /// Failures are logged and recorded; the file stays where it was and
    /// its local copy is kept.
    async fn move_to_backup(&self, backup: &BackupContainer, report: &mut CycleReport) {
        let mut moved = 0u32;
        let mut errors = Vec::new();

        for record in &report.downloaded {
            let source = &record.source;
            let mut remove: Vec<RemoteId> = source
                .parent_ids()
                .iter()
                .filter(|p| **p != backup.id)
                .cloned()
                .collect();
            if remove.is_empty() && self.root != backup.id {
                remove.push(self.root.clone());
            }

            match self
                .remote
                .update_parents(source.id(), &backup.id, &remove)
                .await
            {
                Ok(_) => {
                    debug!(file_id = %source.id(), name = %source.name(), backup = %backup.id, "Moved to backup");
                    moved += 1;
                }
                Err(e) => {
                    warn!(
                        file_id = %source.id(),
                        name = %source.name(),
                        error = %format!("{e:#}"),
                        "Backup move failed, keeping file in place"
                    );
                    errors.push(format!("backup {}: {e:#}", source.name()));
                }
            }
        }

        info!(moved, failed = errors.len(), backup = %backup.name(), "Backup step finished");
        report.backed_up += moved;
        report.errors.extend(errors);
    }
}
