//! Sync scheduler - fixed-rate loop around the [`SyncEngine`]
//!
//! The first cycle runs after `sync.initial_delay`, later ones every
//! `sync.poll_interval` measured from the previous trigger. Trigger times
//! form a fixed grid `start + initial_delay + k * poll_interval`. Cycles
//! never overlap: the scheduler awaits each cycle before waiting for the
//! next slot, and slots that passed during a long cycle are skipped, so an
//! overrun is followed by the next grid point rather than a catch-up run.
//!
//! ## Flow
//!
//! ```text
//! tick ──→ SyncEngine::run_cycle ──→ ICursorStore::save ──→ IImageTransformer
//!                 │
//!            fatal error ──→ SchedulerExit::Halted
//! ```
//!
//! Cancellation stops new cycles; a cycle already in flight runs to
//! completion first.

use std::sync::Arc;
use std::time::Duration;

use picsync_core::config::Config;
use picsync_core::domain::{CycleReport, SyncContext};
use picsync_core::ports::{ICursorStore, IImageTransformer};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::SyncEngine;
use crate::SyncError;

/// Timing of the scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.sync.initial_delay),
            poll_interval: Duration::from_secs(config.sync.poll_interval),
        }
    }
}

/// Why [`SyncScheduler::run`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerExit {
    /// The cancellation token fired
    Cancelled,
    /// A cycle failed fatally; no further cycles run until restart
    Halted(String),
}

/// Drives sync cycles on a fixed-rate grid
pub struct SyncScheduler {
    engine: SyncEngine,
    cursor_store: Arc<dyn ICursorStore>,
    transformer: Option<Arc<dyn IImageTransformer>>,
    options: SchedulerOptions,
    context: SyncContext,
}

impl SyncScheduler {
    /// Creates a scheduler that starts from `context`
    pub fn new(
        engine: SyncEngine,
        cursor_store: Arc<dyn ICursorStore>,
        context: SyncContext,
        options: SchedulerOptions,
    ) -> Self {
        info!(
            initial_delay_ms = options.initial_delay.as_millis() as u64,
            poll_interval_ms = options.poll_interval.as_millis() as u64,
            cursor = %context.cursor.last_sync_time(),
            "Creating sync scheduler"
        );
        Self {
            engine,
            cursor_store,
            transformer: None,
            options,
            context,
        }
    }

    /// Runs `transformer` over the files downloaded by each cycle
    #[must_use]
    pub fn with_transformer(mut self, transformer: Arc<dyn IImageTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Context as of the last completed cycle
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Main loop; returns when cancelled or after a fatal cycle error
    pub async fn run(&mut self, cancel: CancellationToken) -> SchedulerExit {
        info!("Sync scheduler starting");

        let origin = Instant::now() + self.options.initial_delay;
        let period = self.options.poll_interval;
        let mut slot = origin;

        let exit = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Cancellation requested");
                    break SchedulerExit::Cancelled;
                }

                _ = tokio::time::sleep_until(slot) => {
                    match self.run_once().await {
                        Ok(_) => {}
                        Err(err) if err.is_fatal() => {
                            error!(error = %err, "Fatal sync error, halting scheduler");
                            break SchedulerExit::Halted(err.to_string());
                        }
                        Err(err) => warn!(error = %err, "Sync cycle failed, will retry on next tick"),
                    }

                    let now = Instant::now();
                    let next = next_slot(origin, period, slot, now);
                    let skipped = slots_between(slot, next, period);
                    if skipped > 0 {
                        warn!(skipped, "Sync cycle overran the poll interval, skipping missed triggers");
                    }
                    slot = next;
                }
            }
        };

        info!(exit = ?exit, "Sync scheduler stopped");
        exit
    }

    /// Runs a single cycle, then persists the context and transforms the
    /// downloaded files
    ///
    /// A failed save is logged and does not fail the cycle.
    pub async fn run_once(&mut self) -> Result<CycleReport, SyncError> {
        let report = self.engine.run_cycle(&mut self.context).await?;

        if let Err(err) = self.persist().await {
            warn!(error = %err, "Keeping sync context in memory only");
        }
        self.transform(&report).await;

        Ok(report)
    }

    async fn persist(&self) -> Result<(), SyncError> {
        self.cursor_store
            .save(&self.context)
            .await
            .map_err(|e| SyncError::Persistence(format!("{e:#}")))?;
        debug!(cursor = %self.context.cursor.last_sync_time(), "Saved sync context");
        Ok(())
    }

    async fn transform(&self, report: &CycleReport) {
        let Some(transformer) = self.transformer.clone() else {
            return;
        };
        if report.downloaded.is_empty() {
            return;
        }

        let inputs = report.downloaded_paths();
        let count = inputs.len();
        match tokio::task::spawn_blocking(move || transformer.transform(&inputs)).await {
            Ok(outputs) => info!(inputs = count, outputs = outputs.len(), "Transform step finished"),
            Err(e) => warn!(error = %e, "Transform task failed"),
        }
    }
}

/// First grid point `origin + k * period` after `previous` that is not in
/// the past at `now`
fn next_slot(origin: Instant, period: Duration, previous: Instant, now: Instant) -> Instant {
    let candidate = previous + period;
    if now <= candidate || period.is_zero() {
        return candidate.max(now);
    }
    let period_ns = period.as_nanos();
    let elapsed_ns = now.saturating_duration_since(origin).as_nanos();
    let periods = elapsed_ns.div_ceil(period_ns);
    let offset = u64::try_from(periods * period_ns).unwrap_or(u64::MAX);
    origin + Duration::from_nanos(offset)
}

/// Grid points strictly between `previous` and `next`
fn slots_between(previous: Instant, next: Instant, period: Duration) -> u64 {
    if period.is_zero() {
        return 0;
    }
    let gap = next.saturating_duration_since(previous).as_nanos();
    u64::try_from((gap / period.as_nanos()).saturating_sub(1)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::filesystem::LocalFileSystemAdapter;
    use crate::memory::InMemoryCursorStore;
    use crate::testing::{image, rid, ts, FakeRemoteStore, FixedClock, ROOT};
    use picsync_core::config::FailurePolicy;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingTransformer {
        dir: PathBuf,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl IImageTransformer for RecordingTransformer {
        fn transform(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
            self.seen.lock().unwrap().extend_from_slice(inputs);
            inputs.iter().map(|p| p.with_extension("png")).collect()
        }

        fn output_dir(&self) -> &Path {
            &self.dir
        }
    }

    struct FailingCursorStore;

    #[async_trait::async_trait]
    impl ICursorStore for FailingCursorStore {
        async fn load(&self) -> anyhow::Result<Option<SyncContext>> {
            Ok(None)
        }

        async fn save(&self, _context: &SyncContext) -> anyhow::Result<()> {
            anyhow::bail!("database is locked")
        }
    }

    fn engine(store: FakeRemoteStore, dir: &Path) -> SyncEngine {
        shared_engine(Arc::new(store), dir)
    }

    fn shared_engine(store: Arc<FakeRemoteStore>, dir: &Path) -> SyncEngine {
        let options = EngineOptions {
            download_dir: dir.to_path_buf(),
            page_size: 10,
            mime_types: vec!["image/jpeg".to_string()],
            incremental: true,
            backup: false,
            failure_policy: FailurePolicy::Skip,
        };
        SyncEngine::new(
            store,
            Arc::new(LocalFileSystemAdapter::new()),
            rid(ROOT),
            options,
        )
        .with_clock(Arc::new(FixedClock::new(ts(2026, 10, 5, 12))))
    }

    fn fast() -> SchedulerOptions {
        SchedulerOptions {
            initial_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_options_from_config() {
        let options = SchedulerOptions::from_config(&Config::default());
        assert_eq!(options.initial_delay, Duration::from_secs(1));
        assert_eq!(options.poll_interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_run_once_persists_and_transforms() {
        let dir = TempDir::new().unwrap();
        let remote = FakeRemoteStore::with_files([
            image("id_a", "a.jpg", ts(2026, 10, 1, 8)),
            image("id_b", "b.jpg", ts(2026, 10, 1, 9)),
        ]);
        let cursor_store = Arc::new(InMemoryCursorStore::new());
        let transformer = Arc::new(RecordingTransformer {
            dir: dir.path().join("converted"),
            seen: Mutex::new(Vec::new()),
        });
        let mut scheduler = SyncScheduler::new(
            engine(remote, dir.path()),
            cursor_store.clone(),
            SyncContext::default(),
            fast(),
        )
        .with_transformer(transformer.clone());

        let report = scheduler.run_once().await.unwrap();

        assert_eq!(report.downloaded.len(), 2);
        let saved = cursor_store.load().await.unwrap().unwrap();
        assert_eq!(saved.cursor.last_sync_time(), ts(2026, 10, 5, 12));
        assert_eq!(
            *transformer.seen.lock().unwrap(),
            vec![dir.path().join("a.jpg"), dir.path().join("b.jpg")]
        );
    }

    #[tokio::test]
    async fn test_transformer_skipped_when_nothing_downloaded() {
        let dir = TempDir::new().unwrap();
        let transformer = Arc::new(RecordingTransformer {
            dir: dir.path().join("converted"),
            seen: Mutex::new(Vec::new()),
        });
        let mut scheduler = SyncScheduler::new(
            engine(FakeRemoteStore::new(), dir.path()),
            Arc::new(InMemoryCursorStore::new()),
            SyncContext::default(),
            fast(),
        )
        .with_transformer(transformer.clone());

        scheduler.run_once().await.unwrap();

        assert!(transformer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let remote = FakeRemoteStore::with_files([image("id_a", "a.jpg", ts(2026, 10, 1, 8))]);
        let mut scheduler = SyncScheduler::new(
            engine(remote, dir.path()),
            Arc::new(FailingCursorStore),
            SyncContext::default(),
            fast(),
        );

        let report = scheduler.run_once().await.unwrap();

        assert_eq!(report.downloaded.len(), 1);
        assert_eq!(
            scheduler.context().cursor.last_sync_time(),
            ts(2026, 10, 5, 12)
        );
    }

    #[tokio::test]
    async fn test_run_halts_on_fatal_error() {
        let dir = TempDir::new().unwrap();
        let mut remote = FakeRemoteStore::new();
        remote.unauthorized = true;
        let mut scheduler = SyncScheduler::new(
            engine(remote, dir.path()),
            Arc::new(InMemoryCursorStore::new()),
            SyncContext::default(),
            fast(),
        );

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.run(CancellationToken::new()),
        )
        .await
        .expect("scheduler should halt on its own");

        assert!(matches!(exit, SchedulerExit::Halted(ref reason) if reason.contains("credentials")));
        assert!(scheduler.context().cursor.is_beginning());
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let dir = TempDir::new().unwrap();
        let remote = FakeRemoteStore::with_files([image("id_a", "a.jpg", ts(2026, 10, 1, 8))]);
        let cursor_store = Arc::new(InMemoryCursorStore::new());
        let mut scheduler = SyncScheduler::new(
            engine(remote, dir.path()),
            cursor_store.clone(),
            SyncContext::default(),
            fast(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let exit = tokio::time::timeout(Duration::from_secs(5), scheduler.run(cancel))
            .await
            .expect("scheduler should stop after cancellation");

        assert_eq!(exit, SchedulerExit::Cancelled);
        assert!(dir.path().join("a.jpg").exists());
        assert!(cursor_store.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let remote = FakeRemoteStore::with_files([image("id_a", "a.jpg", ts(2026, 10, 1, 8))]);
        let options = SchedulerOptions {
            initial_delay: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(60),
        };
        let mut scheduler = SyncScheduler::new(
            engine(remote, dir.path()),
            Arc::new(InMemoryCursorStore::new()),
            SyncContext::default(),
            options,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = scheduler.run(cancel).await;

        assert_eq!(exit, SchedulerExit::Cancelled);
        assert!(!dir.path().join("a.jpg").exists());
        assert!(scheduler.context().cursor.is_beginning());
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// Runs the scheduler on a paused clock until `stop_after` of virtual
    /// time has passed, then returns the listing start offsets
    async fn cycle_starts(store: Arc<FakeRemoteStore>, options: SchedulerOptions, stop_after: Duration) -> Vec<Duration> {
        let dir = TempDir::new().unwrap();
        let mut scheduler = SyncScheduler::new(
            shared_engine(store.clone(), dir.path()),
            Arc::new(InMemoryCursorStore::new()),
            SyncContext::default(),
            options,
        );
        let start = Instant::now();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let stopper = async move {
            tokio::time::sleep(stop_after).await;
            trigger.cancel();
        };

        let (exit, ()) = tokio::join!(scheduler.run(cancel), stopper);

        assert_eq!(exit, SchedulerExit::Cancelled);
        store
            .list_started()
            .into_iter()
            .map(|at| at.duration_since(start))
            .collect()
    }

    #[test]
    fn test_next_slot_stays_on_grid() {
        let origin = Instant::now();
        let period = secs(10);

        assert_eq!(next_slot(origin, period, origin, origin + secs(3)), origin + secs(10));
        assert_eq!(next_slot(origin, period, origin, origin + secs(10)), origin + secs(10));
        assert_eq!(next_slot(origin, period, origin, origin + secs(25)), origin + secs(30));
        assert_eq!(next_slot(origin, period, origin + secs(30), origin + secs(30)), origin + secs(40));
    }

    #[test]
    fn test_slots_between_counts_skipped_triggers() {
        let origin = Instant::now();
        assert_eq!(slots_between(origin, origin + secs(10), secs(10)), 0);
        assert_eq!(slots_between(origin, origin + secs(30), secs(10)), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_start_on_fixed_rate_grid() {
        let mut remote = FakeRemoteStore::new();
        remote.list_delay = Some(secs(3));
        let store = Arc::new(remote);
        let options = SchedulerOptions {
            initial_delay: secs(1),
            poll_interval: secs(10),
        };

        let starts = cycle_starts(store, options, secs(35)).await;

        assert_eq!(starts, vec![secs(1), secs(11), secs(21), secs(31)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycle_resumes_on_next_grid_point() {
        let mut remote = FakeRemoteStore::new();
        remote.list_delays = vec![secs(25)];
        let store = Arc::new(remote);
        let options = SchedulerOptions {
            initial_delay: secs(1),
            poll_interval: secs(10),
        };

        let starts = cycle_starts(store, options, secs(45)).await;

        assert_eq!(starts, vec![secs(1), secs(31), secs(41)]);
    }
}
