//! One monitoring run: scan, reconcile, report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::reconcile::{ReconcileSettings, ReconciliationResult, Reconciler};
use crate::report::Report;
use crate::scanner::{LocalFile, ScanError, ScanFilter, ScanStats, Scanner};
use crate::time::{ReferenceZone, TimeError};
use crate::tracking::{is_unchanged, next_snapshot, TrackingSnapshot, TrackingStore};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("Scan task failed: {0}")]
    Task(String),
}

/// Everything a run needs besides the catalog client.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub scan_filter: ScanFilter,
    pub reconcile: ReconcileSettings,
    pub zone: ReferenceZone,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Result<Self, MonitorError> {
        Ok(Self {
            scan_filter: ScanFilter::from(&config.monitor),
            reconcile: ReconcileSettings::from_config(config),
            zone: ReferenceZone::from_name(&config.reconcile.reference_timezone)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Trace candidates, queries and scores.
    pub debug: bool,
    /// Reconcile every file, ignoring the tracking snapshot.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub directory: PathBuf,
    /// Results sorted by path, one per scanned file.
    pub results: Vec<ReconciliationResult>,
    pub report: Report,
    pub scan_stats: ScanStats,
    pub catalog_available: bool,
    /// Entry count reported by the catalog, when it answered.
    pub catalog_entries: Option<usize>,
}

pub struct Monitor {
    client: Arc<dyn CatalogClient>,
    settings: MonitorSettings,
    tracking: Option<Arc<dyn TrackingStore>>,
}

impl Monitor {
    pub fn new(client: Arc<dyn CatalogClient>, settings: MonitorSettings) -> Self {
        Self {
            client,
            settings,
            tracking: None,
        }
    }

    pub fn with_tracking(mut self, store: Arc<dyn TrackingStore>) -> Self {
        self.tracking = Some(store);
        self
    }

    /// Scan `directory` and reconcile every file against the catalog.
    ///
    /// Only a failing scan is fatal. An unreachable catalog yields a report
    /// with every file marked as failed.
    pub async fn run(&self, directory: &Path, options: RunOptions) -> Result<RunOutcome, MonitorError> {
        let zone = self.settings.zone;
        info!(directory = %directory.display(), timezone = %zone.name(), force = options.force, "Starting run");

        let scan = {
            let scanner = Scanner::new(self.settings.scan_filter.clone());
            let root = directory.to_path_buf();
            tokio::task::spawn_blocking(move || scanner.scan(&root, &zone))
                .await
                .map_err(|e| MonitorError::Task(e.to_string()))??
        };
        let files: Vec<LocalFile> = scan.files.into_values().collect();

        if let Err(e) = self.client.check_status().await {
            warn!(catalog = %self.client.name(), error = %e, "Catalog unavailable, skipping lookups");
            let results: Vec<ReconciliationResult> =
                files.into_iter().map(ReconciliationResult::lookup_failed).collect();
            return Ok(RunOutcome {
                directory: directory.to_path_buf(),
                report: Report::summarize(&results),
                results,
                scan_stats: scan.stats,
                catalog_available: false,
                catalog_entries: None,
            });
        }

        let catalog_entries = match self.client.count_entries().await {
            Ok(count) => {
                info!(entries = count, "Catalog reachable");
                Some(count)
            }
            Err(e) => {
                debug!(error = %e, "Could not count catalog entries");
                None
            }
        };

        let snapshot = if options.force {
            TrackingSnapshot::new()
        } else {
            self.load_snapshot()
        };
        let (unchanged, to_check): (Vec<LocalFile>, Vec<LocalFile>) =
            files.into_iter().partition(|f| is_unchanged(&snapshot, f));
        if !unchanged.is_empty() {
            info!(unchanged = unchanged.len(), "Skipping files unchanged since last run");
        }

        let reconciler = Reconciler::new(
            self.client.clone(),
            self.settings.reconcile.clone().with_debug(options.debug),
            zone,
        );
        let mut results = reconciler.reconcile_all(to_check).await;
        results.extend(unchanged.into_iter().map(ReconciliationResult::unchanged));
        results.sort_by(|a, b| a.file.path.cmp(&b.file.path));

        self.save_snapshot(&results);

        let report = Report::summarize(&results);
        info!(
            files = report.total_files,
            needs_sync = report.needs_sync,
            "Run complete"
        );

        Ok(RunOutcome {
            directory: directory.to_path_buf(),
            results,
            report,
            scan_stats: scan.stats,
            catalog_available: true,
            catalog_entries,
        })
    }

    fn load_snapshot(&self) -> TrackingSnapshot {
        let Some(store) = &self.tracking else {
            return TrackingSnapshot::new();
        };
        match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable tracking snapshot");
                TrackingSnapshot::new()
            }
        }
    }

    fn save_snapshot(&self, results: &[ReconciliationResult]) {
        if let Some(store) = &self.tracking {
            if let Err(e) = store.save(&next_snapshot(results)) {
                warn!(error = %e, "Failed to save tracking snapshot");
            }
        }
    }
}
