pub mod catalog;
pub mod config;
pub mod identifiers;
pub mod matcher;
pub mod monitor;
pub mod reconcile;
pub mod report;
pub mod scanner;
pub mod testing;
pub mod time;
pub mod tracking;

pub use catalog::{CatalogClient, CatalogEntry, CatalogError, CkanClient, EntryQuery, Resource};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use monitor::{Monitor, MonitorError, MonitorSettings, RunOptions, RunOutcome};
pub use reconcile::{
    MatchedVia, ReconcileSettings, ReconcileStatus, ReconciliationResult, Reconciler,
};
pub use report::{format_size, Report};
pub use scanner::{FileCategory, LocalFile, ScanError, ScanFilter, Scanner};
pub use time::{ReferenceTime, ReferenceZone, DEFAULT_REFERENCE_TIMEZONE};
pub use tracking::{SqliteTrackingStore, TrackingError, TrackingStore};
