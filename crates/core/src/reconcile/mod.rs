//! Reconciliation engine.
//!
//! For each local file the engine walks a lookup cascade and stops at the
//! first step that yields a usable timestamp:
//!
//! 1. direct lookup of each candidate identifier
//! 2. dataset search (structured `res_name` filter, then text queries)
//! 3. resource search, where the catalog supports it
//!
//! A failing step is logged and the next one is tried. Exhausting the cascade
//! means the file is missing from the catalog.

mod engine;
mod types;

pub use engine::{ReconcileSettings, Reconciler, RemoteMatch};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::{CatalogEntry, EntryQuery};
    use crate::testing::{fixtures, MockCatalog, RecordedCall};
    use crate::time::ReferenceZone;

    fn reconciler(catalog: Arc<MockCatalog>) -> Reconciler {
        Reconciler::new(
            catalog,
            ReconcileSettings::default().with_debug(true),
            ReferenceZone::default(),
        )
    }

    fn entry_with_metadata(identifier: &str, modified: &str) -> CatalogEntry {
        let mut entry = fixtures::entry(identifier, vec![]);
        entry.metadata_modified = Some(modified.to_string());
        entry
    }

    #[tokio::test]
    async fn test_direct_hit_on_best_resource() {
        let catalog = Arc::new(MockCatalog::with_entries(vec![fixtures::entry(
            "sensor2024",
            vec![
                fixtures::resource("readme.txt", Some("2024-07-01T00:00:00")),
                fixtures::resource("sensor_2024.csv", Some("2024-06-01T09:00:00")),
            ],
        )]));
        let file = fixtures::local_file("sensor_2024.csv", "2024-06-02T10:00:00Z");

        let result = reconciler(catalog.clone()).reconcile(&file).await;

        assert_eq!(result.status, ReconcileStatus::LocalNewer);
        assert_eq!(result.matched_via.to_string(), "direct:sensor2024");
        assert_eq!(
            result.remote_timestamp.unwrap().to_rfc3339(),
            "2024-06-01T11:00:00+02:00"
        );
        assert_eq!(catalog.requested_identifiers().await, vec!["sensor2024"]);
    }

    #[tokio::test]
    async fn test_direct_fallback_to_latest_resource() {
        // Two resources, neither matches the file name.
        let catalog = Arc::new(MockCatalog::with_entries(vec![fixtures::entry(
            "budget",
            vec![
                fixtures::resource("q1.pdf", Some("2024-01-01T00:00:00")),
                fixtures::resource("q2.pdf", Some("2024-04-01T00:00:00")),
            ],
        )]));
        let file = fixtures::local_file("budget.xlsx", "2024-02-01T00:00:00Z");

        let result = reconciler(catalog).reconcile(&file).await;

        assert_eq!(result.matched_via.to_string(), "direct-fallback:budget");
        assert_eq!(result.status, ReconcileStatus::UpToDate);
    }

    #[tokio::test]
    async fn test_direct_empty_and_entry_tiers() {
        let empty = entry_with_metadata("empty", "2024-01-01T00:00:00");
        let mut untimed = entry_with_metadata("untimed", "2024-01-01T00:00:00");
        untimed.resources.push(fixtures::resource("untimed.csv", None));
        let catalog = Arc::new(MockCatalog::with_entries(vec![empty, untimed]));
        let r = reconciler(catalog);

        let result = r
            .reconcile(&fixtures::local_file("empty.csv", "2023-01-01T00:00:00Z"))
            .await;
        assert_eq!(result.matched_via.to_string(), "direct-empty:empty");
        assert_eq!(result.status, ReconcileStatus::UpToDate);

        let result = r
            .reconcile(&fixtures::local_file("untimed.csv", "2025-01-01T00:00:00Z"))
            .await;
        assert_eq!(result.matched_via.to_string(), "direct-entry:untimed");
        assert_eq!(result.status, ReconcileStatus::LocalNewer);
    }

    #[tokio::test]
    async fn test_entry_without_timestamps_tries_next_candidate() {
        let catalog = Arc::new(MockCatalog::with_entries(vec![
            fixtures::entry("monthlyreport", vec![]),
            entry_with_metadata("Monthly_Report", "2024-01-01T00:00:00"),
        ]));
        let file = fixtures::local_file("Monthly_Report.pdf", "2023-01-01T00:00:00Z");

        let result = reconciler(catalog.clone()).reconcile(&file).await;

        assert_eq!(result.matched_via.to_string(), "direct-empty:Monthly_Report");
        assert_eq!(
            catalog.requested_identifiers().await,
            vec!["monthlyreport", "monthlyreportpdf", "Monthly_Report"]
        );
    }

    #[tokio::test]
    async fn test_search_fallback_uses_res_name_first() {
        let mut entry = fixtures::entry(
            "weather-station-2020",
            vec![fixtures::resource("Station_A.csv", Some("2024-03-01T12:00:00"))],
        );
        entry.title = Some("Weather Station 2020".to_string());
        let catalog = Arc::new(MockCatalog::with_entries(vec![entry]));
        let file = fixtures::local_file("Station_A.csv", "2024-03-01T11:00:00Z");

        let result = reconciler(catalog.clone()).reconcile(&file).await;

        assert_eq!(result.status, ReconcileStatus::UpToDate);
        assert_eq!(
            result.matched_via.to_string(),
            "search:weather-station-2020"
        );
        let searches = catalog.recorded_searches().await;
        assert_eq!(
            searches[0],
            EntryQuery::resource_name("Station_A.csv").with_private(true)
        );
        assert_eq!(searches.len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_unrelated_hits() {
        // Text search finds the entry, but no title word equals the stem.
        let mut entry = fixtures::entry("misc-collection", vec![]);
        entry.title = Some("Miscellaneous collection notes2020".to_string());
        entry.metadata_modified = Some("2024-01-01T00:00:00".to_string());
        let catalog = Arc::new(MockCatalog::with_entries(vec![entry]));
        let file = fixtures::local_file("notes.txt", "2024-02-01T00:00:00Z");

        let result = reconciler(catalog).reconcile(&file).await;

        assert_eq!(result.status, ReconcileStatus::MissingRemote);
        assert_eq!(result.matched_via.to_string(), "not-found:notes");
    }

    #[tokio::test]
    async fn test_keyword_family_queries() {
        let catalog = Arc::new(MockCatalog::new());
        let file = fixtures::local_file("jane_cv.pdf", "2024-02-01T00:00:00Z");

        reconciler(catalog.clone()).reconcile(&file).await;

        let texts: Vec<String> = catalog
            .recorded_searches()
            .await
            .into_iter()
            .filter_map(|q| q.text)
            .collect();
        assert!(texts.contains(&"curriculum vitae".to_string()));
    }

    #[tokio::test]
    async fn test_resource_search_fallback_fetches_full_record() {
        let catalog = Arc::new(MockCatalog::new());
        let trimmed = fixtures::resource("orphan_scan.pdf", None);
        let full = fixtures::resource("orphan_scan.pdf", Some("2024-05-01T00:00:00"));
        catalog.set_searchable_resources(vec![trimmed]).await;
        catalog.add_resource_record(full).await;
        let file = fixtures::local_file("orphan_scan.pdf", "2024-06-01T00:00:00Z");

        let result = reconciler(catalog.clone()).reconcile(&file).await;

        assert_eq!(result.status, ReconcileStatus::LocalNewer);
        assert_eq!(result.matched_via.to_string(), "resource:orphan_scan.pdf");
        assert!(catalog
            .recorded_calls()
            .await
            .contains(&RecordedCall::GetResource("res-orphan_scan.pdf".to_string())));
    }

    #[tokio::test]
    async fn test_transport_errors_move_to_next_step() {
        let catalog = Arc::new(MockCatalog::with_entries(vec![fixtures::entry(
            "report",
            vec![fixtures::resource("report.csv", Some("2024-01-01T00:00:00"))],
        )]));
        catalog.fail_identifier("report").await;
        let file = fixtures::local_file("report.csv", "2023-06-01T00:00:00Z");

        let result = reconciler(catalog).reconcile(&file).await;

        // Found again through the res_name search.
        assert_eq!(result.matched_via.to_string(), "search:report");
        assert_eq!(result.status, ReconcileStatus::UpToDate);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let catalog = Arc::new(MockCatalog::new());
        let file = fixtures::local_file("orphan.csv", "2024-01-01T00:00:00Z");

        let result = reconciler(catalog.clone()).reconcile(&file).await;

        assert_eq!(result.status, ReconcileStatus::MissingRemote);
        assert!(result.remote_timestamp.is_none());
        assert_eq!(result.matched_via.to_string(), "not-found:orphan");
        assert_eq!(
            catalog.requested_identifiers().await,
            vec!["orphan", "orphancsv"]
        );
    }

    #[tokio::test]
    async fn test_empty_filename_skips_lookup() {
        let catalog = Arc::new(MockCatalog::with_entries(vec![fixtures::entry(
            "unrelated",
            vec![fixtures::resource("", Some("2030-01-01T00:00:00Z"))],
        )]));

        assert!(reconciler(catalog.clone()).lookup("").await.is_none());
        assert!(catalog.recorded_calls().await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_name_does_not_match_unnamed_resource() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let catalog = Arc::new(MockCatalog::with_entries(vec![fixtures::entry(
            "unrelated",
            vec![fixtures::resource("", Some("2030-01-01T00:00:00Z"))],
        )]));
        let mut file = fixtures::local_file("placeholder.csv", "2024-01-01T00:00:00Z");
        file.path = std::path::PathBuf::from(OsStr::from_bytes(b"/data/caf\xe9_report.csv"));
        assert_eq!(file.file_name(), "caf\u{FFFD}_report.csv");

        let result = reconciler(catalog).reconcile(&file).await;

        assert_eq!(result.status, ReconcileStatus::MissingRemote);
        assert!(result.remote_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_all_sorted_by_path() {
        let catalog = Arc::new(MockCatalog::with_entries(vec![entry_with_metadata(
            "b",
            "2024-01-01T00:00:00",
        )]));
        let files = vec![
            fixtures::local_file("c.csv", "2024-01-01T00:00:00Z"),
            fixtures::local_file("a.csv", "2024-01-01T00:00:00Z"),
            fixtures::local_file("b.csv", "2025-01-01T00:00:00Z"),
        ];

        let results = reconciler(catalog).reconcile_all(files).await;

        let names: Vec<String> = results.iter().map(|r| r.file.file_name().into_owned()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "c.csv"]);
        assert_eq!(results[1].status, ReconcileStatus::LocalNewer);
        assert_eq!(results[0].status, ReconcileStatus::MissingRemote);
    }
}
