//! Mock catalog for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::catalog::{CatalogClient, CatalogEntry, CatalogError, EntryQuery, Resource};

/// A call made against the mock, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Status,
    GetEntry(String),
    SearchEntries(EntryQuery),
    SearchResources(String),
    GetResource(String),
}

/// In-memory implementation of `CatalogClient`.
///
/// - `get_entry` matches identifiers exactly
/// - text search matches identifier, title or resource names (case-insensitive substring)
/// - `res_name` search matches resource names exactly (case-insensitive)
/// - resource search is off unless enabled, mirroring catalogs without it
///
/// # Example
///
/// ```rust,ignore
/// use ckansync_core::testing::{fixtures, MockCatalog};
///
/// let catalog = MockCatalog::with_entries(vec![fixtures::entry(
///     "sensor2024",
///     vec![fixtures::resource("sensor_2024.csv", Some("2024-06-01T09:00:00"))],
/// )]);
/// catalog.set_next_error(CatalogError::Timeout).await;
/// ```
pub struct MockCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
    /// Results for `search_resources`, possibly trimmed records.
    searchable_resources: RwLock<Vec<Resource>>,
    /// Full records served by `get_resource`.
    resource_records: RwLock<Vec<Resource>>,
    calls: RwLock<Vec<RecordedCall>>,
    next_error: RwLock<Option<CatalogError>>,
    /// Identifiers whose direct lookup fails with a transport-like error.
    failing_identifiers: RwLock<HashSet<String>>,
    unreachable: AtomicBool,
    resource_search_enabled: AtomicBool,
}

impl std::fmt::Debug for MockCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalog")
            .field("unreachable", &self.unreachable.load(Ordering::SeqCst))
            .field(
                "resource_search_enabled",
                &self.resource_search_enabled.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create an empty, reachable catalog.
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            searchable_resources: RwLock::new(Vec::new()),
            resource_records: RwLock::new(Vec::new()),
            calls: RwLock::new(Vec::new()),
            next_error: RwLock::new(None),
            failing_identifiers: RwLock::new(HashSet::new()),
            unreachable: AtomicBool::new(false),
            resource_search_enabled: AtomicBool::new(false),
        }
    }

    pub async fn add_entry(&self, entry: CatalogEntry) {
        self.entries.write().await.push(entry);
    }

    /// Enable resource search and serve `resources` from it.
    pub async fn set_searchable_resources(&self, resources: Vec<Resource>) {
        self.resource_search_enabled.store(true, Ordering::SeqCst);
        *self.searchable_resources.write().await = resources;
    }

    /// Add a full resource record for `get_resource`.
    pub async fn add_resource_record(&self, resource: Resource) {
        self.resource_records.write().await.push(resource);
    }

    pub fn set_resource_search_enabled(&self, enabled: bool) {
        self.resource_search_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Make every call fail as if the catalog were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make direct lookups of `identifier` fail.
    pub async fn fail_identifier(&self, identifier: &str) {
        self.failing_identifiers
            .write()
            .await
            .insert(identifier.to_string());
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Identifiers requested through `get_entry`, in call order.
    pub async fn requested_identifiers(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCall::GetEntry(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Entry queries made through `search_entries`, in call order.
    pub async fn recorded_searches(&self) -> Vec<EntryQuery> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCall::SearchEntries(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn enter(&self, call: RecordedCall) -> Result<(), CatalogError> {
        self.calls.write().await.push(call);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CatalogError::ApiError {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(())
    }
}

fn entry_matches(entry: &CatalogEntry, query: &EntryQuery) -> bool {
    if entry.private && !query.include_private {
        return false;
    }
    if let Some(name) = &query.resource_name {
        let name = name.to_lowercase();
        if !entry
            .resources
            .iter()
            .any(|r| r.name.to_lowercase() == name)
        {
            return false;
        }
    }
    if let Some(text) = &query.text {
        let text = text.to_lowercase();
        let in_title = entry
            .title
            .as_ref()
            .is_some_and(|t| t.to_lowercase().contains(&text));
        let in_resources = entry
            .resources
            .iter()
            .any(|r| r.name.to_lowercase().contains(&text));
        if !(entry.identifier.to_lowercase().contains(&text) || in_title || in_resources) {
            return false;
        }
    }
    true
}

#[async_trait]
impl CatalogClient for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_status(&self) -> Result<(), CatalogError> {
        self.enter(RecordedCall::Status).await
    }

    async fn get_entry(&self, identifier: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        self.enter(RecordedCall::GetEntry(identifier.to_string()))
            .await?;
        if self.failing_identifiers.read().await.contains(identifier) {
            return Err(CatalogError::Timeout);
        }
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|e| e.identifier == identifier)
            .cloned())
    }

    async fn search_entries(&self, query: &EntryQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.enter(RecordedCall::SearchEntries(query.clone())).await?;
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| entry_matches(e, query))
            .cloned()
            .collect())
    }

    async fn search_resources(&self, query: &str) -> Result<Vec<Resource>, CatalogError> {
        self.enter(RecordedCall::SearchResources(query.to_string()))
            .await?;
        if !self.resource_search_enabled.load(Ordering::SeqCst) {
            return Err(CatalogError::Unsupported("resource_search".to_string()));
        }
        let needle = query
            .strip_prefix("name:")
            .unwrap_or(query)
            .to_lowercase();
        Ok(self
            .searchable_resources
            .read()
            .await
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_resource(&self, id: &str) -> Result<Option<Resource>, CatalogError> {
        self.enter(RecordedCall::GetResource(id.to_string())).await?;
        let records = self.resource_records.read().await;
        if let Some(found) = records.iter().find(|r| r.id.as_deref() == Some(id)) {
            return Ok(Some(found.clone()));
        }
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .flat_map(|e| e.resources.iter())
            .find(|r| r.id.as_deref() == Some(id))
            .cloned())
    }

    async fn count_entries(&self) -> Result<usize, CatalogError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_get_entry_and_recording() {
        let catalog = MockCatalog::with_entries(vec![fixtures::entry("a", vec![])]);
        assert!(catalog.get_entry("a").await.unwrap().is_some());
        assert!(catalog.get_entry("b").await.unwrap().is_none());
        assert_eq!(catalog.requested_identifiers().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_next_error_is_consumed() {
        let catalog = MockCatalog::new();
        catalog.set_next_error(CatalogError::Timeout).await;
        assert!(matches!(
            catalog.check_status().await,
            Err(CatalogError::Timeout)
        ));
        assert!(catalog.check_status().await.is_ok());
    }

    #[tokio::test]
    async fn test_search_semantics() {
        let mut private = fixtures::entry("hidden", vec![fixtures::resource("x.csv", None)]);
        private.private = true;
        let catalog = MockCatalog::with_entries(vec![
            fixtures::entry("weather", vec![fixtures::resource("Station_A.csv", None)]),
            private,
        ]);

        let hits = catalog
            .search_entries(&EntryQuery::resource_name("station_a.csv"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let hits = catalog
            .search_entries(&EntryQuery::text("x.csv"))
            .await
            .unwrap();
        assert!(hits.is_empty());

        let hits = catalog
            .search_entries(&EntryQuery::text("x.csv").with_private(true))
            .await
            .unwrap();
        assert_eq!(hits[0].identifier, "hidden");
    }

    #[tokio::test]
    async fn test_resource_search_disabled_by_default() {
        let catalog = MockCatalog::new();
        assert!(matches!(
            catalog.search_resources("name:a.csv").await,
            Err(CatalogError::Unsupported(_))
        ));
        catalog.set_unreachable(true);
        assert!(catalog.count_entries().await.is_ok());
        assert!(catalog.check_status().await.is_err());
    }
}
