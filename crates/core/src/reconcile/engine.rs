//! Lookup cascade and decision for local files.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::types::{MatchedVia, ReconciliationResult, Strategy, Tier};
use crate::catalog::{CatalogClient, CatalogEntry, CatalogError, EntryQuery};
use crate::config::{Config, KeywordFamily};
use crate::identifiers::{candidate_identifiers, catalog_slug, search_queries, split_name};
use crate::matcher::{
    best_match, entry_timestamp, latest_resource_timestamp, rank_accepted, score_resources,
};
use crate::scanner::LocalFile;
use crate::time::{ReferenceTime, ReferenceZone};

/// Knobs for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub include_private: bool,
    pub max_concurrent_lookups: usize,
    pub keyword_families: Vec<KeywordFamily>,
    /// Trace every candidate, query and resource score.
    pub debug: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ReconcileSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            include_private: config.catalog.include_private,
            max_concurrent_lookups: config.reconcile.max_concurrent_lookups,
            keyword_families: config.reconcile.keyword_families.clone(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// A remote timestamp and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMatch {
    pub timestamp: ReferenceTime,
    pub matched_via: MatchedVia,
}

/// Finds the catalog counterpart of local files and compares timestamps.
pub struct Reconciler {
    client: Arc<dyn CatalogClient>,
    settings: ReconcileSettings,
    zone: ReferenceZone,
}

impl Reconciler {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        settings: ReconcileSettings,
        zone: ReferenceZone,
    ) -> Self {
        Self {
            client,
            settings,
            zone,
        }
    }

    /// Reconcile one file. Never fails: lookup errors degrade to later steps.
    pub async fn reconcile(&self, file: &LocalFile) -> ReconciliationResult {
        let name = file.file_name();
        let filename = name.as_ref();

        match self.lookup(filename).await {
            Some(found) => {
                let result = ReconciliationResult::decide(
                    file.clone(),
                    Some(found.timestamp),
                    found.matched_via,
                );
                debug!(
                    file = %filename,
                    local = %file.created_at.to_rfc3339(),
                    remote = %found.timestamp.to_rfc3339(),
                    matched_via = %result.matched_via,
                    status = ?result.status,
                    "Reconciled file"
                );
                result
            }
            None => {
                let (stem, _) = split_name(filename);
                debug!(file = %filename, "No catalog counterpart");
                ReconciliationResult::decide(
                    file.clone(),
                    None,
                    MatchedVia::NotFound(catalog_slug(stem)),
                )
            }
        }
    }

    /// Reconcile many files with bounded concurrency; results are sorted by path.
    pub async fn reconcile_all(&self, files: Vec<LocalFile>) -> Vec<ReconciliationResult> {
        let total = files.len();
        info!(
            files = total,
            concurrency = self.settings.max_concurrent_lookups,
            catalog = %self.client.name(),
            "Reconciling files"
        );

        let mut results: Vec<ReconciliationResult> = stream::iter(files)
            .map(|file| async move { self.reconcile(&file).await })
            .buffer_unordered(self.settings.max_concurrent_lookups.max(1))
            .collect()
            .await;

        results.sort_by(|a, b| a.file.path.cmp(&b.file.path));
        results
    }

    /// Run the lookup cascade for a filename.
    pub async fn lookup(&self, filename: &str) -> Option<RemoteMatch> {
        if filename.trim().is_empty() {
            warn!("Skipping lookup for a file without a usable name");
            return None;
        }
        if let Some(found) = self.direct_lookup(filename).await {
            return Some(found);
        }
        if let Some(found) = self.search_lookup(filename).await {
            return Some(found);
        }
        self.resource_lookup(filename).await
    }

    async fn direct_lookup(&self, filename: &str) -> Option<RemoteMatch> {
        let candidates = candidate_identifiers(filename);
        if self.settings.debug {
            debug!(file = %filename, candidates = ?candidates, "Direct lookup candidates");
        }

        for identifier in &candidates {
            match self.client.get_entry(identifier).await {
                Ok(Some(entry)) => {
                    if let Some(found) = self.resolve_entry(&entry, filename, Strategy::Direct) {
                        return Some(found);
                    }
                    debug!(identifier = %identifier, "Entry has no usable timestamp");
                }
                Ok(None) => {
                    debug!(identifier = %identifier, "No entry with this identifier");
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Direct lookup failed");
                }
            }
        }
        None
    }

    async fn search_lookup(&self, filename: &str) -> Option<RemoteMatch> {
        let mut queries = vec![EntryQuery::resource_name(filename)];
        queries.extend(
            search_queries(filename, &self.settings.keyword_families)
                .into_iter()
                .map(EntryQuery::text),
        );

        for query in queries {
            let query = query.with_private(self.settings.include_private);
            let entries = match self.client.search_entries(&query).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(query = %query.describe(), error = %e, "Search failed");
                    continue;
                }
            };

            let ranked = rank_accepted(&entries, filename);
            if self.settings.debug {
                debug!(
                    query = %query.describe(),
                    hits = entries.len(),
                    accepted = ranked.len(),
                    "Search results"
                );
            }

            for (acceptance, entry) in ranked {
                if let Some(found) = self.resolve_entry(entry, filename, Strategy::Search) {
                    debug!(
                        identifier = %entry.identifier,
                        acceptance = %acceptance,
                        "Accepted search result"
                    );
                    return Some(found);
                }
            }
        }
        None
    }

    async fn resource_lookup(&self, filename: &str) -> Option<RemoteMatch> {
        let resources = match self
            .client
            .search_resources(&format!("name:{}", filename))
            .await
        {
            Ok(resources) => resources,
            Err(CatalogError::Unsupported(what)) => {
                debug!(capability = %what, "Resource search unavailable");
                return None;
            }
            Err(e) => {
                warn!(file = %filename, error = %e, "Resource search failed");
                return None;
            }
        };

        let best = best_match(&resources, filename, &self.zone)?;
        let label = best.resource.label().to_string();
        let matched_via = MatchedVia::Resource(label.clone());

        if let Some(timestamp) = best.timestamp {
            return Some(RemoteMatch {
                timestamp,
                matched_via,
            });
        }

        // Search results can be trimmed; the full record may carry the timestamp.
        let id = best.resource.id.clone()?;
        match self.client.get_resource(&id).await {
            Ok(Some(full)) => full.timestamp(&self.zone).map(|timestamp| RemoteMatch {
                timestamp,
                matched_via,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(resource = %label, error = %e, "Resource lookup failed");
                None
            }
        }
    }

    /// Pick the timestamp an entry offers for `filename`.
    ///
    /// Order: best matching resource, latest resource, entry metadata.
    fn resolve_entry(
        &self,
        entry: &CatalogEntry,
        filename: &str,
        strategy: Strategy,
    ) -> Option<RemoteMatch> {
        if self.settings.debug {
            for candidate in score_resources(&entry.resources, filename) {
                debug!(
                    entry = %entry.identifier,
                    resource = %candidate.resource.label(),
                    score = candidate.score,
                    "Resource candidate"
                );
            }
        }

        let (tier, timestamp) = if let Some(ts) =
            best_match(&entry.resources, filename, &self.zone).and_then(|m| m.timestamp)
        {
            (Tier::BestResource, Some(ts))
        } else if let Some(ts) = latest_resource_timestamp(&entry.resources, &self.zone) {
            (Tier::LatestResource, Some(ts))
        } else if entry.resources.is_empty() {
            (Tier::EmptyEntry, entry_timestamp(entry, &self.zone))
        } else {
            (Tier::EntryMetadata, entry_timestamp(entry, &self.zone))
        };

        timestamp.map(|timestamp| RemoteMatch {
            timestamp,
            matched_via: MatchedVia::Entry {
                strategy,
                tier,
                identifier: entry.identifier.clone(),
            },
        })
    }
}
