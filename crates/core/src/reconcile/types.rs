//! Reconciliation outcomes.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::scanner::LocalFile;
use crate::time::ReferenceTime;

/// Verdict for one local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    UpToDate,
    LocalNewer,
    MissingRemote,
    LookupFailed,
}

impl ReconcileStatus {
    /// Whether the file has to be uploaded or updated.
    pub fn needs_sync(&self) -> bool {
        matches!(self, ReconcileStatus::LocalNewer | ReconcileStatus::MissingRemote)
    }

    /// Human-readable reason shown in reports.
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcileStatus::UpToDate => "Up to date",
            ReconcileStatus::LocalNewer => "Local is newer",
            ReconcileStatus::MissingRemote => "Missing in catalog",
            ReconcileStatus::LookupFailed => "Lookup failed",
        }
    }
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Which lookup found the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Search,
}

/// Where inside an entry the timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Timestamp of the best matching resource.
    BestResource,
    /// Latest timestamp across all resources.
    LatestResource,
    /// Entry metadata; the entry has no resources.
    EmptyEntry,
    /// Entry metadata; no resource carries a usable timestamp.
    EntryMetadata,
}

/// Provenance of a remote timestamp, rendered as `direct:<id>`, `resource:<name>` and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedVia {
    Entry {
        strategy: Strategy,
        tier: Tier,
        identifier: String,
    },
    Resource(String),
    NotFound(String),
    CatalogUnavailable,
    /// Skipped because the tracking snapshot showed no change.
    Unchanged,
}

impl fmt::Display for MatchedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedVia::Entry {
                strategy,
                tier,
                identifier,
            } => {
                let prefix = match strategy {
                    Strategy::Direct => "direct",
                    Strategy::Search => "search",
                };
                let suffix = match tier {
                    Tier::BestResource => "",
                    Tier::LatestResource => "-fallback",
                    Tier::EmptyEntry => "-empty",
                    Tier::EntryMetadata => "-entry",
                };
                write!(f, "{}{}:{}", prefix, suffix, identifier)
            }
            MatchedVia::Resource(name) => write!(f, "resource:{}", name),
            MatchedVia::NotFound(slug) => write!(f, "not-found:{}", slug),
            MatchedVia::CatalogUnavailable => f.write_str("catalog-unavailable"),
            MatchedVia::Unchanged => f.write_str("unchanged"),
        }
    }
}

impl Serialize for MatchedVia {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of reconciling one local file.
///
/// `UpToDate` normally implies a remote timestamp. The one exception is a file
/// skipped through the tracking snapshot: it carries `MatchedVia::Unchanged`
/// and no remote timestamp, because the catalog was not asked this run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub file: LocalFile,
    pub status: ReconcileStatus,
    pub remote_timestamp: Option<ReferenceTime>,
    pub matched_via: MatchedVia,
}

impl ReconciliationResult {
    /// Compare the local creation time against a remote timestamp.
    pub fn decide(
        file: LocalFile,
        remote_timestamp: Option<ReferenceTime>,
        matched_via: MatchedVia,
    ) -> Self {
        let status = match remote_timestamp {
            None => ReconcileStatus::MissingRemote,
            Some(remote) if file.created_at > remote => ReconcileStatus::LocalNewer,
            Some(_) => ReconcileStatus::UpToDate,
        };
        Self {
            file,
            status,
            remote_timestamp,
            matched_via,
        }
    }

    pub fn lookup_failed(file: LocalFile) -> Self {
        Self {
            file,
            status: ReconcileStatus::LookupFailed,
            remote_timestamp: None,
            matched_via: MatchedVia::CatalogUnavailable,
        }
    }

    /// A file the tracking snapshot recorded as up to date and that did not change.
    ///
    /// Reported as `UpToDate` without a remote timestamp, unlike `decide`.
    pub fn unchanged(file: LocalFile) -> Self {
        Self {
            file,
            status: ReconcileStatus::UpToDate,
            remote_timestamp: None,
            matched_via: MatchedVia::Unchanged,
        }
    }
}
