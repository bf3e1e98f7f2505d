//! Resource matching: which catalog resource corresponds to a local file.
//!
//! Each resource is scored against the filename with a fixed rubric. The
//! first rule that applies gives the resource its score; the highest scoring
//! resource wins and ties keep catalog order. Scores are deterministic.

use std::fmt;

use tracing::debug;

use crate::catalog::{CatalogEntry, Resource};
use crate::identifiers::{catalog_slug, split_name};
use crate::time::{ReferenceTime, ReferenceZone};

/// Minimum stem length for a title containment match.
const MIN_TITLE_STEM_LEN: usize = 3;

/// Required share of stem tokens found in the title.
const MIN_TITLE_TOKEN_OVERLAP: f64 = 0.5;

/// A scoring rule, ordered from strongest to weakest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchRule {
    ExactName,
    NameWithoutExtension,
    UrlContainsFilename,
    UrlContainsStem,
    FormatAndToken,
    OnlyResource,
}

impl MatchRule {
    pub fn score(&self) -> u32 {
        match self {
            MatchRule::ExactName => 100,
            MatchRule::NameWithoutExtension => 90,
            MatchRule::UrlContainsFilename => 80,
            MatchRule::UrlContainsStem => 70,
            MatchRule::FormatAndToken => 60,
            MatchRule::OnlyResource => 50,
        }
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MatchRule::ExactName => "Exact filename match",
            MatchRule::NameWithoutExtension => "Filename match (no extension)",
            MatchRule::UrlContainsFilename => "URL contains filename",
            MatchRule::UrlContainsStem => "URL contains filename base",
            MatchRule::FormatAndToken => "Format match + partial name match",
            MatchRule::OnlyResource => "Only resource",
        };
        f.write_str(text)
    }
}

/// A resource that scored above zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate<'a> {
    pub resource: &'a Resource,
    pub score: u32,
    pub reasons: Vec<MatchRule>,
}

/// The winning resource and its normalized timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMatch<'a> {
    pub resource: &'a Resource,
    pub score: u32,
    pub reasons: Vec<MatchRule>,
    /// `None` when the resource carries no usable timestamp.
    pub timestamp: Option<ReferenceTime>,
}

/// Lowercased filename parts shared by all rules.
struct Target {
    filename: String,
    stem: String,
    extension: String,
    tokens: Vec<String>,
}

impl Target {
    fn new(filename: &str) -> Self {
        let (stem, ext) = split_name(filename);
        let stem = stem.to_lowercase();
        let tokens = stem
            .split('_')
            .filter(|t| t.chars().count() > 2)
            .map(str::to_string)
            .collect();
        Self {
            filename: filename.to_lowercase(),
            stem,
            extension: ext.to_lowercase(),
            tokens,
        }
    }
}

/// Score one resource. `set_size` is the number of resources considered.
fn score_against(resource: &Resource, target: &Target, set_size: usize) -> Option<MatchRule> {
    let name = resource.name.to_lowercase();
    let url = resource.url.to_lowercase();
    let format = resource.format.to_lowercase();

    if target.filename.is_empty() {
        return None;
    }

    if name == target.filename {
        Some(MatchRule::ExactName)
    } else if !target.stem.is_empty() && name == target.stem {
        Some(MatchRule::NameWithoutExtension)
    } else if !target.filename.is_empty() && url.contains(&target.filename) {
        Some(MatchRule::UrlContainsFilename)
    } else if !target.stem.is_empty() && url.contains(&target.stem) {
        Some(MatchRule::UrlContainsStem)
    } else if format == target.extension && target.tokens.iter().any(|t| name.contains(t.as_str())) {
        Some(MatchRule::FormatAndToken)
    } else if set_size == 1 {
        Some(MatchRule::OnlyResource)
    } else {
        None
    }
}

/// Score a single resource against `filename`; 0 means excluded.
pub fn score_resource(resource: &Resource, filename: &str, set_size: usize) -> u32 {
    score_against(resource, &Target::new(filename), set_size)
        .map(|rule| rule.score())
        .unwrap_or(0)
}

/// Every resource that scored above zero, in catalog order.
pub fn score_resources<'a>(resources: &'a [Resource], filename: &str) -> Vec<MatchCandidate<'a>> {
    let target = Target::new(filename);
    resources
        .iter()
        .filter_map(|resource| {
            score_against(resource, &target, resources.len()).map(|rule| MatchCandidate {
                resource,
                score: rule.score(),
                reasons: vec![rule],
            })
        })
        .collect()
}

/// Pick the resource that best corresponds to `filename`.
pub fn best_match<'a>(
    resources: &'a [Resource],
    filename: &str,
    zone: &ReferenceZone,
) -> Option<ResourceMatch<'a>> {
    let candidates = score_resources(resources, filename);

    for candidate in &candidates {
        debug!(
            resource = %candidate.resource.label(),
            score = candidate.score,
            reasons = ?candidate.reasons,
            "Scored resource"
        );
    }

    // Strictly greater keeps the first of equal scores.
    let best = candidates
        .into_iter()
        .fold(None, |best: Option<MatchCandidate<'a>>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })?;

    let timestamp = best.resource.timestamp(zone);
    debug!(
        resource = %best.resource.label(),
        score = best.score,
        timestamp = ?timestamp.map(|t| t.to_rfc3339()),
        "Best resource match"
    );

    Some(ResourceMatch {
        resource: best.resource,
        score: best.score,
        reasons: best.reasons,
        timestamp,
    })
}

/// Most recent timestamp across all resources, ignoring ones without any.
pub fn latest_resource_timestamp(
    resources: &[Resource],
    zone: &ReferenceZone,
) -> Option<ReferenceTime> {
    resources.iter().filter_map(|r| r.timestamp(zone)).max()
}

/// Entry-level timestamp, used when no resource carries one.
pub fn entry_timestamp(entry: &CatalogEntry, zone: &ReferenceZone) -> Option<ReferenceTime> {
    entry.timestamp(zone)
}

/// How a search result was accepted as the entry for a file, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Acceptance {
    /// Entry identifier equals the catalog slug of the stem.
    Slug,
    /// Entry identifier equals the stem, case-insensitively.
    Name,
    /// Title contains the stem and shares at least half its tokens.
    Title,
    /// Entry holds a resource named exactly like the file.
    ResourceName,
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Acceptance::Slug => "slug",
            Acceptance::Name => "name",
            Acceptance::Title => "title",
            Acceptance::ResourceName => "resource-name",
        };
        f.write_str(text)
    }
}

/// Strict acceptance test for search results.
pub fn accept_entry(entry: &CatalogEntry, filename: &str) -> Option<Acceptance> {
    let (stem, _) = split_name(filename);
    let stem_lower = stem.to_lowercase();

    if stem.trim().is_empty() {
        return None;
    }

    if entry.identifier == catalog_slug(stem) {
        return Some(Acceptance::Slug);
    }
    if entry.identifier.to_lowercase() == stem_lower {
        return Some(Acceptance::Name);
    }
    if let Some(title) = &entry.title {
        if title_matches(title, &stem_lower) {
            return Some(Acceptance::Title);
        }
    }
    let filename_lower = filename.to_lowercase();
    if entry
        .resources
        .iter()
        .any(|r| r.name.to_lowercase() == filename_lower)
    {
        return Some(Acceptance::ResourceName);
    }
    None
}

fn title_matches(title: &str, stem_lower: &str) -> bool {
    let title_lower = title.to_lowercase();
    if stem_lower.chars().count() <= MIN_TITLE_STEM_LEN || !title_lower.contains(stem_lower) {
        return false;
    }

    let title_words: Vec<&str> = title_lower.split_whitespace().collect();
    let stem_spaced = stem_lower.replace('_', " ");
    let mut stem_words: Vec<&str> = stem_spaced.split_whitespace().collect();
    stem_words.sort_unstable();
    stem_words.dedup();

    if stem_words.is_empty() {
        return false;
    }

    let shared = stem_words.iter().filter(|w| title_words.contains(w)).count();
    shared as f64 / stem_words.len() as f64 >= MIN_TITLE_TOKEN_OVERLAP
}

/// Keep accepted entries, strongest acceptance first, search order within a tier.
pub fn rank_accepted<'a>(
    entries: &'a [CatalogEntry],
    filename: &str,
) -> Vec<(Acceptance, &'a CatalogEntry)> {
    let mut accepted: Vec<(Acceptance, &CatalogEntry)> = entries
        .iter()
        .filter_map(|e| accept_entry(e, filename).map(|a| (a, e)))
        .collect();
    // Stable sort preserves search order among equal tiers.
    accepted.sort_by_key(|(a, _)| *a);
    accepted
}
