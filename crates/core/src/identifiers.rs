//! Catalog identifier and search term derivation from local filenames.
//!
//! CKAN derives a dataset `name` from its title by lowercasing and dropping
//! every non-alphanumeric character. Applying the same rule to a filename
//! gives the most likely direct hit, followed by looser variants.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::config::KeywordFamily;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").unwrap());
static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static WORD_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\-\s]+").unwrap());

/// Split a filename into (stem, extension without dot).
///
/// A leading dot is part of the stem (`.env` has no extension).
pub fn split_name(filename: &str) -> (&str, &str) {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    (stem, ext)
}

/// Catalog-style slug: lowercase, `[a-z0-9]` only.
pub fn catalog_slug(text: &str) -> String {
    NON_ALNUM.replace_all(&text.to_lowercase(), "").into_owned()
}

/// Lowercase slug with runs of other characters collapsed into single hyphens.
pub fn hyphen_slug(text: &str) -> String {
    NON_ALNUM_RUN
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Ordered, deduplicated catalog identifiers to try for `filename`.
///
/// The first element mirrors the catalog's own slug rule and is the most
/// likely direct hit.
pub fn candidate_identifiers(filename: &str) -> Vec<String> {
    let (stem, _) = split_name(filename);
    let lower = stem.to_lowercase();

    let mut ids = Vec::with_capacity(5);
    ids.push(catalog_slug(stem));

    let full = catalog_slug(filename);
    if full != ids[0] {
        ids.push(full);
    }

    if stem != lower {
        ids.push(stem.to_string());
    }

    ids.push(lower);
    ids.push(hyphen_slug(stem));

    dedup_non_empty(ids)
}

/// Ordered full-text queries for the search fallback.
pub fn search_queries(filename: &str, families: &[KeywordFamily]) -> Vec<String> {
    let (stem, _) = split_name(filename);
    let lower = stem.to_lowercase();

    let mut queries = vec![
        stem.to_string(),
        catalog_slug(stem),
        filename.to_string(),
        stem.replace('_', " "),
        stem.replace('_', "-"),
    ];

    for family in families {
        if family
            .triggers
            .iter()
            .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
        {
            queries.extend(family.synonyms.iter().cloned());
        }
    }

    dedup_non_empty(queries)
}

/// Broad term list for interactive diagnostics.
pub fn diagnostic_search_terms(filename: &str) -> Vec<String> {
    let (stem, _) = split_name(filename);

    let mut terms = vec![
        filename.to_string(),
        stem.to_string(),
        filename.to_lowercase(),
        stem.to_lowercase(),
        catalog_slug(stem),
    ];

    let spaced = stem.replace(['_', '-'], " ");
    if spaced != stem {
        terms.push(spaced);
    }

    for word in WORD_SEPARATORS.split(stem) {
        if word.chars().count() > 2 {
            terms.push(word.to_string());
            terms.push(word.to_lowercase());
        }
    }

    dedup_non_empty(terms)
}

fn dedup_non_empty(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
