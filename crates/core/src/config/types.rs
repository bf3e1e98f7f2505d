use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::time::DEFAULT_REFERENCE_TIMEZONE;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// CKAN catalog connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Catalog base URL (e.g., "http://localhost:5000")
    #[serde(default = "default_catalog_url")]
    pub url: String,
    /// API token sent in the Authorization header
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Include private datasets in searches
    #[serde(default = "default_include_private")]
    pub include_private: bool,
    /// Maximum rows requested per search
    #[serde(default = "default_search_rows")]
    pub search_rows: u32,
    /// Skip TLS certificate verification (self-signed dev instances)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
            include_private: default_include_private(),
            search_rows: default_search_rows(),
            accept_invalid_certs: false,
        }
    }
}

impl CatalogConfig {
    /// Base URL with a scheme, falling back to the default when unset.
    pub fn base_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.is_empty() || url.eq_ignore_ascii_case("none") {
            return default_catalog_url();
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        }
    }
}

fn default_catalog_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_include_private() -> bool {
    true
}

fn default_search_rows() -> u32 {
    100
}

/// Local directory scan configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Directory scanned when no directory is given on the command line
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Allowed extensions; `"*"` allows everything
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Extensions that are never included
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,
    /// Directory path substrings that prune a subtree
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            allowed_extensions: default_allowed_extensions(),
            excluded_extensions: default_excluded_extensions(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_excluded_extensions() -> Vec<String> {
    [
        ".tmp", ".log", ".cache", ".pyc", ".pyo", ".bak", ".swp", ".ds_store",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    ["__pycache__", "schema_templates", "templates"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Reconciliation engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// IANA timezone all timestamps are normalized into
    #[serde(default = "default_reference_timezone")]
    pub reference_timezone: String,
    /// Maximum files looked up concurrently
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
    /// Extra search terms for filenames that hint at a known keyword family
    #[serde(default = "default_keyword_families")]
    pub keyword_families: Vec<KeywordFamily>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            reference_timezone: default_reference_timezone(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            keyword_families: default_keyword_families(),
        }
    }
}

fn default_reference_timezone() -> String {
    DEFAULT_REFERENCE_TIMEZONE.to_string()
}

fn default_max_concurrent_lookups() -> usize {
    4
}

fn default_keyword_families() -> Vec<KeywordFamily> {
    vec![KeywordFamily {
        triggers: vec!["cv".into(), "resume".into(), "curriculum".into()],
        synonyms: vec!["cv".into(), "resume".into(), "curriculum vitae".into()],
    }]
}

/// A group of search synonyms triggered by a keyword in the filename.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct KeywordFamily {
    /// Substrings of the lowercase filename stem that activate the family
    pub triggers: Vec<String>,
    /// Queries added to the search fallback
    pub synonyms: Vec<String>,
}

/// Tracking snapshot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    #[serde(default = "default_tracking_enabled")]
    pub enabled: bool,
    #[serde(default = "default_tracking_path")]
    pub path: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: default_tracking_enabled(),
            path: default_tracking_path(),
        }
    }
}

fn default_tracking_enabled() -> bool {
    true
}

fn default_tracking_path() -> PathBuf {
    PathBuf::from("ckansync-tracking.db")
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub catalog: SanitizedCatalogConfig,
    pub monitor: MonitorConfig,
    pub reconcile: ReconcileConfig,
    pub tracking: TrackingConfig,
}

/// Sanitized catalog config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub include_private: bool,
    pub search_rows: u32,
    pub accept_invalid_certs: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            catalog: SanitizedCatalogConfig {
                url: config.catalog.base_url(),
                api_key_configured: !config.catalog.api_key.is_empty(),
                timeout_secs: config.catalog.timeout_secs,
                include_private: config.catalog.include_private,
                search_rows: config.catalog.search_rows,
                accept_invalid_certs: config.catalog.accept_invalid_certs,
            },
            monitor: config.monitor.clone(),
            reconcile: config.reconcile.clone(),
            tracking: config.tracking.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.catalog.url, "http://localhost:5000");
        assert_eq!(config.catalog.timeout_secs, 10);
        assert!(config.catalog.include_private);
        assert_eq!(config.monitor.allowed_extensions, vec!["*"]);
        assert!(config
            .monitor
            .excluded_extensions
            .contains(&".pyc".to_string()));
        assert_eq!(config.reconcile.reference_timezone, "Europe/Berlin");
        assert_eq!(config.reconcile.max_concurrent_lookups, 4);
        assert_eq!(config.reconcile.keyword_families.len(), 1);
        assert!(config.tracking.enabled);
    }

    #[test]
    fn test_deserialize_with_catalog_section() {
        let toml = r#"
[catalog]
url = "https://localhost:8443"
api_key = "secret"
timeout_secs = 20
include_private = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog.url, "https://localhost:8443");
        assert_eq!(config.catalog.api_key, "secret");
        assert_eq!(config.catalog.timeout_secs, 20);
        assert!(!config.catalog.include_private);
        assert_eq!(config.catalog.search_rows, 100); // default
    }

    #[test]
    fn test_deserialize_keyword_families() {
        let toml = r#"
[reconcile]
reference_timezone = "UTC"

[[reconcile.keyword_families]]
triggers = ["invoice"]
synonyms = ["invoice", "bill"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.reconcile.reference_timezone, "UTC");
        assert_eq!(
            config.reconcile.keyword_families,
            vec![KeywordFamily {
                triggers: vec!["invoice".to_string()],
                synonyms: vec!["invoice".to_string(), "bill".to_string()],
            }]
        );
    }

    #[test]
    fn test_base_url_adds_scheme() {
        let mut catalog = CatalogConfig {
            url: "ckan.example.org/".to_string(),
            ..Default::default()
        };
        assert_eq!(catalog.base_url(), "http://ckan.example.org");

        catalog.url = "https://ckan.example.org".to_string();
        assert_eq!(catalog.base_url(), "https://ckan.example.org");

        catalog.url = "None".to_string();
        assert_eq!(catalog.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let mut config = Config::default();
        config.catalog.api_key = "secret-key".to_string();

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.catalog.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
