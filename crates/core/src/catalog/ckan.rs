//! CKAN action API client.
//!
//! Every action answers with an envelope `{"success": bool, "result": ...}`
//! or `{"success": false, "error": {"__type": ..., "message": ...}}`.
//! A missing entry surfaces as HTTP 404 with `__type = "Not Found Error"`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::types::{CatalogEntry, EntryQuery, Resource};
use super::{CatalogClient, CatalogError};
use crate::config::CatalogConfig;

const NOT_FOUND_ERROR: &str = "Not Found Error";

/// Maximum characters of a non-JSON error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// CKAN catalog client.
pub struct CkanClient {
    client: Client,
    base_url: String,
    search_rows: u32,
}

impl CkanClient {
    /// Create a new CKAN client.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let value = HeaderValue::from_str(&config.api_key).map_err(|_| {
                CatalogError::NotConfigured("API key is not a valid header value".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(format!("ckansync/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            search_rows: config.search_rows,
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{}", self.base_url, action)
    }

    /// Send a request and decode the action envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>, CatalogError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        debug!(action = %action, status, bytes = body.len(), "CKAN action response");

        decode_envelope(status, &body)
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, CatalogError> {
        let request = self.client.get(self.action_url(action)).query(params);
        self.call(action, request).await
    }

    async fn post_action<T: DeserializeOwned>(
        &self,
        action: &str,
        body: &serde_json::Value,
    ) -> Result<Option<T>, CatalogError> {
        let request = self.client.post(self.action_url(action)).json(body);
        self.call(action, request).await
    }

    fn search_params(&self, query: &EntryQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            (
                "q",
                query.text.clone().unwrap_or_else(|| "*:*".to_string()),
            ),
            ("rows", self.search_rows.to_string()),
            ("include_private", query.include_private.to_string()),
        ];
        if let Some(name) = &query.resource_name {
            params.push(("fq", format!("res_name:\"{}\"", escape_solr_phrase(name))));
        }
        params
    }
}

#[async_trait]
impl CatalogClient for CkanClient {
    fn name(&self) -> &str {
        "ckan"
    }

    async fn check_status(&self) -> Result<(), CatalogError> {
        let status: Option<serde_json::Value> = self.get_action("status_show", &[]).await?;
        match status {
            Some(_) => Ok(()),
            None => Err(CatalogError::ApiError {
                status: 404,
                message: "status_show is not available".to_string(),
            }),
        }
    }

    async fn get_entry(&self, identifier: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        debug!(identifier = %identifier, "CKAN package_show");
        self.get_action("package_show", &[("id", identifier.to_string())])
            .await
    }

    async fn search_entries(&self, query: &EntryQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        debug!(query = %query.describe(), "CKAN package_search");
        let page: Option<SearchPage<CatalogEntry>> = self
            .get_action("package_search", &self.search_params(query))
            .await?;
        Ok(page.map(|p| p.results).unwrap_or_default())
    }

    async fn search_resources(&self, query: &str) -> Result<Vec<Resource>, CatalogError> {
        debug!(query = %query, "CKAN resource_search");
        let page: Option<SearchPage<Resource>> = self
            .post_action(
                "resource_search",
                &json!({ "query": query, "limit": self.search_rows }),
            )
            .await?;
        match page {
            Some(p) => Ok(p.results),
            // An instance without the action answers 404 for the endpoint itself.
            None => Err(CatalogError::Unsupported("resource_search".to_string())),
        }
    }

    async fn get_resource(&self, id: &str) -> Result<Option<Resource>, CatalogError> {
        debug!(id = %id, "CKAN resource_show");
        self.get_action("resource_show", &[("id", id.to_string())])
            .await
    }

    async fn count_entries(&self) -> Result<usize, CatalogError> {
        let names: Option<Vec<String>> = self.get_action("package_list", &[]).await?;
        Ok(names.map(|n| n.len()).unwrap_or(0))
    }
}

// ============================================================================
// CKAN API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ActionEnvelope<T> {
    success: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<ActionError>,
}

#[derive(Debug, Deserialize)]
struct ActionError {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ActionError {
    fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some(NOT_FOUND_ERROR)
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (Some(kind), None) => kind.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

fn transport_error(e: reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Timeout
    } else {
        CatalogError::HttpError(e)
    }
}

/// Decode an action envelope. `Ok(None)` means "not found".
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, CatalogError> {
    let envelope: ActionEnvelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            if status == 404 {
                return Ok(None);
            }
            if !(200..300).contains(&status) {
                return Err(CatalogError::ApiError {
                    status,
                    message: body.chars().take(ERROR_BODY_LIMIT).collect(),
                });
            }
            return Err(CatalogError::ParseError(e.to_string()));
        }
    };

    if envelope.success {
        return envelope
            .result
            .map(Some)
            .ok_or_else(|| CatalogError::ParseError("envelope without result".to_string()));
    }

    match envelope.error {
        Some(error) if error.is_not_found() => Ok(None),
        _ if status == 404 => Ok(None),
        Some(error) => Err(CatalogError::ApiError {
            status,
            message: error.describe(),
        }),
        None => Err(CatalogError::ApiError {
            status,
            message: "unsuccessful response without error detail".to_string(),
        }),
    }
}

fn escape_solr_phrase(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let body = r#"{"help": "...", "success": true, "result": {"name": "sensor2024", "resources": []}}"#;
        let entry: Option<CatalogEntry> = decode_envelope(200, body).unwrap();
        assert_eq!(entry.unwrap().identifier, "sensor2024");
    }

    #[test]
    fn test_decode_not_found_error() {
        let body = r#"{"success": false, "error": {"__type": "Not Found Error", "message": "Not found"}}"#;
        let entry: Option<CatalogEntry> = decode_envelope(404, body).unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn test_decode_html_404_is_not_found() {
        let entry: Option<CatalogEntry> = decode_envelope(404, "<html>Not Found</html>").unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn test_decode_authorization_error() {
        let body = r#"{"success": false, "error": {"__type": "Authorization Error", "message": "Access denied"}}"#;
        let result: Result<Option<CatalogEntry>, _> = decode_envelope(403, body);
        match result {
            Err(CatalogError::ApiError { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "Authorization Error: Access denied");
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_server_error_with_html_body() {
        let result: Result<Option<CatalogEntry>, _> = decode_envelope(502, "Bad Gateway");
        assert!(matches!(
            result,
            Err(CatalogError::ApiError { status: 502, .. })
        ));
    }

    #[test]
    fn test_decode_garbage_with_ok_status() {
        let result: Result<Option<CatalogEntry>, _> = decode_envelope(200, "not json");
        assert!(matches!(result, Err(CatalogError::ParseError(_))));
    }

    #[test]
    fn test_decode_search_page() {
        let body = r#"{"success": true, "result": {"count": 2, "results": [
            {"name": "a", "resources": []},
            {"name": "b", "resources": [{"name": "b.csv", "url": "", "format": "CSV"}]}
        ]}}"#;
        let page: Option<SearchPage<CatalogEntry>> = decode_envelope(200, body).unwrap();
        let results = page.unwrap().results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].resources[0].name, "b.csv");
    }

    #[test]
    fn test_search_params() {
        let client = CkanClient::new(&CatalogConfig::default()).unwrap();
        let params =
            client.search_params(&EntryQuery::resource_name("my \"file\".csv").with_private(true));

        assert!(params.contains(&("q", "*:*".to_string())));
        assert!(params.contains(&("rows", "100".to_string())));
        assert!(params.contains(&("include_private", "true".to_string())));
        assert!(params.contains(&("fq", r#"res_name:"my \"file\".csv""#.to_string())));
    }

    #[test]
    fn test_action_url() {
        let config = CatalogConfig {
            url: "ckan.local:5000/".to_string(),
            ..Default::default()
        };
        let client = CkanClient::new(&config).unwrap();
        assert_eq!(
            client.action_url("package_show"),
            "http://ckan.local:5000/api/3/action/package_show"
        );
    }
}
