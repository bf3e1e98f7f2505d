//! Typed records returned by the catalog action API.

use serde::{Deserialize, Deserializer, Serialize};

use crate::time::{ReferenceTime, ReferenceZone};

/// A file reference attached to a catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    /// Catalog resource ID (UUID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-text name, usually but not reliably the uploaded filename.
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    /// Download URL, which may embed the filename.
    #[serde(default, deserialize_with = "nullable_string")]
    pub url: String,
    /// Short format tag such as "CSV" or "pdf".
    #[serde(default, deserialize_with = "nullable_string")]
    pub format: String,
    /// Creation time (UTC, ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Last modification time (UTC, ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Owning entry ID, present on resource search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
}

impl Resource {
    /// Authoritative timestamp: `last_modified`, falling back to `created`.
    pub fn timestamp(&self, zone: &ReferenceZone) -> Option<ReferenceTime> {
        zone.to_reference_time(self.last_modified.as_deref())
            .or_else(|| zone.to_reference_time(self.created.as_deref()))
    }

    /// Display label used in `matched_via` and logs.
    pub fn label(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.id.as_deref().unwrap_or(&self.url)
        }
    }
}

/// A metadata record in the catalog (a CKAN "package").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Catalog-unique slug.
    #[serde(rename = "name")]
    pub identifier: String,
    /// Catalog UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human title the slug was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Attached resources, in catalog order.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_modified: Option<String>,
    #[serde(default)]
    pub private: bool,
}

impl CatalogEntry {
    /// Entry-level timestamp: `metadata_modified`, falling back to `metadata_created`.
    pub fn timestamp(&self, zone: &ReferenceZone) -> Option<ReferenceTime> {
        zone.to_reference_time(self.metadata_modified.as_deref())
            .or_else(|| zone.to_reference_time(self.metadata_created.as_deref()))
    }

    pub fn title_or_identifier(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.identifier)
    }
}

/// A dataset search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Full-text query (`q`).
    pub text: Option<String>,
    /// Structured filter: entries holding a resource with exactly this name.
    pub resource_name: Option<String>,
    /// Include private entries visible to the API key.
    pub include_private: bool,
}

impl EntryQuery {
    /// Full-text search.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            text: Some(query.into()),
            ..Default::default()
        }
    }

    /// Structured search for entries containing a resource named `name`.
    pub fn resource_name(name: impl Into<String>) -> Self {
        Self {
            resource_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }

    /// Short description for logs and recorded queries.
    pub fn describe(&self) -> String {
        match (&self.text, &self.resource_name) {
            (Some(text), Some(name)) => format!("q={} res_name={}", text, name),
            (Some(text), None) => format!("q={}", text),
            (None, Some(name)) => format!("res_name={}", name),
            (None, None) => "*:*".to_string(),
        }
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_deserialize_package_with_nulls() {
        let json = r#"{
            "id": "8f3c",
            "name": "sensor2024",
            "title": "Sensor 2024",
            "metadata_created": "2024-05-01T08:00:00.000000",
            "metadata_modified": null,
            "private": true,
            "resources": [
                {"id": "r1", "name": null, "url": "http://x/download/sensor_2024.csv",
                 "format": "CSV", "created": "2024-05-01T08:00:00", "last_modified": null}
            ],
            "extras": []
        }"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.identifier, "sensor2024");
        assert!(entry.private);
        assert_eq!(entry.resources.len(), 1);
        assert_eq!(entry.resources[0].name, "");
        assert_eq!(entry.resources[0].label(), "r1");
    }

    #[test]
    fn test_null_resources_become_empty() {
        let json = r#"{"name": "empty", "resources": null}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert!(entry.resources.is_empty());
        assert_eq!(entry.title_or_identifier(), "empty");
    }

    #[test]
    fn test_resource_timestamp_prefers_last_modified() {
        let zone = ReferenceZone::default();
        let resource = Resource {
            created: Some("2024-01-01T08:00:00Z".to_string()),
            last_modified: Some("2024-01-01T09:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(resource.timestamp(&zone).unwrap().hour(), 10);
    }

    #[test]
    fn test_resource_timestamp_falls_back_to_created() {
        let zone = ReferenceZone::default();
        let resource = Resource {
            created: Some("2024-01-01T08:00:00Z".to_string()),
            last_modified: Some("garbage".to_string()),
            ..Default::default()
        };
        assert_eq!(resource.timestamp(&zone).unwrap().hour(), 9);

        let bare = Resource::default();
        assert!(bare.timestamp(&zone).is_none());
    }

    #[test]
    fn test_entry_query_describe() {
        assert_eq!(EntryQuery::text("sensor").describe(), "q=sensor");
        assert_eq!(
            EntryQuery::resource_name("a.csv").describe(),
            "res_name=a.csv"
        );
        assert!(EntryQuery::text("x").with_private(true).include_private);
    }
}
