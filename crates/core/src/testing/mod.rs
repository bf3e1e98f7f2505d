//! Testing utilities and an in-memory catalog.
//!
//! # Example
//!
//! ```rust,ignore
//! use ckansync_core::testing::{fixtures, MockCatalog};
//!
//! let catalog = MockCatalog::with_entries(vec![fixtures::entry("orphan", vec![])]);
//! catalog.set_unreachable(true);
//! ```

mod mock_catalog;

pub use mock_catalog::{MockCatalog, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::catalog::{CatalogEntry, Resource};
    use crate::scanner::{FileCategory, LocalFile};
    use crate::time::ReferenceZone;

    /// A resource with a name, a derived download URL and an optional `last_modified`.
    pub fn resource(name: &str, last_modified: Option<&str>) -> Resource {
        let format = name.rsplit_once('.').map(|(_, ext)| ext.to_uppercase());
        Resource {
            id: Some(format!("res-{}", name.to_lowercase())),
            name: name.to_string(),
            url: format!("http://ckan.test/download/{}", name),
            format: format.unwrap_or_default(),
            created: None,
            last_modified: last_modified.map(str::to_string),
            package_id: None,
        }
    }

    /// An entry with the given identifier and resources.
    pub fn entry(identifier: &str, resources: Vec<Resource>) -> CatalogEntry {
        CatalogEntry {
            identifier: identifier.to_string(),
            id: Some(format!("pkg-{}", identifier)),
            title: Some(identifier.to_string()),
            resources,
            metadata_created: None,
            metadata_modified: None,
            private: false,
        }
    }

    /// A local file under `/data` created at `created_at` (UTC string).
    pub fn local_file(name: &str, created_at: &str) -> LocalFile {
        let path = PathBuf::from("/data").join(name);
        LocalFile {
            category: FileCategory::from_path(&path),
            path,
            created_at: ReferenceZone::default()
                .to_reference_time(Some(created_at))
                .expect("fixture timestamp must parse"),
            size_bytes: 1024,
        }
    }
}
