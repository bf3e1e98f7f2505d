//! Local directory scanning.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::MonitorConfig;
use crate::time::{ReferenceTime, ReferenceZone};

const WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse grouping of files by extension, used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FileCategory {
    Documents,
    Spreadsheets,
    Data,
    Images,
    Archives,
    Scripts,
    Config,
    Media,
    Other,
    NoExtension,
}

const CATEGORY_TABLE: &[(FileCategory, &[&str])] = &[
    (FileCategory::Documents, &["pdf", "doc", "docx", "txt", "rtf", "odt"]),
    (FileCategory::Spreadsheets, &["xlsx", "xls", "csv", "ods"]),
    (FileCategory::Data, &["json", "xml", "yaml", "yml", "sql"]),
    (
        FileCategory::Images,
        &["jpg", "jpeg", "png", "gif", "bmp", "svg", "tiff", "webp"],
    ),
    (FileCategory::Archives, &["zip", "rar", "7z", "tar", "gz", "bz2"]),
    (FileCategory::Scripts, &["py", "js", "sh", "bat", "ps1", "r"]),
    (FileCategory::Config, &["ini", "conf", "cfg", "properties", "env"]),
    (FileCategory::Media, &["mp4", "avi", "mov", "mp3", "wav", "flac"]),
];

impl FileCategory {
    /// Category for a path, from its lowercase extension.
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return FileCategory::NoExtension;
        };
        let ext = ext.to_lowercase();
        CATEGORY_TABLE
            .iter()
            .find(|(_, exts)| exts.contains(&ext.as_str()))
            .map(|(category, _)| *category)
            .unwrap_or(FileCategory::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Documents => "Documents",
            FileCategory::Spreadsheets => "Spreadsheets",
            FileCategory::Data => "Data",
            FileCategory::Images => "Images",
            FileCategory::Archives => "Archives",
            FileCategory::Scripts => "Scripts",
            FileCategory::Config => "Config",
            FileCategory::Media => "Media",
            FileCategory::Other => "Other",
            FileCategory::NoExtension => "No Extension",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file found by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    /// Absolute, normalized path. Unique key within a scan.
    pub path: PathBuf,
    /// Creation time as a wall-clock reading in the reference zone.
    pub created_at: ReferenceTime,
    pub size_bytes: u64,
    pub category: FileCategory,
}

impl LocalFile {
    /// Final path component. Bytes that are not UTF-8 become U+FFFD.
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    }

    /// Lowercase extension with leading dot, or `"no extension"`.
    pub fn extension_label(&self) -> String {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!(".{}", ext.to_lowercase()),
            None => "no extension".to_string(),
        }
    }
}

/// Counters collected during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Regular files seen in non-excluded directories.
    pub scanned: usize,
    /// Files rejected by the extension filter.
    pub excluded: usize,
    /// Directories pruned by the directory filter.
    pub skipped_dirs: usize,
    /// Entries that could not be read.
    pub unreadable: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: BTreeMap<PathBuf, LocalFile>,
    pub stats: ScanStats,
}

/// Extension and directory filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    /// `None` means every extension is allowed.
    allowed: Option<Vec<String>>,
    excluded: Vec<String>,
    exclude_dirs: Vec<String>,
}

impl ScanFilter {
    pub fn new(allowed: &[String], excluded: &[String], exclude_dirs: &[String]) -> Self {
        let allowed = if allowed.is_empty() || allowed.iter().any(|e| e.trim() == WILDCARD) {
            None
        } else {
            Some(normalize_extensions(allowed))
        };
        Self {
            allowed,
            excluded: normalize_extensions(excluded),
            exclude_dirs: exclude_dirs
                .iter()
                .filter(|d| !d.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Whether a file name passes the extension filters.
    pub fn allows_file(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        if self.excluded.iter().any(|ext| lower.ends_with(ext.as_str())) {
            return false;
        }
        match &self.allowed {
            None => true,
            Some(allowed) => allowed.iter().any(|ext| lower.ends_with(ext.as_str())),
        }
    }

    /// Whether a directory, given relative to the scan root, is pruned.
    pub fn excludes_dir(&self, relative: &Path) -> bool {
        let relative = relative.to_string_lossy();
        self.exclude_dirs
            .iter()
            .any(|needle| relative.contains(needle.as_str()))
    }
}

impl From<&MonitorConfig> for ScanFilter {
    fn from(config: &MonitorConfig) -> Self {
        Self::new(
            &config.allowed_extensions,
            &config.excluded_extensions,
            &config.exclude_dirs,
        )
    }
}

fn normalize_extensions(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Walks a directory tree and collects the files that pass the filter.
#[derive(Debug, Clone)]
pub struct Scanner {
    filter: ScanFilter,
}

impl Scanner {
    pub fn new(filter: ScanFilter) -> Self {
        Self { filter }
    }

    /// Scan `root` recursively. Blocking; run it off the async executor.
    pub fn scan(&self, root: &Path, zone: &ReferenceZone) -> Result<ScanResult, ScanError> {
        let root = canonical_root(root)?;
        let mut result = ScanResult::default();

        debug!(root = %root.display(), filter = ?self.filter, "Scanning directory");

        let mut skipped_dirs = 0;
        let walker = WalkDir::new(&root).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if self.filter.excludes_dir(relative) {
                debug!(dir = %entry.path().display(), "Skipping excluded directory");
                skipped_dirs += 1;
                false
            } else {
                true
            }
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Cannot access entry");
                    result.stats.unreadable += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            result.stats.scanned += 1;
            let name = entry.file_name().to_string_lossy();
            if !self.filter.allows_file(&name) {
                debug!(file = %name, "Excluded by extension filter");
                result.stats.excluded += 1;
                continue;
            }

            match local_file(&entry, zone) {
                Ok(file) => {
                    result.files.insert(file.path.clone(), file);
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Cannot read file metadata");
                    result.stats.unreadable += 1;
                }
            }
        }
        result.stats.skipped_dirs = skipped_dirs;

        info!(
            root = %root.display(),
            scanned = result.stats.scanned,
            excluded = result.stats.excluded,
            included = result.files.len(),
            unreadable = result.stats.unreadable,
            "Scan complete"
        );

        Ok(result)
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    root.canonicalize().map_err(|e| ScanError::Io {
        path: root.to_path_buf(),
        source: e,
    })
}

fn local_file(entry: &DirEntry, zone: &ReferenceZone) -> Result<LocalFile, io::Error> {
    let metadata = entry.metadata().map_err(io::Error::from)?;
    let created = creation_time(&metadata)?;
    let naive = DateTime::<Local>::from(created).naive_local();
    let created_at = zone.localize(naive).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("timestamp {} has no reference-zone equivalent", naive),
        )
    })?;

    Ok(LocalFile {
        path: entry.path().to_path_buf(),
        created_at,
        size_bytes: metadata.len(),
        category: FileCategory::from_path(entry.path()),
    })
}

/// Creation time where the filesystem records it, modification time otherwise.
fn creation_time(metadata: &Metadata) -> io::Result<SystemTime> {
    metadata.created().or_else(|_| metadata.modified())
}
