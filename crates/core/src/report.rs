//! Summaries of a reconciliation run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::reconcile::{MatchedVia, ReconcileStatus, ReconciliationResult};
use crate::scanner::FileCategory;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary prefixes (`1 KB` = 1024 bytes).
pub fn format_size(bytes: u64) -> String {
    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }
    let value = (bytes as f64 / divisor as f64 * 100.0).round() / 100.0;
    format!("{} {}", value, SIZE_UNITS[unit])
}

/// One file line in a report group.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub matched_via: MatchedVia,
}

impl ReportLine {
    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Files sharing a status, category and extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportGroup {
    pub files: Vec<ReportLine>,
    pub bytes: u64,
}

impl ReportGroup {
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

type ExtensionGroups = BTreeMap<String, ReportGroup>;

/// Aggregated view of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub counts: BTreeMap<ReconcileStatus, usize>,
    pub groups: BTreeMap<ReconcileStatus, BTreeMap<FileCategory, ExtensionGroups>>,
    pub total_files: usize,
    pub total_bytes: u64,
    pub needs_sync: usize,
    pub needs_sync_bytes: u64,
    /// Files skipped because the tracking snapshot showed no change.
    pub unchanged: usize,
}

impl Report {
    pub fn summarize(results: &[ReconciliationResult]) -> Self {
        let mut report = Report::default();

        for result in results {
            let size = result.file.size_bytes;
            *report.counts.entry(result.status).or_default() += 1;
            report.total_files += 1;
            report.total_bytes += size;

            if result.matched_via == MatchedVia::Unchanged {
                report.unchanged += 1;
            }
            if result.status.needs_sync() {
                report.needs_sync += 1;
                report.needs_sync_bytes += size;
            }

            let group = report
                .groups
                .entry(result.status)
                .or_default()
                .entry(result.file.category)
                .or_default()
                .entry(result.file.extension_label())
                .or_default();
            group.bytes += size;
            group.files.push(ReportLine {
                path: result.file.path.clone(),
                size_bytes: size,
                matched_via: result.matched_via.clone(),
            });
        }

        for group in report
            .groups
            .values_mut()
            .flat_map(|c| c.values_mut())
            .flat_map(|e| e.values_mut())
        {
            group.files.sort_by(|a, b| a.path.cmp(&b.path));
        }

        report
    }

    pub fn count(&self, status: ReconcileStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn is_all_up_to_date(&self) -> bool {
        self.count(ReconcileStatus::UpToDate) == self.total_files
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reconciled {} files ({})",
            self.total_files,
            format_size(self.total_bytes)
        )?;
        for (status, count) in &self.counts {
            writeln!(f, "  {}: {}", status, count)?;
        }
        if self.unchanged > 0 {
            writeln!(f, "  (unchanged since last run: {})", self.unchanged)?;
        }

        if self.is_all_up_to_date() {
            return writeln!(f, "\nAll files are in the catalog and up to date.");
        }

        for (status, categories) in &self.groups {
            if *status == ReconcileStatus::UpToDate {
                continue;
            }
            let count = self.count(*status);
            writeln!(f, "\n=== {} ({} files) ===", status.reason().to_uppercase(), count)?;

            for (category, extensions) in categories {
                writeln!(f, "\n[{}]", category)?;
                for (extension, group) in extensions {
                    writeln!(
                        f,
                        "  {} ({} files, {})",
                        extension.to_uppercase(),
                        group.count(),
                        format_size(group.bytes)
                    )?;
                    for line in &group.files {
                        writeln!(
                            f,
                            "    {} ({}) via {}",
                            line.file_name(),
                            format_size(line.size_bytes),
                            line.matched_via
                        )?;
                    }
                }
            }
        }

        writeln!(
            f,
            "\nNeeds sync: {} files, {}",
            self.needs_sync,
            format_size(self.needs_sync_bytes)
        )
    }
}
