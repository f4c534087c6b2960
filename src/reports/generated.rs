//! Files already present in the reports directory.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::template::ReportKind;

/// A report file on disk
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub kind: Option<ReportKind>,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportStats {
    pub count: usize,
    pub total_bytes: u64,
    pub last_generated: Option<DateTime<Utc>>,
    pub by_kind: BTreeMap<String, usize>,
}

/// Generated reports, newest first. A missing directory lists nothing.
pub fn list_reports(dir: &Path) -> Result<Vec<ReportEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !is_report_name(&file_name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified: DateTime<Utc> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
        entries.push(ReportEntry {
            kind: ReportKind::from_file_name(&file_name),
            path: entry.path(),
            file_name,
            size: meta.len(),
            modified,
        });
    }

    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
    Ok(entries)
}

/// Path of a report by file name, refusing anything that is not a plain
/// `.xlsx` name inside `dir`.
pub fn report_path(dir: &Path, name: &str) -> Result<PathBuf> {
    if !is_report_name(name) {
        bail!("Invalid report name '{}'", name);
    }
    let path = dir.join(name);
    if !path.is_file() {
        bail!("Report '{}' not found in {}", name, dir.display());
    }
    Ok(path)
}

pub fn report_stats(dir: &Path) -> Result<ReportStats> {
    let entries = list_reports(dir)?;
    let mut stats = ReportStats {
        count: entries.len(),
        total_bytes: entries.iter().map(|e| e.size).sum(),
        last_generated: entries.iter().map(|e| e.modified).max(),
        by_kind: BTreeMap::new(),
    };
    for entry in &entries {
        let kind = entry.kind.map(|k| k.as_str()).unwrap_or("other");
        *stats.by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }
    Ok(stats)
}

fn is_report_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && name.to_ascii_lowercase().ends_with(".xlsx")
}
