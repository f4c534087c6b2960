// Import module - header location, column mapping and record extraction

pub mod column_mapper;
pub mod field_tables;
mod file_detector;
pub mod header_locator;
pub mod record_extractor;
pub mod validation;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{AppConfig, SourceConfig};
use crate::db::KeyPolicy;
use crate::reports::template::ReportKind;
use crate::sheet::{load_sheet, RawSheet};

pub use crate::db::SourceKind;
pub use column_mapper::{map_columns, FieldTable, HeaderMap};
pub use field_tables::field_table;
pub use file_detector::{detect_file, detect_source, DetectedFile};
pub use header_locator::{locate_header, locate_header_validated};
pub use record_extractor::{extract_records, extract_rows, merge_records, ExtractOptions, MergeOutcome};
pub use validation::{IssueKind, ValidationIssue, ValidationResult};

/// Everything learned from one sheet
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub sheet: String,
    /// 1-based row holding the labels
    pub header_row: usize,
    pub header_map: HeaderMap,
    #[serde(skip)]
    pub records: Vec<crate::db::CompanyRecord>,
    pub record_count: usize,
    pub merged_rows: usize,
    pub issues: ValidationResult,
}

/// Result of importing a file with auto-detection
#[derive(Debug)]
pub enum ImportResult {
    Source(SourceKind, Extraction),
    Report(ReportKind, Extraction),
}

/// Row holding the column labels: the pinned row when it maps at least one
/// field, otherwise the locator's answer.
pub fn resolve_header(sheet: &RawSheet, source: &SourceConfig, table: &FieldTable) -> Result<usize> {
    if let Some(pinned) = source.header_index() {
        let mapped = sheet
            .row(pinned)
            .map(|row| map_columns(row, table).len())
            .unwrap_or(0);
        if mapped > 0 {
            return Ok(pinned);
        }
        warn!(
            "Pinned header row {} of '{}' has no known labels, scanning instead",
            pinned + 1,
            sheet.name
        );
    }

    let idx = locate_header_validated(sheet, &source.keywords, source.scan_rows, source.min_columns)?;
    Ok(idx)
}

/// Locate, map and extract the records of an already loaded sheet.
pub fn extract_sheet(
    sheet: &RawSheet,
    source: &SourceConfig,
    table: &FieldTable,
    policy: KeyPolicy,
) -> Result<Extraction> {
    let header_row = resolve_header(sheet, source, table)?;
    let header_map = sheet
        .row(header_row)
        .map(|row| map_columns(row, table))
        .unwrap_or_default();

    if header_map.is_empty() {
        warn!("No known columns in header row {} of '{}'", header_row + 1, sheet.name);
    }

    let outcome = extract_records(
        sheet,
        header_row,
        &header_map,
        ExtractOptions {
            date_formats: &source.date_formats,
            policy,
        },
    );

    Ok(Extraction {
        sheet: sheet.name.clone(),
        header_row: header_row + 1,
        header_map,
        record_count: outcome.records.len(),
        records: outcome.records,
        merged_rows: outcome.merged_rows,
        issues: ValidationResult {
            issues: outcome.issues,
        },
    })
}

/// Read one of the shared source workbooks.
pub fn import_source(path: &Path, kind: SourceKind, source: &SourceConfig) -> Result<Extraction> {
    info!("Importing {} source from {:?}", kind, path);
    let sheet = load_sheet(path, &source.tab)
        .with_context(|| format!("Failed to load {} source {}", kind, path.display()))?;
    extract_sheet(&sheet, source, &field_table(kind), kind.key_policy())
        .with_context(|| format!("Failed to extract {} records from {}", kind, path.display()))
}

/// Read back a report this tool generated.
pub fn import_report(path: &Path, kind: ReportKind) -> Result<Extraction> {
    info!("Importing {} report from {:?}", kind, path);
    let layout = crate::reports::layout(kind);
    let sheet = load_sheet(path, &layout.tab)
        .with_context(|| format!("Failed to load {} report {}", kind, path.display()))?;
    extract_sheet(&sheet, &layout, &kind.template().field_table(), KeyPolicy::BY_CNPJ)
}

/// Import a workbook, detecting what it is from its tab names
pub fn import_file_auto(path: &Path, config: &AppConfig) -> Result<ImportResult> {
    match detect_file(path)? {
        DetectedFile::Source(kind) => {
            let extraction = import_source(path, kind, &config.source(kind))?;
            Ok(ImportResult::Source(kind, extraction))
        }
        DetectedFile::Report(kind) => {
            let extraction = import_report(path, kind)?;
            Ok(ImportResult::Report(kind, extraction))
        }
    }
}
