// Reports module - fixed-layout entrada/cobranca workbooks

pub mod generated;
pub mod template;
pub mod writer;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::{AppConfig, SourceConfig};
use crate::db::{self, SourceKind};
use crate::error::PipelineError;

pub use generated::{list_reports, report_path, report_stats, ReportEntry, ReportStats};
pub use template::{FieldCell, ReportKind, ReportTemplate, ValueKind, COBRANCA, ENTRADA};
pub use writer::{write_report, WriteOptions};

/// A report written to disk
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub kind: ReportKind,
    pub group: String,
    pub file_name: String,
    pub path: PathBuf,
    pub companies: usize,
    pub rows_written: usize,
    pub generated_at: DateTime<Utc>,
}

/// Source settings for reading a generated report of `kind` back
pub fn layout(kind: ReportKind) -> SourceConfig {
    kind.template().layout()
}

/// Write the requested reports for one stored group.
pub fn generate_for_group(
    conn: &Connection,
    config: &AppConfig,
    group: &str,
    kinds: &[ReportKind],
) -> Result<Vec<GeneratedReport>> {
    let records = db::find_by_group(conn, group)?;
    if records.is_empty() {
        bail!("Group '{}' not found", group);
    }

    // every requested layout must fit before any file is written
    for kind in kinds {
        let capacity = kind.template().capacity;
        if records.len() > capacity {
            return Err(PipelineError::ReportOverflow {
                companies: records.len(),
                capacity,
            }
            .into());
        }
    }

    // display name as stored, not as typed
    let group_name = records
        .iter()
        .find_map(|r| r.grupo())
        .unwrap_or_else(|| group.to_string());

    let options = WriteOptions {
        output_dir: config.storage.reports_dir(),
        locale: config.report.locale,
        date_formats: config.source(SourceKind::Cadastro).date_formats,
        generated_at: None,
    };

    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        reports.push(write_report(kind.template(), &group_name, &records, &options)?);
    }

    info!("Generated {} reports for '{}'", reports.len(), group_name);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_db, save_records, CompanyRecord};
    use crate::sheet::CellValue;
    use tempfile::TempDir;

    #[test]
    fn test_generate_for_stored_group() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::with_data_dir(dir.path().to_path_buf());
        let conn = open_db(Some(config.storage.db_path())).unwrap();

        let record = CompanyRecord::new()
            .with("cnpj", CellValue::text("11222333000181"))
            .with("nome_fantasia", CellValue::text("Alfa"))
            .with("grupo", CellValue::text("Grupo Alfa"));
        save_records(&conn, SourceKind::Cadastro, &[record]).unwrap();

        let reports = generate_for_group(&conn, &config, "alfa", &ReportKind::ALL).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.path.exists() && r.group == "Grupo Alfa"));
        assert_eq!(reports[1].rows_written, 2);

        assert!(generate_for_group(&conn, &config, "Grupo Beta", &ReportKind::ALL).is_err());
    }

    #[test]
    fn test_overflow_in_one_layout_writes_no_report() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::with_data_dir(dir.path().to_path_buf());
        let conn = open_db(Some(config.storage.db_path())).unwrap();

        // fits entrada, overflows cobranca
        let records: Vec<CompanyRecord> = (0..=COBRANCA.capacity)
            .map(|i| {
                CompanyRecord::new()
                    .with("cnpj", CellValue::text(&format!("{:014}", 500 + i)))
                    .with("grupo", CellValue::text("Grupo Grande"))
            })
            .collect();
        save_records(&conn, SourceKind::Cadastro, &records).unwrap();

        let err = generate_for_group(&conn, &config, "Grande", &ReportKind::ALL).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ReportOverflow { .. })
        ));
        assert!(list_reports(&config.storage.reports_dir()).unwrap().is_empty());
    }
}
