//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of pipeline work from presentation.

use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use fluxo::dates::format_month_year;
use fluxo::db::{CompanyRecord, GroupSummary, SaveStats};
use fluxo::importers::{Extraction, ValidationResult};
use fluxo::reports::{GeneratedReport, ReportEntry, ReportStats};
use fluxo::sheet::CellValue;
use fluxo::sync::SyncSummary;
use fluxo::utils::{decimal_from_f64, format_cnpj, format_currency, parse_amount, Locale};

/// Rows shown in import previews
const PREVIEW_ROWS: usize = 10;

pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Summary line, mapped columns and a preview of the extracted records
pub fn format_extraction(title: &str, extraction: &Extraction) -> String {
    let mut output = format!(
        "\n{} Found {} records in '{}' ({}, header at row {})\n",
        "✓".green().bold(),
        extraction.record_count,
        extraction.sheet,
        title,
        extraction.header_row
    );
    if extraction.merged_rows > 0 {
        output.push_str(&format!(
            "  {} rows merged into earlier records\n",
            extraction.merged_rows
        ));
    }
    output.push_str(&format!(
        "  Columns: {}\n\n",
        extraction.header_map.fields().join(", ")
    ));

    #[derive(Tabled)]
    struct RecordPreview {
        #[tabled(rename = "CNPJ")]
        cnpj: String,
        #[tabled(rename = "Nome Fantasia")]
        nome: String,
        #[tabled(rename = "Grupo")]
        grupo: String,
        #[tabled(rename = "Fields")]
        fields: usize,
    }

    let preview: Vec<RecordPreview> = extraction
        .records
        .iter()
        .take(PREVIEW_ROWS)
        .map(|r| RecordPreview {
            cnpj: r.cnpj().map(|c| format_cnpj(&c)).unwrap_or_default(),
            nome: r.nome_fantasia().unwrap_or_default(),
            grupo: r.grupo().unwrap_or_default(),
            fields: r.len(),
        })
        .collect();

    if !preview.is_empty() {
        let mut table = Table::new(&preview);
        table.with(Style::rounded());
        table.modify(Columns::new(3..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');
        if extraction.record_count > PREVIEW_ROWS {
            output.push_str(&format!(
                "  ... and {} more\n",
                extraction.record_count - PREVIEW_ROWS
            ));
        }
    }

    output.push_str(&format_issues(&extraction.issues));
    output
}

pub fn format_issues(result: &ValidationResult) -> String {
    if !result.has_issues() {
        return String::new();
    }

    let summary = result
        .issue_summary()
        .iter()
        .map(|(kind, count)| format!("{} {}", count, kind))
        .join(", ");
    let mut output = format!("\n{} {} issues: {}\n", "⚠".yellow().bold(), result.len(), summary);

    #[derive(Tabled)]
    struct IssueRow {
        #[tabled(rename = "Row")]
        row: usize,
        #[tabled(rename = "Field")]
        field: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Reason")]
        reason: String,
    }

    let rows: Vec<IssueRow> = result
        .issues
        .iter()
        .map(|i| IssueRow {
            row: i.row,
            field: i.field.clone(),
            value: i.value.clone(),
            reason: i.reason.clone(),
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    output.push_str(&table.to_string());
    output.push('\n');
    output
}

pub fn format_save_stats(stats: &SaveStats) -> String {
    format!(
        "\n{} Saved {} records: {} new, {} updated, {} unchanged\n",
        "✓".green().bold(),
        stats.total(),
        stats.created,
        stats.updated,
        stats.unchanged
    )
}

pub fn format_sync_table(summaries: &[SyncSummary]) -> String {
    #[derive(Tabled)]
    struct SyncRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Records")]
        extracted: usize,
        #[tabled(rename = "New")]
        created: usize,
        #[tabled(rename = "Updated")]
        updated: usize,
        #[tabled(rename = "Unchanged")]
        unchanged: usize,
        #[tabled(rename = "Removed")]
        deactivated: usize,
        #[tabled(rename = "Issues")]
        issues: usize,
        #[tabled(rename = "Time")]
        duration: String,
    }

    let rows: Vec<SyncRow> = summaries
        .iter()
        .map(|s| SyncRow {
            source: s.source.to_string(),
            status: if s.skipped {
                "unchanged".bright_black().to_string()
            } else {
                "synced".green().to_string()
            },
            extracted: s.extracted,
            created: s.created,
            updated: s.updated,
            unchanged: s.unchanged,
            deactivated: s.deactivated,
            issues: s.issues,
            duration: format!("{} ms", s.duration.as_millis()),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(2..), Alignment::right());
    format!("\n{} Sync finished\n\n{}\n", "✓".green().bold(), table)
}

pub fn format_groups_table(groups: &[GroupSummary]) -> String {
    if groups.is_empty() {
        return format!(
            "{} No groups found\nSynchronize the registry first using: {} sync\n",
            "ℹ".blue().bold(),
            "fluxo".bold()
        );
    }

    #[derive(Tabled)]
    struct GroupRow {
        #[tabled(rename = "Grupo")]
        name: String,
        #[tabled(rename = "Empresas")]
        companies: usize,
    }

    let rows: Vec<GroupRow> = groups
        .iter()
        .map(|g| GroupRow {
            name: g.name.clone(),
            companies: g.companies,
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{} {} groups\n\n{}\n", "📊".cyan().bold(), groups.len(), table)
}

pub fn format_companies_table(group: &str, records: &[CompanyRecord], locale: Locale) -> String {
    if records.is_empty() {
        return format!("{} No companies found for group '{}'\n", "ℹ".blue().bold(), group);
    }

    #[derive(Tabled)]
    struct CompanyRow {
        #[tabled(rename = "CNPJ")]
        cnpj: String,
        #[tabled(rename = "Código")]
        codigo: String,
        #[tabled(rename = "Nome Fantasia")]
        nome: String,
        #[tabled(rename = "Regime")]
        regime: String,
        #[tabled(rename = "Plano")]
        plano: String,
        #[tabled(rename = "Início")]
        inicio: String,
        #[tabled(rename = "Honorário")]
        honorario: String,
    }

    let rows: Vec<CompanyRow> = records
        .iter()
        .map(|r| CompanyRow {
            cnpj: r.cnpj().map(|c| format_cnpj(&c)).unwrap_or_default(),
            codigo: r.text("codigo").unwrap_or_default(),
            nome: r.nome_fantasia().unwrap_or_default(),
            regime: r.text("regime_tributario_atual").unwrap_or_default(),
            plano: r.text("plano_contratado").unwrap_or_default(),
            inicio: month_year_cell(r.get("inicio_contrato")),
            honorario: money_cell(r.get("honorario_mensal_total"), locale),
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(6..), Alignment::right());
    format!(
        "\n{} {} companies in '{}'\n\n{}\n",
        "📊".cyan().bold(),
        records.len(),
        group,
        table
    )
}

pub fn format_generated(reports: &[GeneratedReport]) -> String {
    let mut output = String::new();
    for report in reports {
        output.push_str(&format!(
            "{} {} report: {} ({} companies)\n",
            "✓".green().bold(),
            report.kind,
            report.path.display(),
            report.companies
        ));
    }
    output
}

pub fn format_reports_table(entries: &[ReportEntry]) -> String {
    if entries.is_empty() {
        return format!("{} No reports generated yet\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct ReportRow {
        #[tabled(rename = "File")]
        file_name: String,
        #[tabled(rename = "Kind")]
        kind: String,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Modified")]
        modified: String,
    }

    let rows: Vec<ReportRow> = entries
        .iter()
        .map(|e| ReportRow {
            file_name: e.file_name.clone(),
            kind: e.kind.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string()),
            size: format_size(e.size),
            modified: e.modified.format("%d/%m/%Y %H:%M").to_string(),
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(2..3), Alignment::right());
    format!("\n{}\n", table)
}

pub fn format_report_stats(stats: &ReportStats) -> String {
    let mut output = format!("\n{} Reports\n", "📊".cyan().bold());
    output.push_str(&format!("{:<16} {}\n", "Total:".bold(), stats.count));
    for (kind, count) in &stats.by_kind {
        output.push_str(&format!("{:<16} {}\n", format!("  {}:", kind), count));
    }
    output.push_str(&format!(
        "{:<16} {}\n",
        "Size:".bold(),
        format_size(stats.total_bytes)
    ));
    let last = stats
        .last_generated
        .map(|t| t.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());
    output.push_str(&format!("{:<16} {}\n", "Last generated:".bold(), last));
    output
}

fn month_year_cell(value: Option<&CellValue>) -> String {
    match value {
        Some(CellValue::Date(date)) => format_month_year(*date),
        Some(CellValue::Text(text)) => text.clone(),
        _ => String::new(),
    }
}

/// Amount in the locale's notation; unreadable text is shown as stored
fn money_cell(value: Option<&CellValue>, locale: Locale) -> String {
    let amount = match value {
        Some(CellValue::Number(n)) => decimal_from_f64(*n),
        Some(CellValue::Text(text)) => match parse_amount(text, locale) {
            Some(amount) => Some(amount),
            None => return text.clone(),
        },
        _ => None,
    };
    amount.map(|a| format_currency(a, locale)).unwrap_or_default()
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_groups_message() {
        let msg = format_groups_table(&[]);
        assert!(msg.contains("No groups found"));
        assert!(msg.contains("sync"));
    }

    #[test]
    fn test_save_stats_line() {
        let msg = format_save_stats(&SaveStats {
            created: 2,
            updated: 1,
            unchanged: 0,
        });
        assert!(msg.contains("Saved 3 records"));
    }

    #[test]
    fn test_sync_table_shows_removed_records() {
        let summary = SyncSummary {
            source: fluxo::db::SourceKind::Cadastro,
            path: "cadastro.xlsx".into(),
            extracted: 4,
            skipped: false,
            created: 0,
            updated: 0,
            unchanged: 4,
            deactivated: 3,
            issues: 0,
            duration: std::time::Duration::from_millis(12),
        };
        let table = format_sync_table(&[summary]);
        assert!(table.contains("Removed"));
        assert!(table.contains("12 ms"));
    }

    #[test]
    fn test_companies_table_formats_fee_and_start_per_locale() {
        let record = CompanyRecord::new()
            .with("cnpj", CellValue::text("11222333000181"))
            .with("nome_fantasia", CellValue::text("Alfa"))
            .with(
                "inicio_contrato",
                CellValue::Date(chrono::NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()),
            )
            .with("honorario_mensal_total", CellValue::Number(1234.5));

        let br = format_companies_table("Grupo Alfa", &[record.clone()], Locale::PtBr);
        assert!(br.contains("11.222.333/0001-81"));
        assert!(br.contains("jan/25"));
        assert!(br.contains("R$ 1.234,50"));

        let us = format_companies_table("Grupo Alfa", &[record], Locale::EnUs);
        assert!(us.contains("R$ 1,234.50"));
    }

    #[test]
    fn test_money_cell_reads_text_amounts() {
        let text = CellValue::text("1.500,00");
        assert_eq!(money_cell(Some(&text), Locale::PtBr), "R$ 1.500,00");
        let note = CellValue::text("a combinar");
        assert_eq!(money_cell(Some(&note), Locale::PtBr), "a combinar");
        assert_eq!(money_cell(None, Locale::PtBr), "");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
