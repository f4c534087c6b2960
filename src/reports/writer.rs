//! Renders company records into the fixed report layouts.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Workbook, Worksheet};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::dates::{excel_serial_to_date, format_date_br, DateFormat};
use crate::db::CompanyRecord;
use crate::error::PipelineError;
use crate::sheet::CellValue;
use crate::utils::{file_slug, format_cnpj, parse_amount, Locale};

use super::template::{FieldCell, ReportTemplate, ValueKind};
use super::GeneratedReport;

const HEADER_COLOR: u32 = 0xF8BDA1;
const MIN_COLUMN_WIDTH: f64 = 12.0;

/// Where and how a report is written
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub output_dir: PathBuf,
    pub locale: Locale,
    /// Formats used to read month/year values stored as text
    pub date_formats: BTreeMap<String, DateFormat>,
    /// Fixed timestamp; `None` uses the current time
    pub generated_at: Option<DateTime<Utc>>,
}

impl WriteOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            locale: Locale::default(),
            date_formats: BTreeMap::new(),
            generated_at: None,
        }
    }
}

/// A value ready to be placed in a cell
#[derive(Debug, Clone, PartialEq)]
enum Rendered {
    Blank,
    Text(String),
    Number(f64),
    Currency(f64),
    /// Date cell shown as month/year
    MonthYear(NaiveDate),
}

/// Write one report for `group`.
///
/// Fails with [`PipelineError::ReportOverflow`] before anything is written
/// when the records do not fit the template.
pub fn write_report(
    template: &ReportTemplate,
    group: &str,
    records: &[CompanyRecord],
    options: &WriteOptions,
) -> Result<GeneratedReport> {
    if records.len() > template.capacity {
        return Err(PipelineError::ReportOverflow {
            companies: records.len(),
            capacity: template.capacity,
        }
        .into());
    }
    if records.is_empty() {
        bail!("No companies to write for group '{}'", group);
    }

    let generated_at = options.generated_at.unwrap_or_else(Utc::now);
    fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "Failed to create reports directory {}",
            options.output_dir.display()
        )
    })?;

    let file_name = unique_file_name(&options.output_dir, &report_file_name(template, group, generated_at));
    let path = options.output_dir.join(&file_name);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(template.tab_name)?;

    write_preamble(worksheet, template, group, generated_at)?;
    let rows_written = write_blocks(worksheet, template, records, options)?;

    // Save beside the target and rename, so a failed save leaves nothing
    let tmp_path = options.output_dir.join(format!(".{}.tmp", file_name));
    if let Err(err) = workbook.save(&tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("Failed to save report {}", path.display()));
    }
    move_into_place(&tmp_path, &path)?;

    info!(
        "Wrote {} report for '{}' with {} companies to {:?}",
        template.kind,
        group,
        records.len(),
        path
    );

    Ok(GeneratedReport {
        kind: template.kind,
        group: group.to_string(),
        file_name,
        path,
        companies: records.len(),
        rows_written,
        generated_at,
    })
}

/// Rename a saved temp file onto `path`; the temp file never outlives a failure.
fn move_into_place(tmp_path: &Path, path: &Path) -> Result<()> {
    if let Err(err) = fs::rename(tmp_path, path) {
        let _ = fs::remove_file(tmp_path);
        return Err(err).with_context(|| format!("Failed to move report into place at {}", path.display()));
    }
    Ok(())
}

/// `<group-slug>_<Entrada|Cobranca>_<timestamp>.xlsx`
pub fn report_file_name(template: &ReportTemplate, group: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.xlsx",
        file_slug(group),
        template.kind.label(),
        at.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

fn unique_file_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }
    let stem = name.trim_end_matches(".xlsx");
    (2..)
        .map(|n| format!("{}_{}.xlsx", stem, n))
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| name.to_string())
}

fn write_preamble(
    worksheet: &mut Worksheet,
    template: &ReportTemplate,
    group: &str,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    let title_format = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center);
    let label_format = Format::new().set_bold();
    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_background_color(Color::RGB(HEADER_COLOR));

    let last_col = template.width().saturating_sub(1);
    if last_col > 0 {
        worksheet.merge_range(0, 0, 0, last_col, template.title, &title_format)?;
    } else {
        worksheet.write_string_with_format(0, 0, template.title, &title_format)?;
    }

    worksheet.write_string_with_format(1, 0, "Grupo:", &label_format)?;
    worksheet.write_string(1, 1, group)?;
    worksheet.write_string_with_format(2, 0, "Gerado em:", &label_format)?;
    worksheet.write_string(2, 1, format_date_br(generated_at.date_naive()))?;

    for cell in template.fields {
        worksheet.write_string_with_format(template.header_row, cell.column, cell.label, &header_format)?;
        let width = (cell.label.chars().count() as f64 + 2.0).max(MIN_COLUMN_WIDTH);
        worksheet.set_column_width(cell.column, width)?;
    }
    worksheet.set_freeze_panes(template.first_block_row, 0)?;
    Ok(())
}

/// Returns the number of sheet rows used by the blocks.
fn write_blocks(
    worksheet: &mut Worksheet,
    template: &ReportTemplate,
    records: &[CompanyRecord],
    options: &WriteOptions,
) -> Result<usize> {
    let currency_format = Format::new().set_num_format(options.locale.currency_num_format());
    let month_year_format = Format::new().set_num_format(options.locale.month_year_num_format());
    let cnpj_cell = template.cell_for("cnpj");

    for (index, record) in records.iter().enumerate() {
        let origin = template.block_origin(index);

        for cell in template.fields {
            let value = record.get(cell.field).cloned().unwrap_or_default();
            let row = origin + cell.row_offset;
            match render(cell, &value, options) {
                Rendered::Blank => {}
                Rendered::Text(text) => {
                    worksheet.write_string(row, cell.column, text)?;
                }
                Rendered::Number(n) => {
                    worksheet.write_number(row, cell.column, n)?;
                }
                Rendered::Currency(n) => {
                    worksheet.write_number_with_format(row, cell.column, n, &currency_format)?;
                }
                Rendered::MonthYear(date) => {
                    worksheet.write_datetime_with_format(row, cell.column, &excel_date(date)?, &month_year_format)?;
                }
            }
        }

        // every row of a block carries the CNPJ so rows can be merged back
        if let Some(cnpj) = cnpj_cell {
            if let Rendered::Text(text) = render(cnpj, &record.get("cnpj").cloned().unwrap_or_default(), options) {
                for offset in (0..template.block_height).filter(|o| *o != cnpj.row_offset) {
                    worksheet.write_string(origin + offset, cnpj.column, &text)?;
                }
            }
        }
        debug!("Block {} written at row {}", index + 1, origin + 1);
    }

    Ok(records.len() * template.block_height as usize)
}

fn render(cell: &FieldCell, value: &CellValue, options: &WriteOptions) -> Rendered {
    if value.is_empty() {
        return Rendered::Blank;
    }

    match cell.kind {
        ValueKind::Text => match value {
            CellValue::Number(n) => Rendered::Number(*n),
            other => Rendered::Text(other.as_text()),
        },
        ValueKind::Cnpj => Rendered::Text(format_cnpj(&value.as_text())),
        ValueKind::MonthYear => render_month_year(cell.field, value, options),
        ValueKind::Currency => match value {
            CellValue::Number(n) => Rendered::Currency(*n),
            other => amount(&other.as_text(), options.locale)
                .map(Rendered::Currency)
                .unwrap_or_else(|| Rendered::Text(other.as_text())),
        },
        ValueKind::Number => match value {
            CellValue::Number(n) => Rendered::Number(*n),
            other => amount(&other.as_text(), options.locale)
                .map(Rendered::Number)
                .unwrap_or_else(|| Rendered::Text(other.as_text())),
        },
    }
}

fn render_month_year(field: &str, value: &CellValue, options: &WriteOptions) -> Rendered {
    let parsed = match (value, options.date_formats.get(field)) {
        (CellValue::Date(d), _) => Ok(*d),
        (_, Some(format)) => format
            .parse_cell(field, value)
            .and_then(|cell| cell.as_date().ok_or_else(|| mismatch(field, value, format.pattern()))),
        (CellValue::Number(n), None) => {
            excel_serial_to_date(*n).ok_or_else(|| mismatch(field, value, "excel serial"))
        }
        (_, None) => Err(mismatch(field, value, "date")),
    };

    match parsed {
        Ok(date) => Rendered::MonthYear(date),
        Err(err) => {
            warn!("{}; writing the raw value", err);
            Rendered::Text(value.as_text())
        }
    }
}

fn mismatch(field: &str, value: &CellValue, format: &str) -> PipelineError {
    PipelineError::DateFormatMismatch {
        field: field.to_string(),
        raw: value.as_text(),
        format: format.to_string(),
    }
}

// The full date is stored; only the display is month/year.
fn excel_date(date: NaiveDate) -> Result<ExcelDateTime> {
    let year = u16::try_from(date.year()).context("Year out of range for Excel")?;
    Ok(ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)?)
}

fn amount(raw: &str, locale: Locale) -> Option<f64> {
    parse_amount(raw, locale).and_then(|d| d.to_f64())
}
