//! In-memory view of a spreadsheet tab.
//!
//! Every source format (xlsx/xlsm/xls/ods through calamine, delimited text
//! through csv) is loaded into a [`RawSheet`]: a rectangular-ish grid of
//! [`CellValue`]s whose row and column indices match the positions a user
//! sees in the spreadsheet, including leading blank rows and columns.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::dates::{excel_serial_to_date, format_date_br};
use crate::error::PipelineError;

/// A single cell after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// Trimmed text cell; blank input becomes `Empty`.
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn from_data(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::text(s),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(if *b { "Sim" } else { "Não" }.to_string()),
            Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => s
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::text(s)),
            Data::DurationIso(s) => CellValue::text(s),
            Data::Error(_) => CellValue::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text rendering used for header matching and display.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(d) => format_date_br(*d),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Whole numbers print without a fractional part so codes like `1001`
/// read the same whether the cell was typed as text or number.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One tab of a workbook, addressed by 0-based row and column.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_blank_row(&self, index: usize) -> bool {
        self.row(index)
            .map(|r| r.iter().all(CellValue::is_empty))
            .unwrap_or(true)
    }
}

/// Source formats understood by [`load_sheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Workbook,
    Delimited,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileFormat::Workbook),
            "csv" | "txt" => Ok(FileFormat::Delimited),
            _ => Err(PipelineError::UnsupportedSource(format!(
                "{} (expected .xlsx, .xlsm, .xls, .ods or .csv)",
                path.display()
            ))
            .into()),
        }
    }
}

/// Tab names of a workbook. Delimited files expose a single unnamed tab.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    match FileFormat::from_path(path)? {
        FileFormat::Workbook => {
            let workbook = open_workbook_auto(path)
                .with_context(|| format!("Failed to open workbook {}", path.display()))?;
            Ok(workbook.sheet_names())
        }
        FileFormat::Delimited => Ok(vec![csv_tab_name(path)]),
    }
}

fn csv_tab_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string()
}

/// Load one tab. `tab` is ignored for delimited files.
pub fn load_sheet(path: &Path, tab: &str) -> Result<RawSheet> {
    info!("Loading sheet '{}' from {:?}", tab, path);
    match FileFormat::from_path(path)? {
        FileFormat::Workbook => load_workbook_tab(path, tab),
        FileFormat::Delimited => load_delimited(path),
    }
}

fn load_workbook_tab(path: &Path, tab: &str) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let available = workbook.sheet_names();
    let wanted = crate::utils::normalize_text(tab);
    let name = available
        .iter()
        .find(|n| crate::utils::normalize_text(n) == wanted)
        .cloned()
        .ok_or_else(|| PipelineError::SheetNotFound {
            sheet: tab.to_string(),
            available: available.clone(),
        })?;

    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("Failed to read worksheet '{}'", name))?;

    // calamine trims leading empty rows/columns; pad them back so indices
    // match what the user sees.
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
    for data_row in range.rows() {
        let mut row = vec![CellValue::Empty; start_col];
        row.extend(data_row.iter().map(CellValue::from_data));
        while row.last().is_some_and(CellValue::is_empty) {
            row.pop();
        }
        rows.push(row);
    }

    debug!("Sheet '{}' loaded with {} rows", name, rows.len());
    Ok(RawSheet::new(name, rows))
}

fn load_delimited(path: &Path) -> Result<RawSheet> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = decode_text(&bytes);

    let first_line = text.lines().next().unwrap_or_default();
    let delimiter = if first_line.contains(';') || !first_line.contains(',') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| anyhow!("Malformed line {}: {}", idx + 1, e))?;
        let mut row: Vec<CellValue> = record.iter().map(CellValue::text).collect();
        while row.last().is_some_and(CellValue::is_empty) {
            row.pop();
        }
        rows.push(row);
    }

    Ok(RawSheet::new(csv_tab_name(path), rows))
}

/// UTF-8 when valid (BOM stripped), Windows-1252 otherwise.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cell_value_text_trims_and_empties() {
        assert_eq!(CellValue::text("  Alfa "), CellValue::Text("Alfa".to_string()));
        assert_eq!(CellValue::text("   "), CellValue::Empty);
    }

    #[test]
    fn test_as_text_renders_whole_numbers_without_fraction() {
        assert_eq!(CellValue::Number(1001.0).as_text(), "1001");
        assert_eq!(CellValue::Number(2.5).as_text(), "2.5");
        let d = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(CellValue::Date(d).as_text(), "10/01/2025");
    }

    #[test]
    fn test_from_data_converts_excel_dates() {
        let cell = Data::Float(45667.0);
        assert_eq!(CellValue::from_data(&cell), CellValue::Number(45667.0));
        let iso = Data::DateTimeIso("2025-01-10T00:00:00".to_string());
        assert_eq!(
            CellValue::from_data(&iso),
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
        );
    }

    #[test]
    fn test_cell_value_serializes_tagged() {
        let json = serde_json::to_string(&CellValue::Text("x".to_string())).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"x"}"#);
        let back: CellValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CellValue::Text("x".to_string()));
    }

    #[test]
    fn test_file_format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("a/Cadastro.XLSM")).unwrap(),
            FileFormat::Workbook
        );
        assert_eq!(
            FileFormat::from_path(Path::new("dump.csv")).unwrap(),
            FileFormat::Delimited
        );
        let err = FileFormat::from_path(Path::new("notes.pdf")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_load_delimited_semicolon_latin1() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        // "Razão" in Windows-1252
        file.write_all(b"CNPJ;Raz\xe3o Social\n12345678000190;Alfa LTDA\n;\n")
            .unwrap();

        let sheet = load_sheet(file.path(), "ignored").unwrap();
        assert_eq!(sheet.rows[0][1], CellValue::Text("Razão Social".to_string()));
        assert_eq!(sheet.rows[1][0], CellValue::Text("12345678000190".to_string()));
        assert!(sheet.is_blank_row(2));
        assert!(sheet.is_blank_row(99));
    }

    #[test]
    fn test_cell_out_of_bounds_is_empty() {
        let sheet = RawSheet::new("t", vec![vec![CellValue::text("a")]]);
        assert_eq!(sheet.cell(0, 0), &CellValue::Text("a".to_string()));
        assert!(sheet.cell(5, 5).is_empty());
    }
}
