//! Maps header labels to canonical field names.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::sheet::CellValue;
use crate::utils::normalize_text;

/// One field and the header spellings that identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: String,
    /// Normalized substrings searched in header text; `=label` matches the
    /// whole header only
    pub variants: Vec<String>,
}

impl FieldSpec {
    fn matches(&self, header: &str) -> bool {
        self.variants.iter().any(|v| match v.strip_prefix('=') {
            Some(exact) => header == exact,
            None => header.contains(v.as_str()),
        })
    }
}

/// Prioritized list of field specs; earlier entries win when a header
/// matches several fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTable {
    entries: Vec<FieldSpec>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_static(table: &[(&str, &[&str])]) -> Self {
        let mut t = Self::new();
        for (field, variants) in table {
            t.push(field, variants.iter().copied());
        }
        t
    }

    pub fn push<'a>(&mut self, field: &str, variants: impl IntoIterator<Item = &'a str>) {
        let variants = variants
            .into_iter()
            .map(normalize_text)
            .filter(|v| !v.is_empty())
            .collect();
        self.entries.push(FieldSpec {
            field: field.to_string(),
            variants,
        });
    }

    pub fn entries(&self) -> &[FieldSpec] {
        &self.entries
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.field.as_str())
    }

    /// Field a single header label belongs to
    pub fn lookup(&self, header: &str) -> Option<&str> {
        let norm = normalize_text(header);
        if norm.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.matches(&norm))
            .map(|e| e.field.as_str())
    }
}

/// Field name to 0-based column index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderMap {
    columns: BTreeMap<String, usize>,
}

impl HeaderMap {
    pub fn get(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Pairs ordered by column
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        let mut pairs: Vec<(&str, usize)> =
            self.columns.iter().map(|(f, c)| (f.as_str(), *c)).collect();
        pairs.sort_by_key(|(_, c)| *c);
        pairs.into_iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

impl<const N: usize> From<[(&str, usize); N]> for HeaderMap {
    fn from(pairs: [(&str, usize); N]) -> Self {
        Self {
            columns: pairs.iter().map(|(f, c)| (f.to_string(), *c)).collect(),
        }
    }
}

/// Assign each header column to at most one field.
///
/// A column goes to the first field in table order with a matching variant;
/// if that field already has a column the left-most one is kept.
pub fn map_columns(header_row: &[CellValue], table: &FieldTable) -> HeaderMap {
    let mut columns = BTreeMap::new();

    for (idx, cell) in header_row.iter().enumerate() {
        let label = cell.as_text();
        let Some(field) = table.lookup(&label) else {
            continue;
        };
        if columns.contains_key(field) {
            debug!("Column {} ('{}') duplicates field '{}', ignored", idx, label, field);
            continue;
        }
        debug!("Column {} ('{}') -> {}", idx, label, field);
        columns.insert(field.to_string(), idx);
    }

    HeaderMap { columns }
}
