use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::sheet::CellValue;
use crate::utils::{cnpj_digits, normalize_text};

/// Spreadsheet sources the pipeline reads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Cadastro, // client registry ("Clientes")
    Saida,    // departures ("Base de Dados")
    Produtos, // contracted products per client
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Cadastro, SourceKind::Saida, SourceKind::Produtos];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Cadastro => "cadastro",
            SourceKind::Saida => "saida",
            SourceKind::Produtos => "produtos",
        }
    }

    /// Tab that holds the data in the shared workbooks
    pub fn default_tab(&self) -> &'static str {
        match self {
            SourceKind::Cadastro => "Clientes",
            SourceKind::Saida => "Base de Dados",
            SourceKind::Produtos => "Produtos por Cliente",
        }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        match self {
            SourceKind::Cadastro | SourceKind::Saida => KeyPolicy::BY_CNPJ,
            SourceKind::Produtos => KeyPolicy::BY_PRODUCT_LINE,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).as_str() {
            "cadastro" | "clientes" => Ok(SourceKind::Cadastro),
            "saida" | "saidas" => Ok(SourceKind::Saida),
            "produtos" | "produto" => Ok(SourceKind::Produtos),
            _ => Err(()),
        }
    }
}

/// One company (or product line) as a mapping from field name to value.
///
/// Empty values are never stored, so `get` returning `Some` always means
/// the spreadsheet had something in that cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyRecord {
    fields: BTreeMap<String, CellValue>,
}

impl CompanyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: CellValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: CellValue) {
        if value.is_empty() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(CellValue::as_text)
    }

    pub fn cnpj(&self) -> Option<String> {
        self.text("cnpj")
    }

    pub fn grupo(&self) -> Option<String> {
        self.text("grupo")
    }

    pub fn nome_fantasia(&self) -> Option<String> {
        self.text("nome_fantasia")
    }

    /// Copy every field of `other` this record does not have yet.
    /// The first non-empty value seen for a field wins.
    pub fn fill_from(&mut self, other: &CompanyRecord) {
        for (field, value) in &other.fields {
            self.fields
                .entry(field.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, CellValue)> for CompanyRecord {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        let mut record = CompanyRecord::new();
        for (field, value) in iter {
            record.set(&field, value);
        }
        record
    }
}

/// How rows of one source are identified and merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    /// Identifying field, compared after normalization
    pub primary: Option<&'static str>,
    /// Fields that together identify a row lacking the primary key
    pub fallback: &'static [&'static str],
    /// Field a merged record must carry to be kept
    pub required: &'static str,
}

impl KeyPolicy {
    pub const BY_CNPJ: KeyPolicy = KeyPolicy {
        primary: Some("cnpj"),
        fallback: &["grupo", "nome_fantasia"],
        required: "cnpj",
    };

    pub const BY_PRODUCT_LINE: KeyPolicy = KeyPolicy {
        primary: Some("codigo_produto_data"),
        fallback: &["codigo", "produto"],
        required: "codigo",
    };

    pub fn primary_key(&self, record: &CompanyRecord) -> Option<String> {
        let field = self.primary?;
        let raw = record.text(field)?;
        let key = if field == "cnpj" {
            cnpj_digits(&raw)
        } else {
            normalize_text(&raw)
        };
        (!key.is_empty()).then_some(key)
    }

    pub fn fallback_key(&self, record: &CompanyRecord) -> Option<String> {
        let parts: Option<Vec<String>> = self
            .fallback
            .iter()
            .map(|f| record.text(f).map(|v| normalize_text(&v)))
            .collect();
        let parts = parts?;
        if parts.is_empty() || parts.iter().any(String::is_empty) {
            return None;
        }
        Some(parts.join("|"))
    }

    /// Stable identity used by the store.
    pub fn key_for(&self, record: &CompanyRecord) -> Option<String> {
        self.primary_key(record)
            .map(|k| format!("{}:{}", self.primary.unwrap_or_default(), k))
            .or_else(|| self.fallback_key(record).map(|k| format!("~{}", k)))
    }
}

/// Counts from saving a batch of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SaveStats {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// A group and how many stored companies belong to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub companies: usize,
}

/// Canonical group name used for lookups: `"Grupo Alfa"` and `"alfa"`
/// compare equal.
pub fn group_key(name: &str) -> String {
    let norm = normalize_text(name);
    norm.strip_prefix("grupo ")
        .map(|rest| rest.trim().to_string())
        .unwrap_or(norm)
}
