//! Fixed layouts of the intake ("entrada") and billing ("cobrança") reports.
//!
//! Each report has three metadata rows (title, group, generation date), a
//! row of column labels and then one block per company. A block may span
//! several rows; its fields sit in distinct columns and the CNPJ is
//! repeated on every row of the block, so the sheet can be read back row by
//! row and merged on CNPJ.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::SourceConfig;
use crate::dates::DateFormat;
use crate::error::PipelineError;
use crate::importers::FieldTable;
use crate::utils::normalize_text;

/// How a field value is rendered into its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Text,
    Cnpj,
    /// date cell displayed as `jan/25`
    MonthYear,
    /// numeric cell with the locale's currency format
    Currency,
    Number,
}

/// Where one field lands inside a company block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCell {
    pub field: &'static str,
    pub label: &'static str,
    pub row_offset: u32,
    pub column: u16,
    pub kind: ValueKind,
}

const fn cell(field: &'static str, label: &'static str, row_offset: u32, column: u16, kind: ValueKind) -> FieldCell {
    FieldCell {
        field,
        label,
        row_offset,
        column,
        kind,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    pub kind: ReportKind,
    pub title: &'static str,
    pub tab_name: &'static str,
    /// 0-based row of the column labels
    pub header_row: u32,
    pub first_block_row: u32,
    pub block_height: u32,
    /// Maximum number of company blocks
    pub capacity: usize,
    pub fields: &'static [FieldCell],
}

/// Pattern for month/year values found as text when reading a report back
pub const MONTH_YEAR_PATTERN: &str = "MMM/YY";

impl ReportTemplate {
    /// First sheet row of the block at `index`
    pub fn block_origin(&self, index: usize) -> u32 {
        self.first_block_row + index as u32 * self.block_height
    }

    pub fn cell_for(&self, field: &str) -> Option<&FieldCell> {
        self.fields.iter().find(|c| c.field == field)
    }

    /// Columns spanned by the block
    pub fn width(&self) -> u16 {
        self.fields.iter().map(|c| c.column + 1).max().unwrap_or(1)
    }

    /// Labels matched exactly, so the report can be read back.
    pub fn field_table(&self) -> FieldTable {
        let mut table = FieldTable::new();
        for cell in self.fields {
            let exact = format!("={}", normalize_text(cell.label));
            table.push(cell.field, [exact.as_str()]);
        }
        table
    }

    /// Source settings for reading a generated report back
    pub fn layout(&self) -> SourceConfig {
        let month_year = DateFormat::parse(MONTH_YEAR_PATTERN).ok();
        let date_formats: BTreeMap<String, DateFormat> = self
            .fields
            .iter()
            .filter(|c| c.kind == ValueKind::MonthYear)
            .filter_map(|c| month_year.clone().map(|f| (c.field.to_string(), f)))
            .collect();

        SourceConfig {
            path: None,
            tab: self.tab_name.to_string(),
            header_row: None,
            keywords: vec!["cnpj".to_string(), "grupo".to_string()],
            scan_rows: self.header_row as usize + 5,
            min_columns: 3,
            date_formats,
        }
    }
}

pub static ENTRADA: ReportTemplate = ReportTemplate {
    kind: ReportKind::Entrada,
    title: "Ficha de Entrada de Clientes",
    tab_name: "Ficha de Entrada",
    header_row: 4,
    first_block_row: 5,
    block_height: 1,
    capacity: 30,
    fields: &[
        cell("cnpj", "CNPJ", 0, 0, ValueKind::Cnpj),
        cell("codigo", "Código", 0, 1, ValueKind::Text),
        cell("nome_fantasia", "Nome Fantasia", 0, 2, ValueKind::Text),
        cell("razao_social", "Razão Social", 0, 3, ValueKind::Text),
        cell("grupo", "Grupo", 0, 4, ValueKind::Text),
        cell("inicio_contrato", "Vigência Inicial", 0, 5, ValueKind::MonthYear),
        cell("regime_tributario_atual", "Regime Tributário", 0, 6, ValueKind::Text),
        cell("plano_contratado", "Plano Contratado", 0, 7, ValueKind::Text),
        cell("sla", "SLA", 0, 8, ValueKind::Text),
        cell("contato_principal_nome", "Contato Principal", 0, 9, ValueKind::Text),
        cell("contato_principal_email", "E-mail do Contato", 0, 10, ValueKind::Text),
        cell("contato_principal_celular", "Celular do Contato", 0, 11, ValueKind::Text),
        cell("sistema_contabil", "Sistema Contábil", 0, 12, ValueKind::Text),
        cell("sistema_fiscal", "Sistema Fiscal", 0, 13, ValueKind::Text),
        cell("sistema_folha", "Sistema Folha", 0, 14, ValueKind::Text),
        cell("total_colaboradores", "Total de Colaboradores", 0, 15, ValueKind::Number),
        cell("closer", "Closer", 0, 16, ValueKind::Text),
        cell("observacao_closer", "Observação", 0, 17, ValueKind::Text),
    ],
};

pub static COBRANCA: ReportTemplate = ReportTemplate {
    kind: ReportKind::Cobranca,
    title: "Ficha de Cobrança",
    tab_name: "Ficha de Cobrança",
    header_row: 4,
    first_block_row: 5,
    block_height: 2,
    capacity: 15,
    fields: &[
        // recurring fees
        cell("cnpj", "CNPJ", 0, 0, ValueKind::Cnpj),
        cell("nome_fantasia", "Nome Fantasia", 0, 1, ValueKind::Text),
        cell("grupo", "Grupo", 0, 2, ValueKind::Text),
        cell("vl_bpo_contabil", "BPO Contábil (R$)", 0, 3, ValueKind::Currency),
        cell("vl_bpo_fiscal", "BPO Fiscal (R$)", 0, 4, ValueKind::Currency),
        cell("vl_bpo_folha", "BPO Folha (R$)", 0, 5, ValueKind::Currency),
        cell("vl_bpo_financeiro", "BPO Financeiro (R$)", 0, 6, ValueKind::Currency),
        cell("honorario_mensal_total", "Honorário Mensal Total", 0, 7, ValueKind::Currency),
        cell("competencia_inicial_fixo", "Competência Inicial", 0, 8, ValueKind::MonthYear),
        // one-off charges
        cell("vl_implantacao", "Implantação (R$)", 1, 9, ValueKind::Currency),
        cell("forma_pgto", "Forma de Pagamento", 1, 10, ValueKind::Text),
        cell("vencimento_implantacao", "Vencimento Implantação", 1, 11, ValueKind::Text),
        cell("diversos_inicial", "Diversos Inicial", 1, 12, ValueKind::Text),
        cell("vl_diversos_inicial", "Valor Diversos (R$)", 1, 13, ValueKind::Currency),
        cell("competencia_diversos_inicial", "Competência Diversos", 1, 14, ValueKind::MonthYear),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Entrada,
    Cobranca,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::Entrada, ReportKind::Cobranca];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Entrada => "entrada",
            ReportKind::Cobranca => "cobranca",
        }
    }

    /// Fragment used in file names
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Entrada => "Entrada",
            ReportKind::Cobranca => "Cobranca",
        }
    }

    pub fn template(&self) -> &'static ReportTemplate {
        match self {
            ReportKind::Entrada => &ENTRADA,
            ReportKind::Cobranca => &COBRANCA,
        }
    }

    /// Kind of a generated file, from the `_<Label>_` fragment of its name
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| name.contains(&format!("_{}_", k.label())))
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).as_str() {
            "entrada" | "ficha de entrada" => Ok(ReportKind::Entrada),
            "cobranca" | "ficha de cobranca" => Ok(ReportKind::Cobranca),
            other => Err(PipelineError::Config(format!(
                "unknown report kind '{}' (expected entrada or cobranca)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_templates_have_unique_cells_and_columns() {
        for kind in ReportKind::ALL {
            let t = kind.template();
            assert_eq!(t.kind, kind);
            let columns: HashSet<u16> = t.fields.iter().map(|c| c.column).collect();
            assert_eq!(columns.len(), t.fields.len(), "{kind}: shared column");
            let fields: HashSet<&str> = t.fields.iter().map(|c| c.field).collect();
            assert_eq!(fields.len(), t.fields.len(), "{kind}: duplicated field");
            assert!(t.fields.iter().all(|c| c.row_offset < t.block_height));
            assert!(t.first_block_row > t.header_row);
            assert_eq!(t.cell_for("cnpj").map(|c| c.row_offset), Some(0));
        }
    }

    #[test]
    fn test_block_origin() {
        assert_eq!(COBRANCA.block_origin(0), 5);
        assert_eq!(COBRANCA.block_origin(3), 11);
        assert_eq!(ENTRADA.block_origin(3), 8);
    }

    #[test]
    fn test_field_table_matches_labels_exactly() {
        let table = COBRANCA.field_table();
        assert_eq!(table.lookup("Implantação (R$)"), Some("vl_implantacao"));
        assert_eq!(table.lookup("Vencimento Implantação"), Some("vencimento_implantacao"));
        assert_eq!(table.lookup("Competência Diversos"), Some("competencia_diversos_inicial"));
        assert_eq!(table.lookup("Grupo:"), None);
    }

    #[test]
    fn test_layout_reads_month_year_fields() {
        let layout = ENTRADA.layout();
        assert_eq!(layout.tab, "Ficha de Entrada");
        assert_eq!(
            layout.date_format("inicio_contrato").map(|f| f.pattern()),
            Some(MONTH_YEAR_PATTERN)
        );
        assert!(layout.header_row.is_none());
    }

    #[test]
    fn test_kind_parsing_and_file_names() {
        assert_eq!("Cobrança".parse::<ReportKind>().unwrap(), ReportKind::Cobranca);
        assert!("billing".parse::<ReportKind>().is_err());
        assert_eq!(
            ReportKind::from_file_name("Grupo_Alfa_Entrada_2025-01-10T10-00-00-000Z.xlsx"),
            Some(ReportKind::Entrada)
        );
        assert_eq!(ReportKind::from_file_name("notes.xlsx"), None);
    }
}
