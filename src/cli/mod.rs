use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use fluxo::db::SourceKind;
use fluxo::reports::ReportKind;

pub mod formatters;

#[derive(Parser)]
#[command(name = "fluxo")]
#[command(
    version,
    about = "Client registry spreadsheet pipeline: import, sync and report generation"
)]
#[command(
    long_about = "Read the client registry, departures and products workbooks, keep a merged copy in SQLite and write the intake (entrada) and billing (cobranca) reports for an economic group."
)]
pub struct Cli {
    /// Configuration file (defaults to $FLUXO_CONFIG or <config dir>/fluxo/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract records from a workbook (auto-detects the source from its tabs)
    Import {
        /// Path to the Excel or CSV file
        file: PathBuf,

        /// Source the file belongs to
        #[arg(short, long, value_enum, default_value_t = SourceArg::Auto)]
        source: SourceArg,

        /// Read the file as a generated report of this layout
        #[arg(long, value_enum, conflicts_with = "source")]
        layout: Option<LayoutArg>,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Synchronize the configured source workbooks into the database
    Sync {
        /// Re-read sources even when unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// List stored economic groups
    Groups,

    /// Show the companies of a group
    Search {
        /// Group name, with or without the leading "Grupo"
        group: String,
    },

    /// Write reports for a group
    Generate {
        group: String,

        #[arg(short, long, value_enum, default_value_t = KindArg::All)]
        kind: KindArg,
    },

    /// Generated report files
    Reports {
        #[command(subcommand)]
        action: ReportsCommands,
    },

    /// Inspect a workbook: tabs, detected header row and mapped columns
    Inspect {
        /// Path to the Excel or CSV file
        file: PathBuf,

        /// Source whose column table is used (detected when omitted)
        #[arg(short, long, value_enum)]
        source: Option<SourceArg>,

        /// Show data rows below the header
        #[arg(long)]
        full: bool,
    },
}

#[derive(Subcommand)]
pub enum ReportsCommands {
    /// List generated reports, newest first
    List,
    /// Count and size of generated reports
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Auto,
    Cadastro,
    Saida,
    Produtos,
}

impl SourceArg {
    pub fn kind(self) -> Option<SourceKind> {
        match self {
            SourceArg::Auto => None,
            SourceArg::Cadastro => Some(SourceKind::Cadastro),
            SourceArg::Saida => Some(SourceKind::Saida),
            SourceArg::Produtos => Some(SourceKind::Produtos),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    Entrada,
    Cobranca,
}

impl LayoutArg {
    pub fn kind(self) -> ReportKind {
        match self {
            LayoutArg::Entrada => ReportKind::Entrada,
            LayoutArg::Cobranca => ReportKind::Cobranca,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Entrada,
    Cobranca,
    All,
}

impl KindArg {
    pub fn kinds(self) -> Vec<ReportKind> {
        match self {
            KindArg::Entrada => vec![ReportKind::Entrada],
            KindArg::Cobranca => vec![ReportKind::Cobranca],
            KindArg::All => ReportKind::ALL.to_vec(),
        }
    }
}
