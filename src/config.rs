//! Deployment configuration.
//!
//! Loaded from TOML; every value has a default so an absent file is valid.
//! Lookup order: explicit path, `$FLUXO_CONFIG`, then
//! `<config_home>/fluxo/config.toml`.
//!
//! ```toml
//! [storage]
//! data_dir = "/srv/fluxo"
//!
//! [report]
//! locale = "pt-BR"
//!
//! [sources.cadastro]
//! path = "/srv/fluxo/sources/Cadastro_de_Clientes_v1.xlsm"
//! header_row = 5
//!
//! [sources.cadastro.date_formats]
//! inicio_contrato = "DD/MM/YYYY"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dates::DateFormat;
use crate::db::SourceKind;
use crate::error::PipelineError;
use crate::utils::Locale;

pub const CONFIG_ENV: &str = "FLUXO_CONFIG";

/// Rows scanned by the header locator when nothing is configured
pub const DEFAULT_SCAN_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub report: ReportConfig,
    sources: BTreeMap<SourceKind, SourceConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    reports_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("reports"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("fluxo.db"))
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.data_dir.join("sources")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportConfig {
    pub locale: Locale,
}

/// How one spreadsheet source is located and read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub path: Option<PathBuf>,
    pub tab: String,
    /// 1-based row pinned by the deployment; bypasses the header locator
    pub header_row: Option<usize>,
    pub keywords: Vec<String>,
    pub scan_rows: usize,
    /// Candidate header rows with fewer filled cells are skipped
    pub min_columns: usize,
    pub date_formats: BTreeMap<String, DateFormat>,
}

impl SourceConfig {
    /// Defaults of the shared workbooks.
    pub fn for_kind(kind: SourceKind) -> Self {
        let (header_row, keywords, file_formats): (usize, &[&str], &[(&str, &str)]) = match kind {
            SourceKind::Cadastro => (
                5,
                &["cnpj", "nome fantasia", "razao social"],
                &[
                    ("inicio_contrato", "DD/MM/YYYY"),
                    ("termino_contrato", "DD/MM/YYYY"),
                    ("competencia_inicial_fixo", "MMM-YY"),
                    ("competencia_diversos_inicial", "MMM-YY"),
                ],
            ),
            SourceKind::Saida => (
                2,
                &["cnpj", "razao social", "motivo"],
                &[("data_saida", "DD/MM/YYYY"), ("ultima_competencia", "MMM-YY")],
            ),
            SourceKind::Produtos => (
                4,
                &["produto", "codigo"],
                &[("data_inicio", "DD/MM/YYYY"), ("data_termino", "DD/MM/YYYY")],
            ),
        };

        let date_formats = file_formats
            .iter()
            .filter_map(|(field, pattern)| {
                DateFormat::parse(pattern)
                    .ok()
                    .map(|f| (field.to_string(), f))
            })
            .collect();

        Self {
            path: None,
            tab: kind.default_tab().to_string(),
            header_row: Some(header_row),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            scan_rows: DEFAULT_SCAN_ROWS,
            min_columns: 1,
            date_formats,
        }
    }

    /// 0-based header row when pinned
    pub fn header_index(&self) -> Option<usize> {
        self.header_row.map(|r| r.saturating_sub(1))
    }

    pub fn date_format(&self, field: &str) -> Option<&DateFormat> {
        self.date_formats.get(field)
    }

    fn apply(&mut self, file: SourceFile) -> Result<(), PipelineError> {
        if let Some(path) = file.path {
            self.path = Some(path);
        }
        if let Some(tab) = file.tab {
            self.tab = tab;
        }
        match file.header_row {
            Some(0) => self.header_row = None,
            Some(row) => self.header_row = Some(row),
            None => {}
        }
        if let Some(keywords) = file.keywords {
            if keywords.is_empty() {
                return Err(PipelineError::Config("keywords must not be empty".to_string()));
            }
            self.keywords = keywords;
        }
        if let Some(scan_rows) = file.scan_rows {
            self.scan_rows = scan_rows;
        }
        if let Some(min_columns) = file.min_columns {
            self.min_columns = min_columns;
        }
        for (field, pattern) in file.date_formats {
            self.date_formats
                .insert(field, DateFormat::parse(&pattern)?);
        }
        Ok(())
    }
}

// On-disk shape: everything optional, merged over the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    storage: StorageFile,
    report: ReportFile,
    sources: BTreeMap<String, SourceFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StorageFile {
    data_dir: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReportFile {
    locale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SourceFile {
    path: Option<PathBuf>,
    tab: Option<String>,
    header_row: Option<usize>,
    keywords: Option<Vec<String>>,
    scan_rows: Option<usize>,
    min_columns: Option<usize>,
    date_formats: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl AppConfig {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            storage: StorageConfig {
                data_dir,
                reports_dir: None,
                db_path: None,
            },
            report: ReportConfig::default(),
            sources: SourceKind::ALL
                .iter()
                .map(|k| (*k, SourceConfig::for_kind(*k)))
                .collect(),
        }
    }

    /// Resolve and load the configuration file, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        if let Some(path) = candidate {
            return Self::from_file(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config = match file.storage.data_dir {
            Some(dir) => Self::with_data_dir(dir),
            None => Self::default(),
        };
        config.storage.reports_dir = file.storage.reports_dir;
        config.storage.db_path = file.storage.db_path;

        if let Some(locale) = file.report.locale {
            config.report.locale = locale.parse()?;
        }

        for (name, source_file) in file.sources {
            let kind: SourceKind = name
                .parse()
                .map_err(|_| PipelineError::Config(format!("unknown source '{}'", name)))?;
            if let Some(source) = config.sources.get_mut(&kind) {
                source.apply(source_file)?;
            }
        }

        Ok(config)
    }

    pub fn source(&self, kind: SourceKind) -> SourceConfig {
        self.sources
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| SourceConfig::for_kind(kind))
    }

    /// Where a source's workbook lives: configured path or the default
    /// file name under the data directory.
    pub fn source_path(&self, kind: SourceKind) -> PathBuf {
        self.source(kind).path.unwrap_or_else(|| {
            let file = match kind {
                SourceKind::Cadastro => "Cadastro_de_Clientes_v1.xlsm",
                SourceKind::Saida => "Saida_de_Clientes.xlsx",
                SourceKind::Produtos => "Produtos_por_Cliente.xlsx",
            };
            self.storage.sources_dir().join(file)
        })
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".fluxo"))
        .unwrap_or_else(|| PathBuf::from(".fluxo"))
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("fluxo").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pin_known_header_rows() {
        let config = AppConfig::with_data_dir(PathBuf::from("/data"));
        assert_eq!(config.source(SourceKind::Cadastro).header_index(), Some(4));
        assert_eq!(config.source(SourceKind::Produtos).header_index(), Some(3));
        assert_eq!(config.source(SourceKind::Saida).tab, "Base de Dados");
        assert_eq!(config.storage.reports_dir(), PathBuf::from("/data/reports"));
        assert_eq!(
            config.source_path(SourceKind::Cadastro),
            PathBuf::from("/data/sources/Cadastro_de_Clientes_v1.xlsm")
        );
    }

    #[test]
    fn test_toml_overrides_merge_over_defaults() -> Result<()> {
        let config = AppConfig::from_toml_str(
            r#"
            [storage]
            data_dir = "/srv/fluxo"
            reports_dir = "/srv/out"

            [report]
            locale = "en-US"

            [sources.cadastro]
            path = "/tmp/cadastro.xlsx"
            header_row = 0
            keywords = ["cnpj"]

            [sources.cadastro.date_formats]
            inicio_contrato = "YYYY-MM-DD"
            "#,
        )?;

        let cadastro = config.source(SourceKind::Cadastro);
        assert_eq!(cadastro.path, Some(PathBuf::from("/tmp/cadastro.xlsx")));
        assert_eq!(cadastro.header_row, None);
        assert_eq!(cadastro.tab, "Clientes");
        assert_eq!(cadastro.keywords, vec!["cnpj".to_string()]);
        assert_eq!(
            cadastro.date_format("inicio_contrato").map(|f| f.pattern()),
            Some("YYYY-MM-DD")
        );
        assert!(cadastro.date_format("termino_contrato").is_some());
        assert_eq!(config.report.locale, Locale::EnUs);
        assert_eq!(config.storage.reports_dir(), PathBuf::from("/srv/out"));
        assert_eq!(config.storage.db_path(), PathBuf::from("/srv/fluxo/fluxo.db"));
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for text in [
            "[sources.billing]\ntab = \"x\"",
            "[sources.saida.date_formats]\ndata_saida = \"DD\"",
            "[report]\nlocale = \"fr-FR\"",
            "[storage]\nunknown = 1",
        ] {
            let err = AppConfig::from_toml_str(text).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Config(_))),
                "expected config error for {text:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
