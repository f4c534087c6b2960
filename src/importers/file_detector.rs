use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::db::SourceKind;
use crate::error::PipelineError;
use crate::reports::template::ReportKind;
use crate::sheet::{sheet_names, FileFormat};
use crate::utils::normalize_text;

/// What an input workbook turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFile {
    Source(SourceKind),
    Report(ReportKind),
}

/// Detect the kind of workbook from its tab names.
///
/// Detection strategy:
/// - CSV/TXT files → cannot be detected, the caller must name the source
/// - Workbooks → check tab names:
///   - "Produtos por Cliente" → Produtos (checked first: it also says "cliente")
///   - "Clientes" → Cadastro
///   - "Base de Dados" / "Saída" → Saida
///   - report tabs written by this tool → the matching report layout
pub fn detect_file(path: &Path) -> Result<DetectedFile> {
    if FileFormat::from_path(path)? == FileFormat::Delimited {
        return Err(PipelineError::UnsupportedSource(format!(
            "{}: cannot detect the source of a delimited file, pass --source",
            path.display()
        ))
        .into());
    }

    let names = sheet_names(path)?;
    info!("Examining workbook tabs: {:?}", names);
    let normalized: Vec<String> = names.iter().map(|n| normalize_text(n)).collect();

    if let Some(kind) = ReportKind::ALL
        .into_iter()
        .find(|k| normalized.contains(&normalize_text(k.template().tab_name)))
    {
        info!("Detected generated {} report", kind);
        return Ok(DetectedFile::Report(kind));
    }

    let has = |pattern: &str| normalized.iter().any(|n| n.contains(pattern));
    let detected = if has("produtos") {
        SourceKind::Produtos
    } else if has("clientes") {
        SourceKind::Cadastro
    } else if has("base de dados") || has("saida") {
        SourceKind::Saida
    } else {
        return Err(PipelineError::UnsupportedSource(format!(
            "{}: no known tab among [{}]",
            path.display(),
            names.join(", ")
        ))
        .into());
    };

    info!("Detected {} source", detected);
    Ok(DetectedFile::Source(detected))
}

/// Source kind of a workbook; report workbooks are rejected.
pub fn detect_source(path: &Path) -> Result<SourceKind> {
    match detect_file(path)? {
        DetectedFile::Source(kind) => Ok(kind),
        DetectedFile::Report(kind) => Err(PipelineError::UnsupportedSource(format!(
            "{} is a generated {} report, import it with --layout {}",
            path.display(),
            kind,
            kind.as_str()
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn workbook_with_tabs(dir: &TempDir, name: &str, tabs: &[&str]) -> std::path::PathBuf {
        let mut workbook = Workbook::new();
        for tab in tabs {
            let sheet = workbook.add_worksheet();
            sheet.set_name(*tab).unwrap();
            sheet.write_string(0, 0, "x").unwrap();
        }
        let path = dir.path().join(name);
        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_detects_sources_by_tab_name() {
        let dir = TempDir::new().unwrap();
        let cadastro = workbook_with_tabs(&dir, "c.xlsx", &["Capa", "Clientes"]);
        let produtos = workbook_with_tabs(&dir, "p.xlsx", &["Produtos por Cliente"]);
        let saida = workbook_with_tabs(&dir, "s.xlsx", &["Base de Dados"]);

        assert_eq!(detect_source(&cadastro).unwrap(), SourceKind::Cadastro);
        assert_eq!(detect_source(&produtos).unwrap(), SourceKind::Produtos);
        assert_eq!(detect_source(&saida).unwrap(), SourceKind::Saida);
    }

    #[test]
    fn test_unknown_workbook_and_csv_are_unsupported() {
        let dir = TempDir::new().unwrap();
        let other = workbook_with_tabs(&dir, "o.xlsx", &["Planilha1"]);
        let err = detect_source(&other).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedSource(_))
        ));

        let csv = dir.path().join("dump.csv");
        std::fs::write(&csv, "a;b\n").unwrap();
        assert!(detect_source(&csv).is_err());
    }

    #[test]
    fn test_detects_generated_reports() {
        let dir = TempDir::new().unwrap();
        let tab = ReportKind::Cobranca.template().tab_name;
        let report = workbook_with_tabs(&dir, "r.xlsx", &[tab]);
        assert_eq!(
            detect_file(&report).unwrap(),
            DetectedFile::Report(ReportKind::Cobranca)
        );
        assert!(detect_source(&report).is_err());
    }
}
