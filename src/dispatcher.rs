//! Routes parsed clap commands to the pipeline and prints their results.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::cli::formatters;
use crate::cli::{Commands, ReportsCommands, SourceArg};
use fluxo::config::AppConfig;
use fluxo::db::{self, SaveStats, SourceKind};
use fluxo::importers::{self, DetectedFile, Extraction, ImportResult};
use fluxo::reports::{self, ReportKind};
use fluxo::sheet::{load_sheet, sheet_names};
use fluxo::sync;

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, config: &AppConfig, json_output: bool) -> Result<()> {
    match command {
        Commands::Import {
            file,
            source,
            layout,
            dry_run,
        } => {
            let layout = layout.map(|l| l.kind());
            dispatch_import(config, &file, source, layout, dry_run, json_output).await
        }
        Commands::Sync { force } => dispatch_sync(config, force, json_output).await,
        Commands::Groups => dispatch_groups(config, json_output).await,
        Commands::Search { group } => dispatch_search(config, &group, json_output).await,
        Commands::Generate { group, kind } => {
            dispatch_generate(config, &group, &kind.kinds(), json_output).await
        }
        Commands::Reports { action } => dispatch_reports(config, action, json_output).await,
        Commands::Inspect { file, source, full } => {
            dispatch_inspect(config, &file, source.and_then(SourceArg::kind), full).await
        }
    }
}

#[derive(Serialize)]
struct ImportJson<'a> {
    source: Option<SourceKind>,
    layout: Option<ReportKind>,
    extraction: &'a Extraction,
    saved: Option<SaveStats>,
    dry_run: bool,
}

async fn dispatch_import(
    config: &AppConfig,
    file: &Path,
    source: SourceArg,
    layout: Option<ReportKind>,
    dry_run: bool,
    json_output: bool,
) -> Result<()> {
    info!("Importing from: {:?}", file);

    let result = match (layout, source.kind()) {
        (Some(kind), _) => ImportResult::Report(kind, importers::import_report(file, kind)?),
        (None, Some(kind)) => ImportResult::Source(
            kind,
            importers::import_source(file, kind, &config.source(kind))?,
        ),
        (None, None) => importers::import_file_auto(file, config)
            .with_context(|| format!("Error reading import file {}", file.display()))?,
    };

    match result {
        ImportResult::Source(kind, extraction) => {
            if !json_output {
                print!("{}", formatters::format_extraction(&format!("{} source", kind), &extraction));
            }

            let saved = if dry_run {
                if !json_output {
                    println!("\n{} Dry run - no changes saved", "ℹ".blue().bold());
                }
                None
            } else {
                let conn = db::open_db(Some(config.storage.db_path()))?;
                let stats = db::save_records(&conn, kind, &extraction.records)?;
                if !json_output {
                    print!("{}", formatters::format_save_stats(&stats));
                }
                Some(stats)
            };

            if json_output {
                println!(
                    "{}",
                    formatters::to_json(&ImportJson {
                        source: Some(kind),
                        layout: None,
                        extraction: &extraction,
                        saved,
                        dry_run,
                    })
                );
            }
        }
        ImportResult::Report(kind, extraction) => {
            // generated reports are read back for review, never stored
            if json_output {
                println!(
                    "{}",
                    formatters::to_json(&ImportJson {
                        source: None,
                        layout: Some(kind),
                        extraction: &extraction,
                        saved: None,
                        dry_run: true,
                    })
                );
            } else {
                print!("{}", formatters::format_extraction(&format!("{} report", kind), &extraction));
            }
        }
    }

    Ok(())
}

async fn dispatch_sync(config: &AppConfig, force: bool, json_output: bool) -> Result<()> {
    let conn = db::open_db(Some(config.storage.db_path()))?;
    let summaries = sync::run_sync(&conn, config, force)?;

    if json_output {
        println!("{}", formatters::to_json(&summaries));
    } else {
        print!("{}", formatters::format_sync_table(&summaries));
    }
    Ok(())
}

async fn dispatch_groups(config: &AppConfig, json_output: bool) -> Result<()> {
    let conn = db::open_db(Some(config.storage.db_path()))?;
    let groups = db::list_groups(&conn)?;

    if json_output {
        println!("{}", formatters::to_json(&groups));
    } else {
        print!("{}", formatters::format_groups_table(&groups));
    }
    Ok(())
}

async fn dispatch_search(config: &AppConfig, group: &str, json_output: bool) -> Result<()> {
    let conn = db::open_db(Some(config.storage.db_path()))?;
    let records = db::find_by_group(&conn, group)?;

    if json_output {
        println!("{}", formatters::to_json(&records));
    } else {
        print!("{}", formatters::format_companies_table(group, &records, config.report.locale));
    }
    Ok(())
}

async fn dispatch_generate(
    config: &AppConfig,
    group: &str,
    kinds: &[ReportKind],
    json_output: bool,
) -> Result<()> {
    let conn = db::open_db(Some(config.storage.db_path()))?;
    let generated = reports::generate_for_group(&conn, config, group, kinds)?;

    if json_output {
        println!("{}", formatters::to_json(&generated));
    } else {
        print!("{}", formatters::format_generated(&generated));
    }
    Ok(())
}

async fn dispatch_reports(config: &AppConfig, action: ReportsCommands, json_output: bool) -> Result<()> {
    let dir = config.storage.reports_dir();
    match action {
        ReportsCommands::List => {
            let entries = reports::list_reports(&dir)?;
            if json_output {
                println!("{}", formatters::to_json(&entries));
            } else {
                print!("{}", formatters::format_reports_table(&entries));
            }
        }
        ReportsCommands::Stats => {
            let stats = reports::report_stats(&dir)?;
            if json_output {
                println!("{}", formatters::to_json(&stats));
            } else {
                print!("{}", formatters::format_report_stats(&stats));
            }
        }
    }
    Ok(())
}

async fn dispatch_inspect(
    config: &AppConfig,
    file: &Path,
    source: Option<SourceKind>,
    full: bool,
) -> Result<()> {
    println!(
        "{} Inspecting file: {}\n",
        "📊".cyan().bold(),
        file.display().to_string().green()
    );

    let names = sheet_names(file)?;
    println!("{} Found {} sheet(s):", "📄".cyan().bold(), names.len());
    for name in &names {
        println!("  • {}", name.yellow());
    }
    println!();

    let (source_config, table, tab) = match source {
        Some(kind) => {
            let cfg = config.source(kind);
            let tab = cfg.tab.clone();
            (cfg, importers::field_table(kind), tab)
        }
        None => match importers::detect_file(file) {
            Ok(DetectedFile::Source(kind)) => {
                println!("{} Detected {} source\n", "✓".green().bold(), kind);
                let cfg = config.source(kind);
                let tab = cfg.tab.clone();
                (cfg, importers::field_table(kind), tab)
            }
            Ok(DetectedFile::Report(kind)) => {
                println!("{} Detected generated {} report\n", "✓".green().bold(), kind);
                let template = kind.template();
                (template.layout(), template.field_table(), template.tab_name.to_string())
            }
            Err(err) => {
                println!("{} {}", "⚠".yellow().bold(), err);
                println!("{}", "Tip: pass --source to pick a column table".blue());
                return Ok(());
            }
        },
    };

    let sheet = load_sheet(file, &tab)?;
    println!(
        "{} Sheet: {} ({} rows, {} columns)",
        "📌".cyan().bold(),
        sheet.name.yellow().bold(),
        sheet.len(),
        sheet.width()
    );

    let header_row = importers::resolve_header(&sheet, &source_config, &table)?;
    let header = sheet.row(header_row).unwrap_or_default();
    let map = importers::map_columns(header, &table);
    println!("  Header row: {}", header_row + 1);
    println!("  Mapped columns: {} of {}\n", map.len(), header.len());
    for (field, col) in map.iter() {
        println!("    Col {:>3}: {} → {}", col + 1, header[col].as_text(), field.cyan());
    }

    let unmapped: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(col, cell)| !cell.is_empty() && !map.iter().any(|(_, c)| c == *col))
        .map(|(col, cell)| format!("{} ({})", cell.as_text(), col + 1))
        .collect();
    if !unmapped.is_empty() {
        println!("\n  Unmapped: {}", unmapped.join(", ").bright_black());
    }

    if full {
        println!();
        for idx in (header_row + 1)..sheet.len() {
            if sheet.is_blank_row(idx) {
                continue;
            }
            println!("  Row {}:", idx + 1);
            for (field, col) in map.iter() {
                let cell = sheet.cell(idx, col);
                if !cell.is_empty() {
                    println!("    {}: {}", field, cell);
                }
            }
        }
    } else {
        println!("\n{}", "Tip: Use --full to see all data".blue());
    }

    Ok(())
}
