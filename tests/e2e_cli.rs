mod workbook_helpers;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use cli_helpers::{base_cmd, db_path, reports_dir, run_cmd, run_cmd_json, sources_dir, write_config};
use workbook_helpers::write_cadastro;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

#[test]
fn import_dry_run_does_not_create_db() {
    let home = setup_temp_home();
    let registry = write_cadastro(&sources_dir(&home).join("Cadastro.xlsx"));
    assert!(!db_path(&home).exists(), "db should start absent");

    base_cmd(&home)
        .arg("import")
        .arg(&registry)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 records"))
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    assert!(!db_path(&home).exists(), "dry-run should not create db");
}

#[test]
fn import_then_groups_and_search() {
    let home = setup_temp_home();
    let registry = write_cadastro(&sources_dir(&home).join("Cadastro.xlsx"));
    let registry = registry.to_str().unwrap();

    base_cmd(&home)
        .args(["import", registry])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 3 records"))
        .stdout(predicate::str::contains("2 issues"));

    base_cmd(&home)
        .arg("groups")
        .assert()
        .success()
        .stdout(predicate::str::contains("Grupo Alfa"))
        .stdout(predicate::str::contains("Grupo Gama"));

    base_cmd(&home)
        .args(["search", "alfa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("22.333.444/0001-90"))
        .stdout(predicate::str::contains("Beta"))
        .stdout(predicate::str::contains("Gama").not());
}

#[test]
fn import_json_reports_extraction() {
    let home = setup_temp_home();
    let registry = write_cadastro(&sources_dir(&home).join("Cadastro.xlsx"));

    let json = run_cmd_json(
        &home,
        &["import", registry.to_str().unwrap(), "--source", "cadastro", "--dry-run"],
    )
    .expect("import failed");

    assert_eq!(json["source"], "cadastro");
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["extraction"]["record_count"], 3);
    assert_eq!(json["extraction"]["header_row"], 5);
    assert_eq!(json["extraction"]["header_map"]["cnpj"], 1);
    assert!(json["saved"].is_null());
}

#[test]
fn sync_generate_and_list_reports() {
    let home = setup_temp_home();
    let registry = write_cadastro(&sources_dir(&home).join("Cadastro.xlsx"));
    let config = write_config(&home, &registry);
    let config = config.to_str().unwrap();

    let synced = run_cmd_json(&home, &["--config", config, "sync"]).expect("sync failed");
    assert_eq!(synced[0]["source"], "cadastro");
    assert_eq!(synced[0]["created"], 3);

    let again = run_cmd_json(&home, &["--config", config, "sync"]).expect("second sync failed");
    assert_eq!(again[0]["skipped"], true);

    let generated =
        run_cmd_json(&home, &["--config", config, "generate", "Grupo Alfa"]).expect("generate failed");
    let generated = generated.as_array().expect("array of reports");
    assert_eq!(generated.len(), 2);
    for report in generated {
        assert_eq!(report["companies"], 2);
        let path = report["path"].as_str().unwrap();
        assert!(std::path::Path::new(path).exists(), "missing {}", path);
        assert!(path.starts_with(reports_dir(&home).to_str().unwrap()));
    }

    let stats = run_cmd_json(&home, &["--config", config, "reports", "stats"]).expect("stats failed");
    assert_eq!(stats["count"], 2);
    assert_eq!(stats["by_kind"]["entrada"], 1);
    assert_eq!(stats["by_kind"]["cobranca"], 1);

    base_cmd(&home)
        .args(["--config", config, "reports", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grupo_Alfa_Entrada_"))
        .stdout(predicate::str::contains("Grupo_Alfa_Cobranca_"));
}

#[test]
fn generate_for_unknown_group_fails() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["generate", "Grupo Inexistente"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    assert!(!reports_dir(&home).exists());
}

#[test]
fn groups_on_empty_db_suggests_sync() {
    let home = setup_temp_home();
    let output = run_cmd(&home, &["groups"]).expect("groups failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No groups found"));
}

#[test]
fn inspect_shows_header_and_mapped_columns() {
    let home = setup_temp_home();
    let registry = write_cadastro(&sources_dir(&home).join("Cadastro.xlsx"));

    base_cmd(&home)
        .arg("inspect")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("Detected cadastro source"))
        .stdout(predicate::str::contains("Header row: 5"))
        .stdout(predicate::str::contains("nome_fantasia"));
}

#[test]
fn unsupported_file_is_rejected() {
    let home = setup_temp_home();
    let notes = home.path().join("notes.pdf");
    std::fs::write(&notes, b"%PDF").unwrap();

    base_cmd(&home)
        .arg("import")
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported source"));
}
