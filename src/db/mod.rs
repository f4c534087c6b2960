// Database module - SQLite store for synchronized records

pub mod models;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

pub use models::{group_key, CompanyRecord, GroupSummary, KeyPolicy, SaveStats, SourceKind};

/// Get the default database path (~/.fluxo/fluxo.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".fluxo").join("fluxo.db"))
}

/// Open database connection, creating the parent directory if needed
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create tables and indexes when missing
pub fn init_schema(conn: &Connection) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;
    Ok(())
}

/// Insert new records, update changed ones and count the rest.
///
/// Records are identified by the source's [`KeyPolicy`]; records without a
/// key are skipped (the extractor never produces them). A deactivated
/// record seen again is reactivated and counted as updated.
pub fn save_records(
    conn: &Connection,
    source: SourceKind,
    records: &[CompanyRecord],
) -> Result<SaveStats> {
    let policy = source.key_policy();
    let now = Utc::now().to_rfc3339();
    let mut stats = SaveStats::default();

    let tx = conn
        .unchecked_transaction()
        .context("Failed to start transaction")?;

    for record in records {
        let Some(key) = policy.key_for(record) else {
            debug!("Skipping record without key: {:?}", record);
            continue;
        };
        let fields = serde_json::to_string(record).context("Failed to serialize record")?;

        let existing: Option<(i64, String, bool)> = tx
            .query_row(
                "SELECT id, fields, active FROM companies WHERE source = ?1 AND record_key = ?2",
                params![source.as_str(), key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let grupo = record.grupo();
        let grupo_key = grupo.as_deref().map(group_key);

        match existing {
            None => {
                tx.execute(
                    "INSERT INTO companies
                     (source, record_key, cnpj, grupo, grupo_key, nome_fantasia, fields, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        source.as_str(),
                        key,
                        record.cnpj(),
                        grupo,
                        grupo_key,
                        record.nome_fantasia(),
                        fields,
                        now
                    ],
                )?;
                stats.created += 1;
            }
            Some((_, stored, true)) if stored == fields => stats.unchanged += 1,
            Some((id, _, _)) => {
                tx.execute(
                    "UPDATE companies
                     SET cnpj = ?1, grupo = ?2, grupo_key = ?3, nome_fantasia = ?4, fields = ?5,
                         active = 1, updated_at = ?6
                     WHERE id = ?7",
                    params![
                        record.cnpj(),
                        grupo,
                        grupo_key,
                        record.nome_fantasia(),
                        fields,
                        now,
                        id
                    ],
                )?;
                stats.updated += 1;
            }
        }
    }

    tx.commit().context("Failed to commit records")?;
    info!(
        "Saved {} {} records ({} new, {} updated, {} unchanged)",
        stats.total(),
        source,
        stats.created,
        stats.updated,
        stats.unchanged
    );
    Ok(stats)
}

/// Deactivate the stored records of `source` whose key is absent from
/// `records`. Returns how many were deactivated.
pub fn deactivate_missing(
    conn: &Connection,
    source: SourceKind,
    records: &[CompanyRecord],
) -> Result<usize> {
    let policy = source.key_policy();
    let present: HashSet<String> = records.iter().filter_map(|r| policy.key_for(r)).collect();

    let stale: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id, record_key FROM companies WHERE source = ?1 AND active = 1",
        )?;
        let rows = stmt
            .query_map([source.as_str()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .filter(|(_, key)| !present.contains(key))
            .map(|(id, _)| id)
            .collect()
    };
    if stale.is_empty() {
        return Ok(0);
    }

    let now = Utc::now().to_rfc3339();
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start transaction")?;
    for id in &stale {
        tx.execute(
            "UPDATE companies SET active = 0, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
    }
    tx.commit().context("Failed to commit deactivation")?;

    info!("Deactivated {} {} records missing from the source", stale.len(), source);
    Ok(stale.len())
}

/// Active registry companies of a group, in insertion order.
///
/// The match is exact on the normalized name, with or without the
/// leading "Grupo".
pub fn find_by_group(conn: &Connection, name: &str) -> Result<Vec<CompanyRecord>> {
    find_by_group_in(conn, SourceKind::Cadastro, name)
}

pub fn find_by_group_in(
    conn: &Connection,
    source: SourceKind,
    name: &str,
) -> Result<Vec<CompanyRecord>> {
    let mut stmt = conn.prepare(
        "SELECT fields FROM companies
         WHERE source = ?1 AND grupo_key = ?2 AND active = 1
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map(params![source.as_str(), group_key(name)], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.iter()
        .map(|json| serde_json::from_str(json).context("Corrupt record in store"))
        .collect()
}

/// Groups of the registry with their active company counts, alphabetically
pub fn list_groups(conn: &Connection) -> Result<Vec<GroupSummary>> {
    let mut stmt = conn.prepare(
        "SELECT MIN(grupo), COUNT(*) FROM companies
         WHERE source = ?1 AND grupo_key IS NOT NULL AND active = 1
         GROUP BY grupo_key
         ORDER BY grupo_key",
    )?;

    let groups = stmt
        .query_map([SourceKind::Cadastro.as_str()], |row| {
            Ok(GroupSummary {
                name: row.get(0)?,
                companies: row.get::<_, i64>(1)? as usize,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(groups)
}

/// Number of active records of a source
pub fn count_records(conn: &Connection, source: SourceKind) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM companies WHERE source = ?1 AND active = 1",
        [source.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value, updated_at) VALUES (?1, ?2, ?3)",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
