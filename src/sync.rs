//! Synchronization of the source workbooks into the store.
//!
//! Only one sync runs at a time per process. Each source file is
//! fingerprinted with blake3; an unchanged file is skipped unless the
//! caller forces a re-read. Records missing from a non-empty extraction
//! are deactivated.

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::db::{self, SourceKind};
use crate::error::PipelineError;
use crate::importers::import_source;

static SYNC_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const LAST_RUN_KEY: &str = "sync.last_run";

/// Held for the duration of a sync
pub struct SyncGuard {
    _guard: MutexGuard<'static, ()>,
}

impl SyncGuard {
    pub fn acquire() -> Result<Self, PipelineError> {
        match SYNC_LOCK.try_lock() {
            Ok(guard) => Ok(Self { _guard: guard }),
            // the lock guards no data
            Err(TryLockError::Poisoned(poisoned)) => Ok(Self {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => Err(PipelineError::SyncInProgress),
        }
    }
}

/// Outcome for one source
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub source: SourceKind,
    pub path: PathBuf,
    pub extracted: usize,
    /// File unchanged since the last sync
    pub skipped: bool,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Stored records no longer present in the source
    pub deactivated: usize,
    pub issues: usize,
    pub duration: Duration,
}

impl SyncSummary {
    fn skipped(source: SourceKind, path: &Path, duration: Duration) -> Self {
        Self {
            source,
            path: path.to_path_buf(),
            extracted: 0,
            skipped: true,
            created: 0,
            updated: 0,
            unchanged: 0,
            deactivated: 0,
            issues: 0,
            duration,
        }
    }
}

/// Sync the registry, plus the departures and products workbooks when
/// they are present.
pub fn run_sync(conn: &Connection, config: &AppConfig, force: bool) -> Result<Vec<SyncSummary>> {
    let _guard = SyncGuard::acquire()?;
    info!("Starting sync (force: {})", force);

    let mut summaries = Vec::new();
    for kind in SourceKind::ALL {
        let path = config.source_path(kind);
        if kind != SourceKind::Cadastro && !path.exists() {
            debug!("No {} source at {:?}, skipping", kind, path);
            continue;
        }
        summaries.push(sync_source(conn, config, kind, &path, force)?);
    }

    db::set_metadata(conn, LAST_RUN_KEY, &Utc::now().to_rfc3339())?;
    Ok(summaries)
}

fn sync_source(
    conn: &Connection,
    config: &AppConfig,
    kind: SourceKind,
    path: &Path,
    force: bool,
) -> Result<SyncSummary> {
    let started = Instant::now();
    let fingerprint = fingerprint(path)?;
    let key = fingerprint_key(kind);

    if !force && db::get_metadata(conn, &key)?.as_deref() == Some(fingerprint.as_str()) {
        info!("{} source unchanged since last sync", kind);
        return Ok(SyncSummary::skipped(kind, path, started.elapsed()));
    }

    let extraction = import_source(path, kind, &config.source(kind))?;
    if extraction.issues.has_issues() {
        warn!(
            "{} source: {} rows with issues",
            kind,
            extraction.issues.len()
        );
    }
    let stats = db::save_records(conn, kind, &extraction.records)?;
    let deactivated = if extraction.records.is_empty() {
        warn!("{} source yielded no records, keeping stored ones active", kind);
        0
    } else {
        db::deactivate_missing(conn, kind, &extraction.records)?
    };
    db::set_metadata(conn, &key, &fingerprint)?;

    Ok(SyncSummary {
        source: kind,
        path: path.to_path_buf(),
        extracted: extraction.record_count,
        skipped: false,
        created: stats.created,
        updated: stats.updated,
        unchanged: stats.unchanged,
        deactivated,
        issues: extraction.issues.len(),
        duration: started.elapsed(),
    })
}

/// Time of the last completed sync (RFC 3339)
pub fn last_sync(conn: &Connection) -> Result<Option<String>> {
    db::get_metadata(conn, LAST_RUN_KEY)
}

fn fingerprint_key(kind: SourceKind) -> String {
    format!("sync.fingerprint.{}", kind)
}

fn fingerprint(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read source {}", path.display()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
