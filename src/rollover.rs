//! Size-based rollover
//!
//! When a batch insert hits the engine's page cap (`SQLITE_FULL`), the live
//! file is copied to a timestamped sibling and the table is emptied in
//! place, preserving the open connection and the file's identity. The
//! emptied table returns its pages to the freelist, so the live file never
//! grows past the cap afterwards. Rollover reacts to exactly one error
//! code; every other write error is a transient failure handled elsewhere.

use anyhow::Context;
use chrono::{DateTime, Local};
use rusqlite::{Connection, ErrorCode};
use std::fs;
use std::path::{Path, PathBuf};

/// True when the error is the storage engine's "database or disk is full".
pub(crate) fn is_database_full(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DiskFull)
}

/// Sibling path the live file is archived to:
/// `<stem>-<yyyyMMdd_hhmmss.ff><ext>`, local time. The stamp keeps the
/// original 12-hour pattern for compatibility with existing archives.
pub(crate) fn archive_path(db_path: &Path, stamp: DateTime<Local>) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = db_path
        .extension()
        .map(|s| format!(".{}", s.to_string_lossy()))
        .unwrap_or_default();
    let hundredths = stamp.timestamp_subsec_millis() / 10;
    let name = format!(
        "{stem}-{}.{hundredths:02}{ext}",
        stamp.format("%Y%m%d_%I%M%S")
    );
    db_path.with_file_name(name)
}

/// Copy the live file aside and empty the table. Returns the archive path.
pub(crate) fn roll_over(
    conn: &Connection,
    db_path: &Path,
    table: &str,
) -> anyhow::Result<PathBuf> {
    let archive = archive_path(db_path, Local::now());
    fs::copy(db_path, &archive)
        .with_context(|| format!("failed to archive database to {}", archive.display()))?;
    conn.execute(&format!("DELETE FROM {table}"), [])
        .context("failed to empty live table after archiving")?;
    Ok(archive)
}
