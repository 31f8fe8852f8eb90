//! Database bootstrap: connection configuration and table creation
//!
//! Runs once, on the constructing thread, so any failure is a construction
//! error rather than something the writer thread can only log. The
//! bootstrapped connection is then handed to the writer thread, which owns
//! it exclusively for the life of the sink.

use crate::config::{EffectiveConfig, CACHE_SIZE_PAGES, PAGE_SIZE};
use rusqlite::Connection;

/// Open (or create) the database, apply the connection configuration, and
/// make sure the log table exists. Idempotent.
pub(crate) fn open_database(cfg: &EffectiveConfig) -> rusqlite::Result<Connection> {
    let conn = Connection::open(&cfg.db_path)?;

    // page_size must be set before the first table is created; the in-memory
    // journal trades per-transaction crash atomicity for throughput, and
    // max_page_count is what turns the size budget into SQLITE_FULL.
    conn.execute_batch(&format!(
        "PRAGMA page_size={PAGE_SIZE};\n\
         PRAGMA journal_mode=MEMORY;\n\
         PRAGMA synchronous=NORMAL;\n\
         PRAGMA cache_size={CACHE_SIZE_PAGES};\n\
         PRAGMA max_page_count={};",
        cfg.max_page_count
    ))?;

    create_table(&conn, &cfg.table_name)?;
    Ok(conn)
}

/// `CREATE TABLE IF NOT EXISTS`: a pre-existing table with a compatible
/// superset of columns passes unchanged.
pub(crate) fn create_table(conn: &Connection, table: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n\
             id INTEGER PRIMARY KEY AUTOINCREMENT,\n\
             Timestamp TEXT,\n\
             Level VARCHAR(10),\n\
             Exception TEXT,\n\
             RenderedMessage TEXT,\n\
             Properties TEXT\n\
         )"
    ))
}
