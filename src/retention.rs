//! Age-based retention
//!
//! A sweep deletes rows whose `Timestamp` is older than the cut-off. The
//! cut-off string must be produced exactly like insert timestamps (same
//! UTC/local choice, same pattern) because the comparison is textual.
//! Sweeps are scheduled by the writer loop between batches, so they can
//! never land inside an insert transaction. Failures are logged and the
//! next sweep stays on schedule.

use crate::util::format_timestamp;
use chrono::Local;
use rusqlite::{named_params, Connection};
use std::time::Duration;

/// Cut-off string for a sweep starting now: `now - period`, formatted like
/// an insert timestamp. Returns `None` when the period is not representable
/// (far outside any real configuration); the caller skips the sweep rather
/// than deleting on a bogus boundary.
pub(crate) fn cutoff(period: Duration, utc: bool) -> Option<String> {
    let delta = chrono::Duration::from_std(period).ok()?;
    let now = Local::now().fixed_offset();
    let cut = now.checked_sub_signed(delta)?;
    Some(format_timestamp(&cut, utc))
}

/// Delete every row older than the cut-off. Returns the number of rows
/// removed.
pub(crate) fn sweep(conn: &Connection, table: &str, cutoff: &str) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE Timestamp < @cutoff"),
        named_params! { "@cutoff": cutoff },
    )
}
