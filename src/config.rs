//! Sink configuration
//!
//! Options are validated exactly once, at construction: `SqliteSinkOptions`
//! is what callers fill in, `EffectiveConfig` is what the writer thread
//! works from, with all floors applied and derived limits pre-computed.
//! After `into_effective` succeeds nothing in the write path can be
//! misconfigured.

use crate::error::SinkError;
use crate::events::Level;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Defaults and limits
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_TABLE_NAME: &str = "Logs";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100_000;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_DB_MB: u64 = 10;

/// Largest database size the engine's page accounting supports at a
/// 4096-byte page size.
pub const MAX_SUPPORTED_DB_MB: u64 = 20_480;

/// SQLite page size applied at open, in bytes.
pub(crate) const PAGE_SIZE: u64 = 4096;

/// SQLite page cache size, in pages.
pub(crate) const CACHE_SIZE_PAGES: u64 = 500;

/// Smallest accepted flush interval; shorter values would busy-flush.
pub(crate) const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Timers never sleep longer than this; longer configured intervals are
/// clamped so deadline arithmetic stays in range.
pub(crate) const MAX_TIMER_INTERVAL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Floor for the retention period.
pub(crate) const MIN_RETENTION_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Floor and rounding unit for the retention sweep schedule.
pub(crate) const RETENTION_INTERVAL_UNIT: Duration = Duration::from_secs(15 * 60);

const BYTES_PER_MB: u64 = 1_048_576;

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options for constructing a [`SqliteSink`](crate::SqliteSink).
///
/// ```
/// use sqlog::{Level, SqliteSinkOptions};
/// use std::time::Duration;
///
/// let options = SqliteSinkOptions::new("./logs/app.db")
///     .table_name("Logs")
///     .store_timestamp_in_utc(true)
///     .min_level(Level::Information)
///     .batch_size(250)
///     .flush_interval(Duration::from_secs(5))
///     .retention_period(Duration::from_secs(24 * 3600))
///     .max_db_mb(100);
/// ```
#[derive(Debug, Clone)]
pub struct SqliteSinkOptions {
    /// Path to the database file; relative paths resolve against the
    /// process working directory, parent directories are created.
    pub db_path: PathBuf,
    /// Table used in `CREATE TABLE` and all DML. Must be a bare identifier.
    pub table_name: String,
    /// Convert timestamps (inserts and the retention cut-off) to UTC
    /// before formatting; otherwise each event keeps its own offset.
    pub store_timestamp_in_utc: bool,
    /// Events below this level are ignored by `emit`.
    pub min_level: Level,
    /// Size trigger: a batch is dispatched when this many events are pending.
    pub batch_size: usize,
    /// Hard cap on queued events; a full buffer drops new events.
    pub max_buffer_size: usize,
    /// Time trigger: inactivity period after which a pending batch is
    /// dispatched regardless of size.
    pub flush_interval: Duration,
    /// Delete rows older than this. `None` disables retention.
    /// Floored to 30 minutes when set.
    pub retention_period: Option<Duration>,
    /// Retention sweep period. Floored to 15 minutes and rounded down to a
    /// multiple of 15 minutes; defaults to the floor when unset.
    pub retention_check_interval: Option<Duration>,
    /// Maximum database size in megabytes, enforced by the engine's page
    /// count. At most [`MAX_SUPPORTED_DB_MB`].
    pub max_db_mb: u64,
    /// On a full database, archive the file and retry the batch once;
    /// when disabled the offending batch is dropped instead.
    pub roll_over: bool,
}

impl SqliteSinkOptions {
    /// Options with the documented defaults for the given database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            store_timestamp_in_utc: false,
            min_level: Level::Verbose,
            batch_size: DEFAULT_BATCH_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            retention_period: None,
            retention_check_interval: None,
            max_db_mb: DEFAULT_MAX_DB_MB,
            roll_over: true,
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn store_timestamp_in_utc(mut self, utc: bool) -> Self {
        self.store_timestamp_in_utc = utc;
        self
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub fn retention_period(mut self, period: Duration) -> Self {
        self.retention_period = Some(period);
        self
    }

    pub fn retention_check_interval(mut self, interval: Duration) -> Self {
        self.retention_check_interval = Some(interval);
        self
    }

    pub fn max_db_mb(mut self, max_db_mb: u64) -> Self {
        self.max_db_mb = max_db_mb;
        self
    }

    pub fn roll_over(mut self, roll_over: bool) -> Self {
        self.roll_over = roll_over;
        self
    }

    /// Validate and resolve into the writer's working configuration.
    pub(crate) fn into_effective(self) -> Result<EffectiveConfig, SinkError> {
        if !is_bare_identifier(&self.table_name) {
            return Err(SinkError::InvalidConfiguration(format!(
                "table name {:?} must be a bare SQL identifier",
                self.table_name
            )));
        }
        if self.batch_size == 0 {
            return Err(SinkError::InvalidConfiguration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_buffer_size == 0 {
            return Err(SinkError::InvalidConfiguration(
                "max_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.max_db_mb == 0 || self.max_db_mb > MAX_SUPPORTED_DB_MB {
            return Err(SinkError::InvalidConfiguration(format!(
                "max_db_mb must be between 1 and {}, got {}",
                MAX_SUPPORTED_DB_MB, self.max_db_mb
            )));
        }

        let db_path = if self.db_path.is_absolute() {
            self.db_path
        } else {
            let base = std::env::current_dir().map_err(|e| {
                SinkError::InvalidConfiguration(format!("cannot resolve relative db_path: {e}"))
            })?;
            base.join(self.db_path)
        };

        let retention = self.retention_period.map(|period| RetentionConfig {
            period: effective_retention_period(period),
            check_interval: effective_check_interval(
                self.retention_check_interval
                    .unwrap_or(RETENTION_INTERVAL_UNIT),
            )
            .min(MAX_TIMER_INTERVAL),
        });

        Ok(EffectiveConfig {
            db_path,
            table_name: self.table_name,
            store_timestamp_in_utc: self.store_timestamp_in_utc,
            min_level: self.min_level,
            batch_size: self.batch_size,
            max_buffer_size: self.max_buffer_size,
            flush_interval: self
                .flush_interval
                .clamp(MIN_FLUSH_INTERVAL, MAX_TIMER_INTERVAL),
            retention,
            max_db_mb: self.max_db_mb,
            max_page_count: self.max_db_mb * BYTES_PER_MB / PAGE_SIZE,
            roll_over: self.roll_over,
        })
    }
}

/// Validated, floor-applied configuration the writer thread runs from.
#[derive(Debug, Clone)]
pub(crate) struct EffectiveConfig {
    pub db_path: PathBuf,
    pub table_name: String,
    pub store_timestamp_in_utc: bool,
    pub min_level: Level,
    pub batch_size: usize,
    pub max_buffer_size: usize,
    pub flush_interval: Duration,
    pub retention: Option<RetentionConfig>,
    pub max_db_mb: u64,
    pub max_page_count: u64,
    pub roll_over: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RetentionConfig {
    pub period: Duration,
    pub check_interval: Duration,
}

/// Retention cut-off distance: never less than 30 minutes.
pub(crate) fn effective_retention_period(configured: Duration) -> Duration {
    configured.max(MIN_RETENTION_PERIOD)
}

/// Sweep schedule: the larger of the configured interval and 15 minutes,
/// rounded down to a multiple of 15 minutes.
pub(crate) fn effective_check_interval(configured: Duration) -> Duration {
    let unit = RETENTION_INTERVAL_UNIT.as_secs();
    let secs = configured.max(RETENTION_INTERVAL_UNIT).as_secs();
    Duration::from_secs(secs / unit * unit)
}

/// A bare SQL identifier: leading alphabetic or underscore, then
/// alphanumerics or underscores. Anything else would need quoting and is
/// rejected rather than interpolated into DDL/DML.
fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn test_defaults() {
        let options = SqliteSinkOptions::new("./t.db");
        assert_eq!(options.table_name, "Logs");
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.max_buffer_size, 100_000);
        assert_eq!(options.flush_interval, Duration::from_secs(10));
        assert_eq!(options.max_db_mb, 10);
        assert!(options.roll_over);
        assert!(options.retention_period.is_none());
        assert!(!options.store_timestamp_in_utc);
        assert_eq!(options.min_level, Level::Verbose);
    }

    #[test]
    fn test_retention_period_floor() {
        assert_eq!(effective_retention_period(minutes(10)), minutes(30));
        assert_eq!(effective_retention_period(minutes(30)), minutes(30));
        assert_eq!(effective_retention_period(minutes(120)), minutes(120));
    }

    #[test]
    fn test_check_interval_floor_and_rounding() {
        assert_eq!(effective_check_interval(minutes(5)), minutes(15));
        assert_eq!(effective_check_interval(minutes(15)), minutes(15));
        // Rounded down to the next multiple of 15
        assert_eq!(effective_check_interval(minutes(40)), minutes(30));
        assert_eq!(effective_check_interval(minutes(50)), minutes(45));
        assert_eq!(effective_check_interval(minutes(60)), minutes(60));
    }

    #[test]
    fn test_flush_interval_is_floored() {
        let cfg = SqliteSinkOptions::new("/tmp/t.db")
            .flush_interval(Duration::from_millis(1))
            .into_effective()
            .unwrap();
        assert_eq!(cfg.flush_interval, MIN_FLUSH_INTERVAL);
    }

    #[test]
    fn test_timer_intervals_are_capped() {
        let cfg = SqliteSinkOptions::new("/tmp/t.db")
            .flush_interval(Duration::MAX)
            .retention_period(minutes(60))
            .retention_check_interval(Duration::MAX)
            .into_effective()
            .unwrap();
        assert_eq!(cfg.flush_interval, MAX_TIMER_INTERVAL);
        assert_eq!(cfg.retention.unwrap().check_interval, MAX_TIMER_INTERVAL);
    }

    #[test]
    fn test_max_page_count_derivation() {
        let cfg = SqliteSinkOptions::new("/tmp/t.db")
            .into_effective()
            .unwrap();
        // 10 MB at 4096-byte pages
        assert_eq!(cfg.max_page_count, 2560);

        let cfg = SqliteSinkOptions::new("/tmp/t.db")
            .max_db_mb(1)
            .into_effective()
            .unwrap();
        assert_eq!(cfg.max_page_count, 256);
    }

    #[test]
    fn test_retention_defaults_check_interval() {
        let cfg = SqliteSinkOptions::new("/tmp/t.db")
            .retention_period(minutes(60))
            .into_effective()
            .unwrap();
        let retention = cfg.retention.unwrap();
        assert_eq!(retention.period, minutes(60));
        assert_eq!(retention.check_interval, minutes(15));
    }

    #[test]
    fn test_invalid_table_names_rejected() {
        for name in ["", "1logs", "logs-archive", "logs; DROP TABLE x", "l o g"] {
            let result = SqliteSinkOptions::new("/tmp/t.db")
                .table_name(name)
                .into_effective();
            assert!(
                matches!(result, Err(SinkError::InvalidConfiguration(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_valid_table_names_accepted() {
        for name in ["Logs", "_private", "app_logs_2024"] {
            assert!(SqliteSinkOptions::new("/tmp/t.db")
                .table_name(name)
                .into_effective()
                .is_ok());
        }
    }

    #[test]
    fn test_max_db_mb_bounds() {
        for mb in [0, MAX_SUPPORTED_DB_MB + 1] {
            let result = SqliteSinkOptions::new("/tmp/t.db")
                .max_db_mb(mb)
                .into_effective();
            assert!(matches!(result, Err(SinkError::InvalidConfiguration(_))));
        }
        assert!(SqliteSinkOptions::new("/tmp/t.db")
            .max_db_mb(MAX_SUPPORTED_DB_MB)
            .into_effective()
            .is_ok());
    }

    #[test]
    fn test_zero_batch_and_buffer_rejected() {
        assert!(SqliteSinkOptions::new("/tmp/t.db")
            .batch_size(0)
            .into_effective()
            .is_err());
        assert!(SqliteSinkOptions::new("/tmp/t.db")
            .max_buffer_size(0)
            .into_effective()
            .is_err());
    }

    #[test]
    fn test_relative_path_resolves_against_cwd() {
        let cfg = SqliteSinkOptions::new("logs/t.db")
            .into_effective()
            .unwrap();
        assert!(cfg.db_path.is_absolute());
        assert!(cfg.db_path.ends_with("logs/t.db"));
    }
}
