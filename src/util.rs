//! Shared utility functions

use chrono::{DateTime, FixedOffset, Utc};

/// Pattern used for the `Timestamp` column and the retention cut-off:
/// seconds precision, no fractional part, no offset suffix.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format an event timestamp for storage.
///
/// With `utc` set the instant is converted to UTC first; otherwise the
/// event's own offset is kept. The offset itself is never part of the
/// output, so inserts and the retention cut-off must agree on `utc` for
/// the column's textual ordering to mean anything.
pub(crate) fn format_timestamp(timestamp: &DateTime<FixedOffset>, utc: bool) -> String {
    if utc {
        timestamp
            .with_timezone(&Utc)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    } else {
        timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_format_keeps_local_clock_time() {
        let ts = parse("2024-01-02T03:04:05+02:00");
        assert_eq!(format_timestamp(&ts, false), "2024-01-02T03:04:05");
    }

    #[test]
    fn test_format_converts_to_utc() {
        let ts = parse("2024-01-02T03:04:05+02:00");
        assert_eq!(format_timestamp(&ts, true), "2024-01-02T01:04:05");
    }

    #[test]
    fn test_format_truncates_subseconds() {
        let ts = parse("2024-01-02T03:04:05.999+00:00");
        assert_eq!(format_timestamp(&ts, false), "2024-01-02T03:04:05");
        assert_eq!(format_timestamp(&ts, true), "2024-01-02T03:04:05");
    }

    #[test]
    fn test_utc_conversion_can_cross_midnight() {
        let ts = parse("2024-01-02T01:30:00+05:30");
        assert_eq!(format_timestamp(&ts, true), "2024-01-01T20:00:00");
    }
}
