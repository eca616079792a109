//! Timestamp formatting for stored documents.
//!
//! Timestamps are written as RFC3339 with nanoseconds in UTC so they sort
//! lexically. Parsing also accepts RFC3339 without fractional seconds and
//! any UTC offset.

use crate::io::error::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};

/// Format `time` as RFC3339 with nanosecond precision and a `Z` suffix.
///
/// Always writes nine fractional digits, so values with trailing zeros or a
/// non-UTC offset in older files will not match byte-for-byte after a rewrite.
/// [`parse_time`] reads both forms.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC3339 timestamp (with or without fractional seconds) into UTC.
///
/// # Errors
///
/// Returns `StoreError::InvalidTimestamp` naming the rejected input.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn format_then_parse_round_trip() {
        let now = Utc::now();
        assert_eq!(parse_time(&format_time(now)).unwrap(), now);
    }

    #[test]
    fn parse_rfc3339_without_fraction() {
        let parsed = parse_time("2024-01-15T10:30:00Z").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 1, 15));
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn parse_rfc3339_nanos() {
        let parsed = parse_time("2024-01-15T10:30:00.123456789Z").unwrap();
        assert_eq!(parsed.nanosecond(), 123_456_789);
    }

    #[test]
    fn parse_converts_offset_to_utc() {
        let parsed = parse_time("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn parse_invalid_names_value() {
        let err = parse_time("not-a-time").unwrap_err();
        assert!(matches!(err, StoreError::InvalidTimestamp { .. }));
        assert!(err.to_string().contains("not-a-time"));
    }

    #[test]
    fn format_pads_fraction_and_normalizes_offset() {
        let parsed = parse_time("2024-01-15T12:30:00.5+02:00").unwrap();
        assert_eq!(format_time(parsed), "2024-01-15T10:30:00.500000000Z");
    }

    #[test]
    fn format_includes_nanoseconds() {
        let time = Utc
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(format_time(time), "2024-06-15T12:00:00.123456789Z");
    }
}
