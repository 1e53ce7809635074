//! Datetime parsing for coverage queries.
//!
//! Analysis products are addressed by valid time. Requests use either a
//! single instant (`2023-06-01T12Z`) or an interval (`start/end`), where
//! either end may be left open with `..`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Short hourly form used by the analysis archive, e.g. `2023-06-01T12Z`.
pub const HOURLY_FORMAT: &str = "%Y-%m-%dT%HZ";

/// Format a timestamp in the short hourly form.
pub fn format_hourly(dt: &DateTime<Utc>) -> String {
    dt.format(HOURLY_FORMAT).to_string()
}

/// Parse a single timestamp.
///
/// Accepts the short hourly form, RFC 3339, `%Y-%m-%dT%H:%M:%S[Z]` and a bare
/// date (midnight UTC).
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    // chrono cannot build a time from an hour alone, so pad the short form
    if let Some(hourly) = s.strip_suffix('Z').filter(|h| h.len() == 13) {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}:00:00", hourly), "%Y-%m-%dT%H:%M:%S") {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Parse a timestamp embedded with a strftime-style `format`, such as the
/// `%Y%m%dT%HZ` stamp in archive file names.
///
/// Formats that stop at the hour or the day are accepted; missing fields
/// are taken as zero.
pub fn parse_with_format(s: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    // hour-only stamps: supply the minutes chrono insists on
    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}|00", s), &format!("{}|%M", format)) {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    NaiveDate::parse_from_str(s, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// A closed time interval; either end may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeInterval {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| dt >= &s) && self.end.map_or(true, |e| dt <= &e)
    }
}

/// Parsed `datetime` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeSpec {
    /// Single specific time
    Instant(DateTime<Utc>),
    /// Time range (start/end)
    Interval(TimeInterval),
}

impl DatetimeSpec {
    /// Parse a `datetime` parameter.
    ///
    /// Supports:
    /// - Single time: "2023-06-01T00Z" or "2023-06-01T00:00:00Z"
    /// - Time range: "2023-06-01T00Z/2023-06-03T00Z"
    /// - Open range: "../2023-06-03T00Z" or "2023-06-01T00Z/.."
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let Some((start, end)) = s.split_once('/') else {
            return Ok(DatetimeSpec::Instant(parse_datetime(s)?));
        };

        let parse_end = |part: &str| -> Result<Option<DateTime<Utc>>, TimeParseError> {
            match part.trim() {
                "" | ".." => Ok(None),
                other => parse_datetime(other).map(Some),
            }
        };

        let interval = TimeInterval::new(parse_end(start)?, parse_end(end)?);

        if let (Some(s), Some(e)) = (interval.start, interval.end) {
            if s > e {
                return Err(TimeParseError::InvertedInterval(format!("{}/{}", start, end)));
            }
        }

        Ok(DatetimeSpec::Interval(interval))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Interval start is after its end: {0}")]
    InvertedInterval(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_hourly_form() {
        let dt = parse_datetime("2023-06-01T12Z").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 6);
        assert_eq!(dt.day(), 1);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_format_hourly_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2023, 6, 1, 18, 0, 0).unwrap();
        assert_eq!(format_hourly(&dt), "2023-06-01T18Z");
        assert_eq!(parse_datetime(&format_hourly(&dt)).unwrap(), dt);
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_datetime("2023-06-01T06:00:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 6, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_datetime("2023-06-02").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_with_archive_format() {
        let expected = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_with_format("20230601T12Z", "%Y%m%dT%HZ"), Some(expected));
        assert_eq!(
            parse_with_format("2023060112", "%Y%m%d%H"),
            Some(expected)
        );
        assert_eq!(
            parse_with_format("20230601", "%Y%m%d"),
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_with_format("2023-06-01", "%Y%m%dT%HZ"), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(TimeParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_interval() {
        let spec = DatetimeSpec::parse("2023-06-01T00Z/2023-06-03T00Z").unwrap();
        let DatetimeSpec::Interval(interval) = spec else {
            panic!("Expected interval");
        };
        assert_eq!(interval.start, Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(interval.end, Some(Utc.with_ymd_and_hms(2023, 6, 3, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_open_interval() {
        let spec = DatetimeSpec::parse("../2023-06-03T00Z").unwrap();
        let DatetimeSpec::Interval(interval) = spec else {
            panic!("Expected interval");
        };
        assert!(interval.start.is_none());
        assert!(interval.contains(&Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()));
        assert!(!interval.contains(&Utc.with_ymd_and_hms(2023, 6, 3, 1, 0, 0).unwrap()));
    }

    #[test]
    fn test_inverted_interval_rejected() {
        assert!(matches!(
            DatetimeSpec::parse("2023-06-03T00Z/2023-06-01T00Z"),
            Err(TimeParseError::InvertedInterval(_))
        ));
    }

    #[test]
    fn test_interval_inclusive_bounds() {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 6, 3, 0, 0, 0).unwrap();
        let interval = TimeInterval::new(Some(start), Some(end));
        assert!(interval.contains(&start));
        assert!(interval.contains(&end));
    }
}
