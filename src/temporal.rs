//! Temporal parsing of x-axis values.
//!
//! Converts textual x values into points in time using a fixed, ordered list
//! of accepted formats, and converts between points in time and epoch seconds
//! for numeric range queries.

use crate::constants::X_PATTERN;
use crate::error::{MudataError, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

static X_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(X_PATTERN).expect("x pattern is a valid regex"));

/// Accepted x formats, tried in order, first match wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XFormat {
    Date,
    DateTimeOffset,
    DateTimeSecondsOffset,
    DateTime,
    DateTimeSeconds,
}

const FORMATS: &[XFormat] = &[
    XFormat::Date,
    XFormat::DateTimeOffset,
    XFormat::DateTimeSecondsOffset,
    XFormat::DateTime,
    XFormat::DateTimeSeconds,
];

impl XFormat {
    fn pattern(&self) -> &'static str {
        match self {
            XFormat::Date => "%Y-%m-%d",
            XFormat::DateTimeOffset => "%Y-%m-%d %H:%M %z",
            XFormat::DateTimeSecondsOffset => "%Y-%m-%d %H:%M:%S %z",
            XFormat::DateTime => "%Y-%m-%d %H:%M",
            XFormat::DateTimeSeconds => "%Y-%m-%d %H:%M:%S",
        }
    }

    fn try_parse(&self, text: &str) -> Option<PointInTime> {
        match self {
            XFormat::Date => NaiveDate::parse_from_str(text, self.pattern())
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(PointInTime::naive),
            XFormat::DateTimeOffset | XFormat::DateTimeSecondsOffset => {
                DateTime::parse_from_str(text, self.pattern())
                    .ok()
                    .map(PointInTime::from)
            }
            XFormat::DateTime | XFormat::DateTimeSeconds => {
                NaiveDateTime::parse_from_str(text, self.pattern())
                    .ok()
                    .map(PointInTime::naive)
            }
        }
    }
}

/// A parsed x value
///
/// Keeps the wall-clock fields as written plus the UTC offset when the text
/// carried one. Values without an offset are interpreted as UTC. Equality,
/// ordering and hashing follow the instant, so `17:25 -0300` equals `20:25`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PointInTime {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl PointInTime {
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            local,
            offset: Some(offset),
        }
    }

    /// The instant this value denotes
    pub fn instant(&self) -> DateTime<Utc> {
        let offset_seconds = self.offset.map(|o| o.local_minus_utc()).unwrap_or(0);
        let utc = self.local - chrono::Duration::seconds(i64::from(offset_seconds));
        utc.and_utc()
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn year(&self) -> i32 {
        self.local.year()
    }

    pub fn month(&self) -> u32 {
        self.local.month()
    }

    pub fn day(&self) -> u32 {
        self.local.day()
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    pub fn minute(&self) -> u32 {
        self.local.minute()
    }

    pub fn second(&self) -> u32 {
        self.local.second()
    }
}

impl From<DateTime<FixedOffset>> for PointInTime {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::with_offset(dt.naive_local(), *dt.offset())
    }
}

impl From<DateTime<Utc>> for PointInTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::naive(dt.naive_utc())
    }
}

impl PartialEq for PointInTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant() == other.instant()
    }
}

impl Eq for PointInTime {}

impl PartialOrd for PointInTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PointInTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant().cmp(&other.instant())
    }
}

impl Hash for PointInTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant().hash(state);
    }
}

impl fmt::Display for PointInTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(
                f,
                "{}",
                self.local
                    .and_local_timezone(offset)
                    .single()
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S %z").to_string())
                    .unwrap_or_else(|| self.local.format("%Y-%m-%d %H:%M:%S").to_string())
            ),
            None => write!(f, "{}", self.local.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl TryFrom<String> for PointInTime {
    type Error = MudataError;

    fn try_from(value: String) -> Result<Self> {
        parse_x(&value)
    }
}

impl From<PointInTime> for String {
    fn from(value: PointInTime) -> Self {
        value.to_string()
    }
}

/// Parse an optional x value
///
/// `None` passes through. Text matching none of the accepted formats fails
/// with [`MudataError::UnparsableTemporalValue`].
pub fn parse(text: Option<&str>) -> Result<Option<PointInTime>> {
    text.map(parse_x).transpose()
}

/// Parse a present x value
///
/// The whole text must have the shape of one of the accepted formats: a
/// four-digit year, a single space before the time and before the offset,
/// nothing around it. Leap seconds are rejected.
pub fn parse_x(text: &str) -> Result<PointInTime> {
    let unparsable = || MudataError::UnparsableTemporalValue {
        value: text.to_string(),
    };
    if !X_SHAPE.is_match(text) {
        return Err(unparsable());
    }
    FORMATS
        .iter()
        .find_map(|format| format.try_parse(text))
        // chrono keeps a leap second as nanoseconds past one billion
        .filter(|point| point.local().nanosecond() < 1_000_000_000)
        .ok_or_else(unparsable)
}

pub fn to_epoch_seconds(point: &PointInTime) -> f64 {
    let instant = point.instant();
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1e9
}

/// Inverse of [`to_epoch_seconds`]; `None` for non-finite or out-of-range input
pub fn from_epoch_seconds(seconds: f64) -> Option<PointInTime> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::<Utc>::from_timestamp(whole as i64, nanos).map(PointInTime::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE_STRINGS: [&str; 5] = [
        "2017-05-09",
        "2017-05-09 17:25",
        "2017-05-09 17:25 -0300",
        "2017-05-09 17:25:48",
        "2017-05-09 17:25:48 -0300",
    ];

    #[test]
    fn test_none_passes_through() {
        assert!(parse(None).unwrap().is_none());
    }

    #[test]
    fn test_all_formats_parse_dates() {
        for text in DATE_STRINGS {
            let point = parse_x(text).unwrap();
            assert_eq!(point.year(), 2017, "{}", text);
            assert_eq!(point.month(), 5, "{}", text);
            assert_eq!(point.day(), 9, "{}", text);
        }
    }

    #[test]
    fn test_times_and_seconds() {
        for text in &DATE_STRINGS[1..] {
            let point = parse_x(text).unwrap();
            assert_eq!(point.hour(), 17, "{}", text);
            assert_eq!(point.minute(), 25, "{}", text);
        }
        for text in &DATE_STRINGS[3..] {
            assert_eq!(parse_x(text).unwrap().second(), 48, "{}", text);
        }
    }

    #[test]
    fn test_offsets() {
        assert!(parse_x(DATE_STRINGS[0]).unwrap().offset().is_none());
        assert!(parse_x(DATE_STRINGS[1]).unwrap().offset().is_none());
        assert!(parse_x(DATE_STRINGS[3]).unwrap().offset().is_none());

        for text in [DATE_STRINGS[2], DATE_STRINGS[4]] {
            let offset = parse_x(text).unwrap().offset().unwrap();
            assert_eq!(offset.local_minus_utc(), -3 * 3600);
        }
    }

    #[test]
    fn test_unparsable_values() {
        for text in [
            "not-a-date",
            "",
            "2017/05/09",
            "17:25",
            "2017-05-09T17:25:48Z",
            "17-05-09",
            "+2017-05-09",
            " 2017-05-09",
            "2017-05-09 ",
            "2017-05-0917:25",
            "2017-05-09  17:25",
            "2017-05-09 17:25:60",
            "2017-05-09 17:25 -03:00",
            "2017-13-09",
        ] {
            assert!(
                matches!(
                    parse_x(text),
                    Err(MudataError::UnparsableTemporalValue { .. })
                ),
                "expected failure for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_instant_equality_across_offsets() {
        let with_offset = parse_x("2017-05-09 17:25 -0300").unwrap();
        let utc = parse_x("2017-05-09 20:25").unwrap();
        assert_eq!(with_offset, utc);
        assert!(parse_x("2017-05-09").unwrap() < utc);
    }

    #[test]
    fn test_epoch_round_trip() {
        for text in DATE_STRINGS {
            let point = parse_x(text).unwrap();
            let seconds = to_epoch_seconds(&point);
            assert_eq!(from_epoch_seconds(seconds).unwrap(), point, "{}", text);
        }
        assert_eq!(to_epoch_seconds(&parse_x("1970-01-01").unwrap()), 0.0);
        assert_eq!(
            to_epoch_seconds(&parse_x("1970-01-01 00:00 -0100").unwrap()),
            3600.0
        );
    }

    #[test]
    fn test_from_epoch_rejects_non_finite() {
        assert!(from_epoch_seconds(f64::NAN).is_none());
        assert!(from_epoch_seconds(f64::INFINITY).is_none());
    }

    #[test]
    fn test_display_reparses() {
        for text in DATE_STRINGS {
            let point = parse_x(text).unwrap();
            let reparsed = parse_x(&point.to_string()).unwrap();
            assert_eq!(reparsed, point);
            assert_eq!(reparsed.offset(), point.offset());
        }
    }
}
