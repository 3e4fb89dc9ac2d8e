//! Timestamp normalization.
//!
//! Every instant that enters the store is reduced to seconds since the Unix
//! epoch as an `f64`. Numbers pass through unchanged. Strings are read as UTC
//! wall-clock time, trying each [`TimestampFormat`] in order and stopping at
//! the first that parses.

use crate::{HistreeError, Result, TimeRange};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Anything that can name an instant.
#[derive(Debug, Clone, PartialEq)]
pub enum Timelike {
    /// Epoch seconds.
    Seconds(f64),
    /// A timestamp string in one of the [`TimestampFormat`]s.
    Text(String),
}

impl From<f64> for Timelike {
    fn from(s: f64) -> Self {
        Timelike::Seconds(s)
    }
}
impl From<i64> for Timelike {
    fn from(s: i64) -> Self {
        Timelike::Seconds(s as f64)
    }
}
impl From<i32> for Timelike {
    fn from(s: i32) -> Self {
        Timelike::Seconds(s.into())
    }
}
impl From<&str> for Timelike {
    fn from(s: &str) -> Self {
        Timelike::Text(s.to_string())
    }
}
impl From<String> for Timelike {
    fn from(s: String) -> Self {
        Timelike::Text(s)
    }
}
impl From<DateTime<Utc>> for Timelike {
    fn from(dt: DateTime<Utc>) -> Self {
        Timelike::Seconds(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9)
    }
}

/// Accepted string layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2022-03-01T08:00:00Z`
    IsoZulu,
    /// `2022-03-01T08:00:00`
    Iso,
    /// `2022-03-01 08:00:00`
    SpaceSeconds,
    /// `2022-03-01 08:00`
    SpaceMinutes,
    /// `2022-03-01`
    Date,
}

impl TimestampFormat {
    pub const ALL: [TimestampFormat; 5] = [
        TimestampFormat::IsoZulu,
        TimestampFormat::Iso,
        TimestampFormat::SpaceSeconds,
        TimestampFormat::SpaceMinutes,
        TimestampFormat::Date,
    ];

    /// The `strftime` pattern for this format.
    pub fn pattern(self) -> &'static str {
        match self {
            TimestampFormat::IsoZulu => "%Y-%m-%dT%H:%M:%SZ",
            TimestampFormat::Iso => "%Y-%m-%dT%H:%M:%S",
            TimestampFormat::SpaceSeconds => "%Y-%m-%d %H:%M:%S",
            TimestampFormat::SpaceMinutes => "%Y-%m-%d %H:%M",
            TimestampFormat::Date => "%Y-%m-%d",
        }
    }

    fn parse(self, text: &str) -> Option<f64> {
        let naive = match self {
            TimestampFormat::Date => NaiveDate::parse_from_str(text, self.pattern())
                .ok()?
                .and_hms_opt(0, 0, 0)?,
            _ => NaiveDateTime::parse_from_str(text, self.pattern()).ok()?,
        };
        Some(naive.and_utc().timestamp() as f64)
    }
}

/// Normalize one instant to epoch seconds.
pub fn normalize(timelike: &Timelike) -> Result<f64> {
    match timelike {
        Timelike::Seconds(s) => Ok(*s),
        Timelike::Text(text) => parse_str(text),
    }
}

/// Parse a timestamp string, first matching format wins.
pub fn parse_str(text: &str) -> Result<f64> {
    TimestampFormat::ALL
        .iter()
        .find_map(|format| format.parse(text))
        .ok_or_else(|| HistreeError::InvalidTimestamp(text.to_string()))
}

/// Normalize element-wise, preserving order and length.
pub fn normalize_seq(items: &[Timelike]) -> Result<Vec<f64>> {
    items.iter().map(normalize).collect()
}

/// Render epoch seconds as a UTC string in `format`.
///
/// Sub-second precision (and, for coarser formats, seconds or the time of day)
/// is truncated.
pub fn format_timestamp(seconds: f64, format: TimestampFormat) -> Result<String> {
    let dt = DateTime::<Utc>::from_timestamp(seconds.floor() as i64, 0)
        .filter(|_| seconds.is_finite())
        .ok_or_else(|| HistreeError::InvalidTimestamp(seconds.to_string()))?;
    Ok(dt.format(format.pattern()).to_string())
}

// ---------------------------------------------------------------------------
// Time ranges
// ---------------------------------------------------------------------------

/// Conversion into a normalized (but not yet validated) [`TimeRange`].
pub trait ToTimeRange {
    fn to_time_range(&self) -> Result<TimeRange>;
}

impl ToTimeRange for TimeRange {
    fn to_time_range(&self) -> Result<TimeRange> {
        Ok(*self)
    }
}

impl<A, B> ToTimeRange for (A, B)
where
    A: Clone + Into<Timelike>,
    B: Clone + Into<Timelike>,
{
    fn to_time_range(&self) -> Result<TimeRange> {
        Ok(TimeRange {
            start: normalize(&self.0.clone().into())?,
            end: normalize(&self.1.clone().into())?,
        })
    }
}

impl<T: ToTimeRange + ?Sized> ToTimeRange for &T {
    fn to_time_range(&self) -> Result<TimeRange> {
        (**self).to_time_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2022-03-01T08:00:00Z
    const MARCH_1_8AM: f64 = 1_646_121_600.0;
    const MARCH_1: f64 = 1_646_092_800.0;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(normalize(&Timelike::from(1645142400.1)).unwrap(), 1645142400.1);
        assert_eq!(normalize(&Timelike::from(1000)).unwrap(), 1000.0);
        assert_eq!(normalize(&Timelike::from(-5_i64)).unwrap(), -5.0);
    }

    #[test]
    fn every_format_parses_the_same_instant() {
        for text in [
            "2022-03-01T08:00:00Z",
            "2022-03-01T08:00:00",
            "2022-03-01 08:00:00",
            "2022-03-01 08:00",
        ] {
            assert_eq!(parse_str(text).unwrap(), MARCH_1_8AM, "format of {text}");
        }
        assert_eq!(parse_str("2022-03-01").unwrap(), MARCH_1);
    }

    #[test]
    fn strings_are_utc_without_offset() {
        assert_eq!(parse_str("1970-01-01").unwrap(), 0.0);
        assert_eq!(parse_str("1970-01-01 00:01").unwrap(), 60.0);
    }

    #[test]
    fn unparseable_strings_are_rejected() {
        for text in ["", "yesterday", "2022-13-01", "2022-03-01T08:00", "1645142400"] {
            assert_eq!(
                parse_str(text).unwrap_err(),
                HistreeError::InvalidTimestamp(text.to_string()),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn format_round_trips_at_format_resolution() {
        let t = MARCH_1_8AM + 37.0;
        for format in [
            TimestampFormat::IsoZulu,
            TimestampFormat::Iso,
            TimestampFormat::SpaceSeconds,
        ] {
            let text = format_timestamp(t, format).unwrap();
            assert_eq!(parse_str(&text).unwrap(), t, "round trip via {text}");
        }
        let minutes = format_timestamp(MARCH_1_8AM, TimestampFormat::SpaceMinutes).unwrap();
        assert_eq!(minutes, "2022-03-01 08:00");
        assert_eq!(parse_str(&minutes).unwrap(), MARCH_1_8AM);

        let date = format_timestamp(MARCH_1, TimestampFormat::Date).unwrap();
        assert_eq!(date, "2022-03-01");
        assert_eq!(parse_str(&date).unwrap(), MARCH_1);
    }

    #[test]
    fn format_truncates_below_its_resolution() {
        let text = format_timestamp(MARCH_1_8AM + 59.9, TimestampFormat::SpaceMinutes).unwrap();
        assert_eq!(text, "2022-03-01 08:00");
    }

    #[test]
    fn format_rejects_non_finite_seconds() {
        assert!(format_timestamp(f64::NAN, TimestampFormat::Iso).is_err());
        assert!(format_timestamp(f64::INFINITY, TimestampFormat::Iso).is_err());
    }

    #[test]
    fn sequences_normalize_element_wise() {
        let items = vec![
            Timelike::from("2022-03-01"),
            Timelike::from(12.5),
            Timelike::from("1970-01-01 00:01"),
        ];
        assert_eq!(normalize_seq(&items).unwrap(), vec![MARCH_1, 12.5, 60.0]);

        let bad = vec![Timelike::from(1.0), Timelike::from("nope")];
        assert!(normalize_seq(&bad).is_err());
    }

    #[test]
    fn datetimes_convert_with_subsecond_precision() {
        let dt: DateTime<Utc> = "2022-03-01T08:00:00.5Z".parse().unwrap();
        assert_eq!(normalize(&dt.into()).unwrap(), MARCH_1_8AM + 0.5);
    }

    #[test]
    fn mixed_pairs_become_ranges() {
        let range = ("2022-03-01", MARCH_1_8AM).to_time_range().unwrap();
        assert_eq!(range.start, MARCH_1);
        assert_eq!(range.end, MARCH_1_8AM);
    }
}
