use std::sync::LazyLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use regex::Regex;

use crate::errors::SnowflakeError;

// Timestamps arrive as "<epoch_seconds>.<9 fraction digits>"; only the first
// six fraction digits (microseconds) are significant, the trailing three are
// discarded. TIMESTAMP_TZ appends the UTC offset in minutes.
static EPOCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.(\d{6})\d{3}").unwrap());
static EPOCH_TZ_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d{6})\d{3}\s(\d{1,4})").unwrap());

/// The nine column types the statement API serializes to strings.
///
/// Every cell in a result row is a string (or null); the column's kind and
/// scale from the `rowType` metadata tell the client how to read it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Binary,
    Text,
    Boolean,
    Date,
    Fixed,
    Time,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,
}

impl ColumnKind {
    pub fn from_name(name: &str) -> Result<Self, SnowflakeError> {
        match name {
            "binary" => Ok(ColumnKind::Binary),
            "text" => Ok(ColumnKind::Text),
            "boolean" => Ok(ColumnKind::Boolean),
            "date" => Ok(ColumnKind::Date),
            "fixed" => Ok(ColumnKind::Fixed),
            "time" => Ok(ColumnKind::Time),
            "timestamp_ltz" => Ok(ColumnKind::TimestampLtz),
            "timestamp_ntz" => Ok(ColumnKind::TimestampNtz),
            "timestamp_tz" => Ok(ColumnKind::TimestampTz),
            other => Err(SnowflakeError::UnsupportedType(other.to_owned())),
        }
    }

    /// Decode one wire cell into a [`Cell`].
    ///
    /// A null cell decodes to [`Cell::Null`] for every kind. Unexpected
    /// values in a boolean or timestamp cell also decode to [`Cell::Null`]
    /// rather than failing: a single drifting cell should not abort an
    /// otherwise valid page.
    ///
    /// `scale` only matters for `fixed` columns, where it decides between an
    /// integer and a float; it comes from the column descriptor, never from
    /// the digits of the value itself.
    pub fn decode(self, value: Option<&str>, scale: Option<i64>) -> Cell {
        let Some(value) = value else {
            return Cell::Null;
        };
        match self {
            ColumnKind::Binary | ColumnKind::Text => Cell::Text(value.to_owned()),
            ColumnKind::Boolean => match value {
                "0" => Cell::Boolean(false),
                "1" => Cell::Boolean(true),
                _ => Cell::Null,
            },
            ColumnKind::Date => decode_date(value),
            ColumnKind::Fixed => decode_fixed(value, scale.unwrap_or(0)),
            ColumnKind::Time | ColumnKind::TimestampLtz | ColumnKind::TimestampNtz => {
                match parse_epoch_micros(value) {
                    Some(instant) => Cell::Timestamp(instant),
                    None => Cell::Null,
                }
            }
            ColumnKind::TimestampTz => decode_epoch_with_offset(value),
        }
    }
}

/// Day offset from 1970-01-01. Fractional offsets are applied as whole days.
fn decode_date(value: &str) -> Cell {
    let Ok(days) = value.parse::<f64>() else {
        return Cell::Null;
    };
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let delta = if days.is_finite() {
        Duration::try_days(days as i64)
    } else {
        None
    };
    match delta.and_then(|delta| epoch.checked_add_signed(delta)) {
        Some(date) => Cell::Date(date),
        None => Cell::Null,
    }
}

/// Decimal column. Scale zero reads as an integer (fractional digits
/// truncated), any other scale as a float, even when the string carries no
/// fraction.
fn decode_fixed(value: &str, scale: i64) -> Cell {
    if scale == 0 {
        if let Ok(number) = value.parse::<i64>() {
            return Cell::Int(number);
        }
        match value.parse::<f64>() {
            Ok(number) => Cell::Int(number as i64),
            Err(_) => Cell::Null,
        }
    } else {
        match value.parse::<f64>() {
            Ok(number) => Cell::Float(number),
            Err(_) => Cell::Null,
        }
    }
}

/// The shared fractional-seconds extraction for all timestamp kinds.
fn parse_epoch_micros(value: &str) -> Option<DateTime<Utc>> {
    let captures = EPOCH_PATTERN.captures(value)?;
    instant_from(&captures)
}

fn instant_from(captures: &regex::Captures<'_>) -> Option<DateTime<Utc>> {
    let seconds: i64 = captures[1].parse().ok()?;
    let micros: u32 = captures[2].parse().ok()?;
    DateTime::from_timestamp(seconds, micros * 1_000)
}

fn decode_epoch_with_offset(value: &str) -> Cell {
    let Some(captures) = EPOCH_TZ_PATTERN.captures(value) else {
        return Cell::Null;
    };
    let Some(instant) = instant_from(&captures) else {
        return Cell::Null;
    };
    let Ok(offset_minutes) = captures[3].parse::<i32>() else {
        return Cell::Null;
    };
    // Whole hours, with the minute remainder collapsed to offset % 2, so an
    // offset of 990 renders as +16:00. Kept as-is for wire compatibility.
    let offset_seconds = (offset_minutes / 60) * 3600 + (offset_minutes % 2) * 60;
    match FixedOffset::east_opt(offset_seconds) {
        Some(offset) => Cell::TimestampTz(instant.with_timezone(&offset)),
        None => Cell::Null,
    }
}

/// A decoded cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    /// A `time`, `timestamp_ltz` or `timestamp_ntz` cell; all three carry an
    /// instant in UTC on the wire.
    Timestamp(DateTime<Utc>),
    TimestampTz(DateTime<FixedOffset>),
}

impl From<Cell> for serde_json::Value {
    fn from(cell: Cell) -> Self {
        use serde_json::json;
        use Cell::*;
        match cell {
            Null => json!(null),
            Int(value) => json!(value),
            Float(value) => json!(value),
            Text(value) => json!(value),
            Boolean(value) => json!(value),
            Date(value) => json!(value),
            Timestamp(value) => json!(value),
            TimestampTz(value) => json!(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    const ALL_KINDS: [ColumnKind; 9] = [
        ColumnKind::Binary,
        ColumnKind::Text,
        ColumnKind::Boolean,
        ColumnKind::Date,
        ColumnKind::Fixed,
        ColumnKind::Time,
        ColumnKind::TimestampLtz,
        ColumnKind::TimestampNtz,
        ColumnKind::TimestampTz,
    ];

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(
            ColumnKind::from_name("real"),
            Err(SnowflakeError::UnsupportedType(name)) if name == "real"
        ));
        assert!(ColumnKind::from_name("timestamp_tz").is_ok());
    }

    #[test]
    fn null_decodes_to_null_for_every_kind() {
        for kind in ALL_KINDS {
            assert_eq!(kind.decode(None, None), Cell::Null);
            assert_eq!(kind.decode(None, Some(6)), Cell::Null);
        }
    }

    #[test]
    fn text_and_binary_pass_through() {
        assert_eq!(
            ColumnKind::Text.decode(Some("value1"), None),
            Cell::Text("value1".to_owned())
        );
        assert_eq!(
            ColumnKind::Binary.decode(Some("666f6f"), None),
            Cell::Text("666f6f".to_owned())
        );
    }

    #[test]
    fn boolean_accepts_only_zero_and_one() {
        assert_eq!(ColumnKind::Boolean.decode(Some("0"), None), Cell::Boolean(false));
        assert_eq!(ColumnKind::Boolean.decode(Some("1"), None), Cell::Boolean(true));
        assert_eq!(ColumnKind::Boolean.decode(Some("2"), None), Cell::Null);
        assert_eq!(ColumnKind::Boolean.decode(Some("true"), None), Cell::Null);
    }

    #[test]
    fn date_is_a_day_offset_from_the_epoch() {
        assert_eq!(ColumnKind::Date.decode(Some("0"), None), Cell::Date(date(1970, 1, 1)));
        assert_eq!(ColumnKind::Date.decode(Some("1"), None), Cell::Date(date(1970, 1, 2)));
        assert_eq!(
            ColumnKind::Date.decode(Some("18000"), None),
            Cell::Date(date(2019, 4, 14))
        );
    }

    #[test]
    fn fractional_date_offsets_use_whole_days() {
        assert_eq!(
            ColumnKind::Date.decode(Some("18000.75"), None),
            Cell::Date(date(2019, 4, 14))
        );
    }

    #[test]
    fn fixed_scale_zero_is_an_integer() {
        assert_eq!(ColumnKind::Fixed.decode(Some("12345"), Some(0)), Cell::Int(12345));
        assert_eq!(
            ColumnKind::Fixed.decode(Some("12345.1234567890"), Some(0)),
            Cell::Int(12345)
        );
    }

    #[test]
    fn fixed_nonzero_scale_is_a_float_even_without_a_fraction() {
        assert_eq!(
            ColumnKind::Fixed.decode(Some("12345"), Some(6)),
            Cell::Float(12345.0)
        );
        assert_eq!(
            ColumnKind::Fixed.decode(Some("12345.1234567890"), Some(6)),
            Cell::Float(12345.123456789)
        );
    }

    #[test]
    fn timestamps_keep_microseconds_and_drop_the_rest() {
        let expected = "2021-03-19T17:06:59Z".parse::<DateTime<Utc>>().unwrap();
        for kind in [ColumnKind::Time, ColumnKind::TimestampLtz, ColumnKind::TimestampNtz] {
            assert_eq!(
                kind.decode(Some("1616173619.000000000"), None),
                Cell::Timestamp(expected)
            );
        }

        let Cell::Timestamp(instant) =
            ColumnKind::TimestampNtz.decode(Some("1616173619.123456789"), None)
        else {
            panic!("expected a timestamp");
        };
        // Truncated to microseconds, not rounded and not preserved.
        assert_eq!(instant.nanosecond(), 123_456_000);
        assert_eq!(
            instant,
            "2021-03-19T17:06:59.123456Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn timestamp_without_fraction_digits_is_null() {
        assert_eq!(
            ColumnKind::TimestampNtz.decode(Some("1616173619000000000"), None),
            Cell::Null
        );
        assert_eq!(ColumnKind::Time.decode(Some("not-a-timestamp"), None), Cell::Null);
    }

    #[test]
    fn timestamp_tz_renders_in_the_reported_offset() {
        let utc_instant = "2021-03-19T17:06:59Z".parse::<DateTime<Utc>>().unwrap();

        let Cell::TimestampTz(value) =
            ColumnKind::TimestampTz.decode(Some("1616173619.000000000 60"), None)
        else {
            panic!("expected a timestamp");
        };
        assert_eq!(value, utc_instant);
        assert_eq!(value.offset(), &FixedOffset::east_opt(3600).unwrap());

        let Cell::TimestampTz(value) =
            ColumnKind::TimestampTz.decode(Some("1616173619.123456789 0"), None)
        else {
            panic!("expected a timestamp");
        };
        assert_eq!(
            value,
            "2021-03-19T17:06:59.123456Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(value.offset(), &FixedOffset::east_opt(0).unwrap());
    }

    #[test]
    fn timestamp_tz_minute_offsets_collapse_to_whole_hours() {
        // 990 minutes is +16:30 on a real clock, but the offset arithmetic
        // keeps floor(990 / 60) hours plus 990 % 2 minutes.
        let Cell::TimestampTz(value) =
            ColumnKind::TimestampTz.decode(Some("1616173619.000000000 990"), None)
        else {
            panic!("expected a timestamp");
        };
        assert_eq!(value, "2021-03-19T17:06:59Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(value.offset(), &FixedOffset::east_opt(16 * 3600).unwrap());

        let Cell::TimestampTz(value) =
            ColumnKind::TimestampTz.decode(Some("1616173619.000000000 30"), None)
        else {
            panic!("expected a timestamp");
        };
        assert_eq!(value.offset(), &FixedOffset::east_opt(0).unwrap());
    }

    #[test]
    fn timestamp_tz_without_an_offset_group_is_null() {
        assert_eq!(
            ColumnKind::TimestampTz.decode(Some("1616173619.000000000"), None),
            Cell::Null
        );
        assert_eq!(
            ColumnKind::TimestampTz.decode(Some("1616173619000000000"), None),
            Cell::Null
        );
    }
}
