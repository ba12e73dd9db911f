//! Conversion between user-facing local datetimes and the four iCalendar
//! wire shapes: date-only, UTC, floating and zoned.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{CalDavError, CalDavResult};

const WIRE_DATE: &str = "%Y%m%d";
const WIRE_DATETIME: &str = "%Y%m%dT%H%M%S";

/// How a new event's datetimes are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimezoneMode {
    /// `YYYYMMDDTHHMMSSZ`
    #[default]
    Utc,
    /// `YYYYMMDDTHHMMSS`, no zone: the same wall-clock time everywhere.
    Floating,
    /// `TZID=<zone>:YYYYMMDDTHHMMSS`
    Zoned(String),
}

impl TimezoneMode {
    /// Zoned modes must name a known IANA zone.
    pub fn validate(&self) -> CalDavResult<()> {
        match self {
            TimezoneMode::Zoned(tzid) => validate_tzid(tzid),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TimezoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimezoneMode::Utc => write!(f, "UTC"),
            TimezoneMode::Floating => write!(f, "floating (local time)"),
            TimezoneMode::Zoned(tzid) => write!(f, "{}", tzid),
        }
    }
}

pub fn validate_tzid(tzid: &str) -> CalDavResult<()> {
    tzid.parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| CalDavError::validation("timezone", format!("unknown timezone '{}'", tzid)))
}

/// The mode of a decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeMode {
    DateOnly,
    Utc,
    Floating,
    Zoned(String),
}

/// A DTSTART/DTEND value together with its mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeValue {
    Date(NaiveDate),
    Utc(NaiveDateTime),
    Floating(NaiveDateTime),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

/// Parameter segment (without leading `;`) and value of a datetime property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDateTime {
    pub params: String,
    pub value: String,
}

impl WireDateTime {
    /// Full content line, e.g. `DTSTART;TZID=Europe/Berlin:20250601T100000`.
    pub fn to_line(&self, name: &str) -> String {
        if self.params.is_empty() {
            format!("{}:{}", name, self.value)
        } else {
            format!("{};{}:{}", name, self.params, self.value)
        }
    }
}

impl DateTimeValue {
    pub fn mode(&self) -> DateTimeMode {
        match self {
            DateTimeValue::Date(_) => DateTimeMode::DateOnly,
            DateTimeValue::Utc(_) => DateTimeMode::Utc,
            DateTimeValue::Floating(_) => DateTimeMode::Floating,
            DateTimeValue::Zoned { tzid, .. } => DateTimeMode::Zoned(tzid.clone()),
        }
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, DateTimeValue::Date(_))
    }

    /// Wall-clock value; dates are taken at midnight.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            DateTimeValue::Date(date) => date.and_time(NaiveTime::MIN),
            DateTimeValue::Utc(dt) | DateTimeValue::Floating(dt) => *dt,
            DateTimeValue::Zoned { datetime, .. } => *datetime,
        }
    }

    /// A new value in the same shape (and zone) as this one.
    pub fn with_naive(&self, local: NaiveDateTime) -> DateTimeValue {
        match self {
            DateTimeValue::Date(_) => DateTimeValue::Date(local.date()),
            DateTimeValue::Utc(_) => DateTimeValue::Utc(local),
            DateTimeValue::Floating(_) => DateTimeValue::Floating(local),
            DateTimeValue::Zoned { tzid, .. } => DateTimeValue::Zoned {
                datetime: local,
                tzid: tzid.clone(),
            },
        }
    }

    /// Decode a property as returned by `get_property`: an optional
    /// `TZID=`/`VALUE=` prefix up to the last colon, then the value.
    ///
    /// Returns `None` for shapes outside the four supported ones.
    pub fn decode(wire: &str) -> Option<Self> {
        let wire = wire.trim();
        let (params, value) = match wire.rfind(':') {
            Some(idx) => (&wire[..idx], wire[idx + 1..].trim()),
            None => ("", wire),
        };

        if value.len() == 8 {
            return NaiveDate::parse_from_str(value, WIRE_DATE)
                .ok()
                .map(DateTimeValue::Date);
        }

        if value.len() < 15 || !value.contains('T') {
            return None;
        }
        let datetime = NaiveDateTime::parse_from_str(value.get(..15)?, WIRE_DATETIME).ok()?;

        if value.ends_with('Z') {
            return Some(DateTimeValue::Utc(datetime));
        }

        let tzid = params.split(';').find_map(|segment| {
            let (key, val) = segment.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("TZID")
                .then(|| val.trim().trim_matches('"').to_string())
        });

        Some(match tzid {
            Some(tzid) => DateTimeValue::Zoned { datetime, tzid },
            None => DateTimeValue::Floating(datetime),
        })
    }

    pub fn to_wire(&self) -> WireDateTime {
        match self {
            DateTimeValue::Date(date) => WireDateTime {
                params: "VALUE=DATE".to_string(),
                value: date.format(WIRE_DATE).to_string(),
            },
            DateTimeValue::Utc(dt) => WireDateTime {
                params: String::new(),
                value: format!("{}Z", dt.format(WIRE_DATETIME)),
            },
            DateTimeValue::Floating(dt) => WireDateTime {
                params: String::new(),
                value: dt.format(WIRE_DATETIME).to_string(),
            },
            DateTimeValue::Zoned { datetime, tzid } => WireDateTime {
                params: format!("TZID={}", tzid),
                value: datetime.format(WIRE_DATETIME).to_string(),
            },
        }
    }

    /// `YYYY-MM-DD` for dates, `YYYY-MM-DDTHH:MM:SS` otherwise.
    ///
    /// Lexicographic order of these strings matches chronological order for
    /// values of the same mode.
    pub fn display_string(&self) -> String {
        match self {
            DateTimeValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            other => other.naive().format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeValue::Utc(_) => write!(f, "{} UTC", self.display_string()),
            DateTimeValue::Zoned { tzid, .. } => write!(f, "{} ({})", self.display_string(), tzid),
            _ => write!(f, "{}", self.display_string()),
        }
    }
}

impl Serialize for DateTimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display_string())
    }
}

/// Parse user input: `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM` or
/// `YYYY-MM-DD` (midnight).
pub fn parse_local(field: &str, input: &str) -> CalDavResult<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CalDavError::validation(field, "a value is required"));
    }

    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| {
            CalDavError::validation(
                field,
                format!(
                    "'{}' is not a valid datetime, expected YYYY-MM-DDTHH:MM:SS (e.g. 2025-12-30T14:00:00)",
                    input
                ),
            )
        })
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(field: &str, input: &str) -> CalDavResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        CalDavError::validation(
            field,
            format!("'{}' is not a valid date, expected YYYY-MM-DD", input.trim()),
        )
    })
}

/// Encode a local datetime for a new event.
pub fn encode_local(local: NaiveDateTime, all_day: bool, mode: &TimezoneMode) -> DateTimeValue {
    if all_day {
        return DateTimeValue::Date(local.date());
    }
    match mode {
        TimezoneMode::Utc => DateTimeValue::Utc(local),
        TimezoneMode::Floating => DateTimeValue::Floating(local),
        TimezoneMode::Zoned(tzid) => DateTimeValue::Zoned {
            datetime: local,
            tzid: tzid.clone(),
        },
    }
}

/// Encode a replacement value in the shape of an existing one.
///
/// Only the value is produced; the existing parameter segment (TZID or
/// VALUE=DATE) stays on the line. Date-only values stay dates, UTC values
/// keep their trailing `Z`.
pub fn reencode_like(local: NaiveDateTime, existing: Option<&DateTimeValue>) -> String {
    match existing {
        Some(DateTimeValue::Date(_)) => local.date().format(WIRE_DATE).to_string(),
        Some(DateTimeValue::Utc(_)) => format!("{}Z", local.format(WIRE_DATETIME)),
        _ => local.format(WIRE_DATETIME).to_string(),
    }
}

/// New end for an event whose start moved: new start plus the absolute
/// distance between the old start and end.
///
/// Zoned values are shifted as naive wall-clock times, so a move across a
/// daylight-saving transition keeps the wall-clock length, not the elapsed
/// time.
pub fn shift_end(
    old_start: &DateTimeValue,
    old_end: &DateTimeValue,
    new_start: NaiveDateTime,
) -> NaiveDateTime {
    let duration: Duration = old_end.naive() - old_start.naive();
    if duration < Duration::zero() {
        new_start - duration
    } else {
        new_start + duration
    }
}

/// Current instant as a UTC wire value (DTSTAMP, LAST-MODIFIED).
pub fn now_utc_wire() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(s: &str) -> NaiveDateTime {
        parse_local("start", s).unwrap()
    }

    #[test]
    fn decodes_all_four_shapes() {
        assert_eq!(
            DateTimeValue::decode("VALUE=DATE:20250601"),
            Some(DateTimeValue::Date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()))
        );
        assert_eq!(
            DateTimeValue::decode("20250601T100000Z").map(|v| v.mode()),
            Some(DateTimeMode::Utc)
        );
        assert_eq!(
            DateTimeValue::decode("20250601T100000").map(|v| v.mode()),
            Some(DateTimeMode::Floating)
        );
        assert_eq!(
            DateTimeValue::decode("TZID=Europe/Berlin:20250601T100000").map(|v| v.mode()),
            Some(DateTimeMode::Zoned("Europe/Berlin".to_string()))
        );
        assert_eq!(DateTimeValue::decode("garbage"), None);
    }

    #[test]
    fn with_naive_keeps_zone_and_shape() {
        let at = local("2025-06-01T12:00:00");
        let zoned = DateTimeValue::decode("TZID=Europe/Berlin:20250601T100000").unwrap();
        assert_eq!(
            zoned.with_naive(at).to_wire().to_line("DTEND"),
            "DTEND;TZID=Europe/Berlin:20250601T120000"
        );
        let utc = DateTimeValue::decode("20250601T100000Z").unwrap();
        assert_eq!(utc.with_naive(at).to_wire().to_line("DTEND"), "DTEND:20250601T120000Z");
        let date = DateTimeValue::decode("VALUE=DATE:20250601").unwrap();
        assert_eq!(
            date.with_naive(at).to_wire().to_line("DTEND"),
            "DTEND;VALUE=DATE:20250601"
        );
    }

    #[test]
    fn encode_then_decode_preserves_mode_and_value() {
        let at = local("2025-06-01T10:30:00");
        let values = [
            encode_local(at, true, &TimezoneMode::Utc),
            encode_local(at, false, &TimezoneMode::Utc),
            encode_local(at, false, &TimezoneMode::Floating),
            encode_local(at, false, &TimezoneMode::Zoned("Asia/Tokyo".to_string())),
        ];
        for value in values {
            let wire = value.to_wire();
            let decoded = DateTimeValue::decode(&format!("{}:{}", wire.params, wire.value))
                .or_else(|| DateTimeValue::decode(&wire.value))
                .unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn wire_lines() {
        let at = local("2025-06-01T10:00:00");
        assert_eq!(
            encode_local(at, false, &TimezoneMode::Zoned("Europe/Berlin".into()))
                .to_wire()
                .to_line("DTSTART"),
            "DTSTART;TZID=Europe/Berlin:20250601T100000"
        );
        assert_eq!(
            encode_local(at, true, &TimezoneMode::Utc).to_wire().to_line("DTSTART"),
            "DTSTART;VALUE=DATE:20250601"
        );
        assert_eq!(
            encode_local(at, false, &TimezoneMode::Utc).to_wire().to_line("DTEND"),
            "DTEND:20250601T100000Z"
        );
    }

    #[test]
    fn start_only_change_keeps_duration_and_utc_marker() {
        let old_start = DateTimeValue::decode("20250601T100000Z").unwrap();
        let old_end = DateTimeValue::decode("20250601T110000Z").unwrap();
        let new_start = local("2025-06-03T15:00:00");

        let new_end = shift_end(&old_start, &old_end, new_start);
        assert_eq!(new_end, local("2025-06-03T16:00:00"));
        assert_eq!(reencode_like(new_end, Some(&old_end)), "20250603T160000Z");
    }

    #[test]
    fn floating_and_date_values_reencode_in_their_shape() {
        let floating = DateTimeValue::decode("20250601T100000").unwrap();
        let date = DateTimeValue::decode("VALUE=DATE:20250601").unwrap();
        let at = local("2025-07-04T08:00:00");
        assert_eq!(reencode_like(at, Some(&floating)), "20250704T080000");
        assert_eq!(reencode_like(at, Some(&date)), "20250704");
    }

    #[test]
    fn accepts_three_input_shapes() {
        assert_eq!(local("2025-06-01T10:00"), local("2025-06-01T10:00:00"));
        assert_eq!(local("2025-06-01"), local("2025-06-01T00:00:00"));
        assert!(parse_local("start", "01.06.2025").is_err());
        assert!(parse_local("start", "2025-02-30T10:00:00").is_err());
        assert!(parse_local("start", "").is_err());
    }

    #[test]
    fn display_strings_sort_chronologically() {
        let a = DateTimeValue::decode("20250601T090000Z").unwrap();
        let b = DateTimeValue::decode("20250601T100000Z").unwrap();
        assert!(a.display_string() < b.display_string());
        assert_eq!(a.display_string(), "2025-06-01T09:00:00");
    }

    #[test]
    fn validates_timezones() {
        assert!(TimezoneMode::Zoned("Europe/Berlin".into()).validate().is_ok());
        assert!(TimezoneMode::Zoned("Mars/Olympus".into()).validate().is_err());
        assert!(TimezoneMode::Floating.validate().is_ok());
    }

    #[test]
    fn now_is_utc_wire_shape() {
        let now = now_utc_wire();
        assert_eq!(now.len(), 16);
        assert!(now.ends_with('Z'));
        assert!(matches!(DateTimeValue::decode(&now), Some(DateTimeValue::Utc(_))));
    }
}
