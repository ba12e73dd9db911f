//! Event records read from calendar resources.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::alarm::Reminder;
use crate::datetime::DateTimeValue;
use crate::error::{CalDavError, CalDavResult};
use crate::ics::{IcalDocument, Property, unescape_text};

pub const UNTITLED: &str = "(No title)";

/// A VEVENT as seen by callers.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    pub start: Option<DateTimeValue>,
    pub end: Option<DateTimeValue>,
    pub location: Option<String>,
    /// Unescaped DESCRIPTION text
    pub description: Option<String>,
    pub status: EventStatus,
    /// Revision counter (SEQUENCE), 0 when absent
    pub sequence: u64,
    pub all_day: bool,
    /// Derived from the presence of an RRULE
    pub is_recurring: bool,
    pub alarms: Vec<Reminder>,
    /// Attendee email addresses, without `mailto:`
    pub attendees: Vec<String>,
    /// Where the resource lives on the server
    pub source_url: Option<String>,
}

impl CalendarEvent {
    /// Read the first VEVENT of a calendar resource.
    ///
    /// Further VEVENTs (recurrence overrides sharing the UID) are ignored.
    pub fn from_ics(ics: &str, source_url: Option<String>) -> CalDavResult<Self> {
        let doc = IcalDocument::parse(ics);
        let vevents = doc.blocks("VEVENT");
        let Some(vevent) = vevents.first() else {
            return Err(CalDavError::Parse("no VEVENT in calendar data".to_string()));
        };
        if vevents.len() > 1 {
            tracing::debug!(
                count = vevents.len(),
                url = source_url.as_deref().unwrap_or(""),
                "Calendar resource holds several VEVENTs, reading only the first"
            );
        }

        let uid = vevent
            .get_property("UID")
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| CalDavError::Parse("VEVENT without UID".to_string()))?;

        let text = |name: &str| {
            vevent
                .property(name)
                .map(|p| unescape_text(&p.value))
                .filter(|v| !v.trim().is_empty())
        };

        let start = vevent
            .get_property("DTSTART")
            .and_then(|v| DateTimeValue::decode(&v));
        let end = vevent
            .get_property("DTEND")
            .and_then(|v| DateTimeValue::decode(&v));

        let status = match vevent.property("STATUS") {
            Some(p) => p.value.parse().unwrap_or_else(|_| {
                tracing::debug!(status = %p.value, "Unknown STATUS, treating as CONFIRMED");
                EventStatus::Confirmed
            }),
            None => EventStatus::Confirmed,
        };

        let sequence = parse_sequence(vevent.property("SEQUENCE"))?;

        let alarms = vevent
            .blocks("VALARM")
            .iter()
            .filter_map(|alarm| alarm.property("TRIGGER"))
            .filter_map(|trigger| Reminder::from_trigger(&trigger.value))
            .collect();

        let attendees = vevent
            .properties("ATTENDEE")
            .into_iter()
            .map(|p| strip_mailto(&p.value).to_string())
            .filter(|email| !email.is_empty())
            .collect();

        Ok(CalendarEvent {
            uid,
            title: text("SUMMARY").unwrap_or_else(|| UNTITLED.to_string()),
            all_day: start.as_ref().is_some_and(DateTimeValue::is_date_only),
            start,
            end,
            location: text("LOCATION"),
            description: text("DESCRIPTION"),
            status,
            sequence,
            is_recurring: vevent.property("RRULE").is_some(),
            alarms,
            attendees,
            source_url,
        })
    }
}

fn strip_mailto(value: &str) -> &str {
    let value = value.trim();
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => &value[7..],
        _ => value,
    }
}

/// SEQUENCE value, 0 when the property is absent.
pub(crate) fn parse_sequence(property: Option<Property>) -> CalDavResult<u64> {
    match property {
        None => Ok(0),
        Some(p) => p
            .value
            .trim()
            .parse()
            .map_err(|_| CalDavError::Parse(format!("invalid SEQUENCE '{}'", p.value))),
    }
}

/// Validate an attendee address before it is written into an ATTENDEE line.
///
/// Whitespace, control characters and the iCalendar separators `;:,"`
/// are rejected so the address cannot break out of its line or parameter.
pub fn validate_email(email: &str) -> CalDavResult<()> {
    let invalid = |reason: &str| {
        CalDavError::validation(
            "attendees",
            format!("'{}' is not a valid email address ({})", email.escape_debug(), reason),
        )
    };

    if let Some(c) = email
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, ';' | ':' | ',' | '"'))
    {
        return Err(invalid(&format!("contains {:?}", c)));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid("missing '@'"));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid("expected local@domain"));
    }
    Ok(())
}

/// ATTENDEE line for an invitation.
pub fn attendee_line(email: &str) -> String {
    format!("ATTENDEE;CN={};RSVP=TRUE:mailto:{}", email, email)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for EventStatus {
    type Err = CalDavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Ok(EventStatus::Confirmed),
            "TENTATIVE" => Ok(EventStatus::Tentative),
            "CANCELLED" => Ok(EventStatus::Cancelled),
            _ => Err(CalDavError::validation(
                "status",
                format!("'{}' is not one of CONFIRMED, TENTATIVE, CANCELLED", s.trim()),
            )),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTimeMode;

    const EVENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:evt-1@example.com\r\n\
DTSTART;TZID=Europe/Berlin:20250601T100000\r\n\
DTEND;TZID=Europe/Berlin:20250601T113000\r\n\
SUMMARY:Review\\, part 2\r\n\
LOCATION:Room 1\\; east wing\r\n\
DESCRIPTION:Line one\\nLine two\r\n\
STATUS:tentative\r\n\
SEQUENCE:4\r\n\
RRULE:FREQ=WEEKLY\r\n\
ATTENDEE;CN=Jane:MAILTO:jane@example.com\r\n\
ATTENDEE:mailto:bob@example.com\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER;RELATED=END:PT5M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn reads_all_fields() {
        let event = CalendarEvent::from_ics(EVENT, Some("/cal/evt-1.ics".into())).unwrap();
        assert_eq!(event.uid, "evt-1@example.com");
        assert_eq!(event.title, "Review, part 2");
        assert_eq!(event.location.as_deref(), Some("Room 1; east wing"));
        assert_eq!(event.description.as_deref(), Some("Line one\nLine two"));
        assert_eq!(event.status, EventStatus::Tentative);
        assert_eq!(event.sequence, 4);
        assert!(event.is_recurring);
        assert!(!event.all_day);
        assert_eq!(
            event.start.as_ref().map(|s| s.mode()),
            Some(DateTimeMode::Zoned("Europe/Berlin".into()))
        );
        assert_eq!(event.alarms, vec![Reminder::minutes(15)]);
        assert_eq!(event.attendees, vec!["jane@example.com", "bob@example.com"]);
    }

    #[test]
    fn defaults_for_missing_fields() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:x\r\nDTSTART;VALUE=DATE:20250601\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let event = CalendarEvent::from_ics(ics, None).unwrap();
        assert_eq!(event.title, UNTITLED);
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.sequence, 0);
        assert!(event.all_day);
        assert!(event.end.is_none());
        assert!(!event.is_recurring);
    }

    #[test]
    fn large_sequence_is_kept() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:x\r\nSEQUENCE:5000000000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let event = CalendarEvent::from_ics(ics, None).unwrap();
        assert_eq!(event.sequence, 5_000_000_000);
    }

    #[test]
    fn unparsable_sequence_is_a_parse_error() {
        for value in ["abc", "-1", "18446744073709551616"] {
            let ics = format!(
                "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:x\r\nSEQUENCE:{value}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
            );
            assert!(
                matches!(CalendarEvent::from_ics(&ics, None), Err(CalDavError::Parse(_))),
                "SEQUENCE:{value} was accepted"
            );
        }
    }

    #[test]
    fn missing_uid_or_vevent_is_a_parse_error() {
        let no_uid = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:x\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert!(matches!(
            CalendarEvent::from_ics(no_uid, None),
            Err(CalDavError::Parse(_))
        ));
        let no_event = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:1\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        assert!(CalendarEvent::from_ics(no_event, None).is_err());
    }

    #[test]
    fn status_parsing() {
        assert_eq!("cancelled".parse::<EventStatus>().unwrap(), EventStatus::Cancelled);
        assert!("DONE".parse::<EventStatus>().is_err());
        assert_eq!(
            serde_json::to_value(EventStatus::Tentative).unwrap(),
            serde_json::json!("TENTATIVE")
        );
    }

    #[test]
    fn attendee_helpers() {
        assert!(validate_email("a@b.c").is_ok());
        assert!(validate_email("nobody").is_err());
        for bad in [
            "a@b.c\r\nX-INJECTED:1",
            "a@b.c;ROLE=CHAIR",
            "a@b.c:x",
            "a@b.c,b@c.d",
            "\"a\"@b.c",
            "a b@c.d",
            "@b.c",
            "a@",
            "a@b@c",
        ] {
            assert!(validate_email(bad).is_err(), "{bad:?} was accepted");
        }
        assert_eq!(
            attendee_line("a@b.c"),
            "ATTENDEE;CN=a@b.c;RSVP=TRUE:mailto:a@b.c"
        );
    }
}
