//! iCalendar generation for new events.

use crate::alarm::Reminder;
use crate::datetime::DateTimeValue;
use crate::event::attendee_line;
use crate::timezone::TimezoneProvider;

use super::document::IcalDocument;
use super::escape::escape_text;

pub const PRODID: &str = "-//caldav-core//CalDAV Engine//EN";

/// A validated event ready to be written.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub uid: String,
    pub title: String,
    pub start: DateTimeValue,
    pub end: DateTimeValue,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub reminders: Vec<Reminder>,
}

/// Build the calendar resource for a new event (SEQUENCE 0, CONFIRMED).
///
/// Zoned events get a VTIMEZONE from `timezones` when one is known.
pub fn generate_ics(
    draft: &EventDraft,
    dtstamp: &str,
    timezones: &impl TimezoneProvider,
) -> IcalDocument {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".to_string(),
    ];

    if let DateTimeValue::Zoned { tzid, .. } = &draft.start {
        match timezones.vtimezone(tzid) {
            Some(definition) => lines.extend(definition),
            None => tracing::warn!(%tzid, "No VTIMEZONE definition available, writing TZID only"),
        }
    }

    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}", draft.uid));
    lines.push(format!("DTSTAMP:{}", dtstamp));
    lines.push(draft.start.to_wire().to_line("DTSTART"));
    lines.push(draft.end.to_wire().to_line("DTEND"));
    lines.push(format!("SUMMARY:{}", escape_text(&draft.title)));

    if let Some(description) = &draft.description {
        lines.push(format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(location) = &draft.location {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    lines.extend(draft.attendees.iter().map(|email| attendee_line(email)));

    lines.push("STATUS:CONFIRMED".to_string());
    lines.push("SEQUENCE:0".to_string());

    for reminder in &draft.reminders {
        lines.extend(reminder.valarm_lines(&draft.title));
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    IcalDocument::from_lines(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::{TimezoneMode, encode_local, parse_local};
    use crate::event::CalendarEvent;
    use crate::timezone::BuiltinTimezones;

    fn draft(mode: TimezoneMode) -> EventDraft {
        let start = parse_local("start", "2025-06-01T10:00:00").unwrap();
        let end = parse_local("end", "2025-06-01T11:00:00").unwrap();
        EventDraft {
            uid: "1234@caldav-core".to_string(),
            title: "Sync; weekly, team".to_string(),
            start: encode_local(start, false, &mode),
            end: encode_local(end, false, &mode),
            description: Some("Agenda:\n1. Status".to_string()),
            location: Some("Room 1".to_string()),
            attendees: vec!["a@example.com".to_string()],
            reminders: vec![Reminder::minutes(15)],
        }
    }

    #[test]
    fn generates_crlf_document_with_escaped_text() {
        let ics = generate_ics(&draft(TimezoneMode::Utc), "20250101T000000Z", &BuiltinTimezones)
            .to_string();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ics.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        assert!(!ics.replace("\r\n", "").contains('\n'));
        assert!(ics.contains("\r\nCALSCALE:GREGORIAN\r\n"));
        assert!(ics.contains("\r\nDTSTART:20250601T100000Z\r\n"));
        assert!(ics.contains("\r\nSUMMARY:Sync\\; weekly\\, team\r\n"));
        assert!(ics.contains("\r\nDESCRIPTION:Agenda:\\n1. Status\r\n"));
        assert!(ics.contains("\r\nATTENDEE;CN=a@example.com;RSVP=TRUE:mailto:a@example.com\r\n"));
        assert!(ics.contains("\r\nSTATUS:CONFIRMED\r\nSEQUENCE:0\r\n"));
        assert!(ics.contains("\r\nDESCRIPTION:Sync\\; weekly\\, team\r\nTRIGGER:-PT15M\r\n"));
        assert!(!ics.contains("VTIMEZONE"));
    }

    #[test]
    fn zoned_events_embed_vtimezone() {
        let ics = generate_ics(
            &draft(TimezoneMode::Zoned("Europe/Berlin".into())),
            "20250101T000000Z",
            &BuiltinTimezones,
        )
        .to_string();
        assert!(ics.contains("BEGIN:VTIMEZONE\r\nTZID:Europe/Berlin\r\n"));
        assert!(ics.contains("\r\nDTSTART;TZID=Europe/Berlin:20250601T100000\r\n"));
        assert!(ics.find("END:VTIMEZONE").unwrap() < ics.find("BEGIN:VEVENT").unwrap());
    }

    #[test]
    fn unknown_zone_writes_tzid_without_definition() {
        let ics = generate_ics(
            &draft(TimezoneMode::Zoned("Europe/Paris".into())),
            "20250101T000000Z",
            &BuiltinTimezones,
        )
        .to_string();
        assert!(!ics.contains("VTIMEZONE"));
        assert!(ics.contains("DTSTART;TZID=Europe/Paris:20250601T100000"));
    }

    #[test]
    fn generated_document_reads_back() {
        let ics = generate_ics(&draft(TimezoneMode::Floating), "20250101T000000Z", &BuiltinTimezones)
            .to_string();
        let event = CalendarEvent::from_ics(&ics, None).unwrap();
        assert_eq!(event.uid, "1234@caldav-core");
        assert_eq!(event.title, "Sync; weekly, team");
        assert_eq!(event.description.as_deref(), Some("Agenda:\n1. Status"));
        assert_eq!(event.sequence, 0);
        assert_eq!(event.alarms, vec![Reminder::minutes(15)]);
        assert_eq!(event.attendees, vec!["a@example.com"]);
    }

    #[test]
    fn long_lines_are_folded() {
        let mut long = draft(TimezoneMode::Utc);
        long.description = Some("word ".repeat(50));
        let ics = generate_ics(&long, "20250101T000000Z", &BuiltinTimezones).to_string();
        assert!(ics.split("\r\n").all(|line| line.len() <= 75));
        let event = CalendarEvent::from_ics(&ics, None).unwrap();
        assert_eq!(
            event.description.as_deref(),
            Some("word ".repeat(50).trim_end())
        );
    }
}
