//! Event writes guarded by HTTP preconditions.
//!
//! Creating sends `If-None-Match: *` so an existing resource is never
//! overwritten. Updating reads the resource, edits it in place and writes it
//! back with `If-Match: <etag>`, so a concurrent change surfaces as a
//! conflict instead of being lost. Neither path retries.

use std::fmt;

use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::alarm::{Reminder, UnitLabels, parse_reminders};
use crate::config::ServerConfig;
use crate::datetime::{
    DateTimeValue, TimezoneMode, encode_local, now_utc_wire, parse_local, reencode_like, shift_end,
};
use crate::dav::execute;
use crate::error::{CalDavError, CalDavResult, ConflictKind, check_status};
use crate::event::{
    CalendarEvent, EventStatus, attendee_line, parse_sequence, validate_email,
};
use crate::ics::{EventDraft, IcalDocument, escape_text, generate_ics, unescape_text};
use crate::timezone::TimezoneProvider;
use crate::transport::{DavRequest, Transport};

pub const UID_DOMAIN: &str = "caldav-core";

const DEFAULT_ALARM_TEXT: &str = "Reminder";

/// Input for [`create_event`]. Datetimes are local `YYYY-MM-DDTHH:MM:SS`
/// strings; reminders are ISO-8601 durations such as `PT15M`.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub calendar_id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub reminders: Vec<String>,
    /// Dates only; the end date is inclusive
    pub all_day: bool,
    pub timezone: TimezoneMode,
}

impl NewEvent {
    pub fn new(
        calendar_id: impl Into<String>,
        title: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        NewEvent {
            calendar_id: calendar_id.into(),
            title: title.into(),
            start: start.into(),
            end: end.into(),
            ..Default::default()
        }
    }

    fn validate(&self, uid: String) -> CalDavResult<EventDraft> {
        if self.calendar_id.trim().is_empty() {
            return Err(CalDavError::validation(
                "calendar",
                "a calendar id is required (list calendars to find one)",
            ));
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CalDavError::validation("title", "a title is required"));
        }

        let start = parse_local("start", &self.start)?;
        let end = parse_local("end", &self.end)?;
        if !self.all_day {
            self.timezone.validate()?;
        }
        let attendees = clean_attendees(&self.attendees)?;
        let reminders = parse_reminders(&self.reminders)?;

        let (start, end) = if self.all_day {
            require_date("start", Some(start))?;
            require_date("end", Some(end))?;
            if end.date() < start.date() {
                return Err(order_error(start, end));
            }
            // DTEND of a date-only event is exclusive
            let exclusive_end = end
                .date()
                .checked_add_days(Days::new(1))
                .ok_or_else(|| CalDavError::validation("end", "date out of range"))?;
            (DateTimeValue::Date(start.date()), DateTimeValue::Date(exclusive_end))
        } else {
            if start >= end {
                return Err(order_error(start, end));
            }
            (
                encode_local(start, false, &self.timezone),
                encode_local(end, false, &self.timezone),
            )
        };

        Ok(EventDraft {
            uid,
            title: title.to_string(),
            start,
            end,
            description: non_empty(self.description.as_deref()),
            location: non_empty(self.location.as_deref()),
            attendees,
            reminders,
        })
    }
}

/// Result of a successful [`create_event`].
#[derive(Debug, Clone, Serialize)]
pub struct CreatedEvent {
    pub uid: String,
    pub url: String,
    pub etag: Option<String>,
    pub event: CalendarEvent,
}

/// Create an event. Fails with a conflict if a resource already exists at
/// the generated URL.
#[tracing::instrument(skip_all, fields(calendar = %event.calendar_id))]
pub async fn create_event<T: Transport, Z: TimezoneProvider>(
    transport: &T,
    config: &ServerConfig,
    timezones: &Z,
    event: &NewEvent,
) -> CalDavResult<CreatedEvent> {
    let uid = format!("{}@{}", Uuid::new_v4(), UID_DOMAIN);
    let draft = event.validate(uid.clone())?;

    let document = generate_ics(&draft, &now_utc_wire(), timezones).to_string();
    let url = format!("{}{}.ics", config.collection_url(&event.calendar_id), uid);
    tracing::debug!(%uid, %url, "Creating event");

    let request = DavRequest::put_calendar(&url, document.as_str()).header("If-None-Match", "*");
    let response = execute(transport, config, request).await?;
    check_status(
        &response,
        &format!("Creating event in {}", event.calendar_id.trim()),
        ConflictKind::AlreadyExists,
    )?;

    let created = CalendarEvent::from_ics(&document, Some(url.clone()))?;
    tracing::info!(%uid, "Event created");

    Ok(CreatedEvent {
        uid,
        url,
        etag: response.etag(),
        event: created,
    })
}

/// Changes for [`update_event`]. `None` leaves a field alone; for attendees
/// and reminders `Some(vec![])` removes all of them.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<EventStatus>,
    pub attendees: Option<Vec<String>>,
    pub reminders: Option<Vec<String>>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.attendees.is_none()
            && self.reminders.is_none()
    }

    fn validate(&self) -> CalDavResult<ValidatedUpdate> {
        if self.is_empty() {
            return Err(CalDavError::validation(
                "update",
                "no changes given, set at least one field",
            ));
        }

        let title = match self.title.as_deref().map(str::trim) {
            Some("") => return Err(CalDavError::validation("title", "cannot be empty")),
            other => other.map(str::to_string),
        };
        let start = self.start.as_deref().map(|s| parse_local("start", s)).transpose()?;
        let end = self.end.as_deref().map(|s| parse_local("end", s)).transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(order_error(start, end));
            }
        }

        Ok(ValidatedUpdate {
            title,
            start,
            end,
            location: self.location.as_deref().map(|s| s.trim().to_string()),
            description: self.description.as_deref().map(|s| s.trim().to_string()),
            status: self.status,
            attendees: self.attendees.as_deref().map(clean_attendees).transpose()?,
            reminders: self.reminders.as_deref().map(parse_reminders).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct ValidatedUpdate {
    title: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    location: Option<String>,
    description: Option<String>,
    status: Option<EventStatus>,
    attendees: Option<Vec<String>>,
    reminders: Option<Vec<Reminder>>,
}

/// One applied change, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Title(String),
    Start(String),
    End(String),
    Location(String),
    Description(String),
    Status(EventStatus),
    Attendees(Vec<String>),
    Reminders(Vec<Reminder>),
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Title(title) => write!(f, "Title: \"{}\"", title),
            FieldChange::Start(start) => write!(f, "Start: {}", start),
            FieldChange::End(end) => write!(f, "End: {}", end),
            FieldChange::Location(location) => write!(f, "Location: \"{}\"", location),
            FieldChange::Description(description) => {
                let short: String = description.chars().take(50).collect();
                if short.len() < description.len() {
                    write!(f, "Description: \"{}...\"", short)
                } else {
                    write!(f, "Description: \"{}\"", short)
                }
            }
            FieldChange::Status(status) => write!(f, "Status: {}", status),
            FieldChange::Attendees(emails) if emails.is_empty() => write!(f, "Attendees: removed"),
            FieldChange::Attendees(emails) => write!(f, "Attendees: {}", emails.join(", ")),
            FieldChange::Reminders(reminders) if reminders.is_empty() => {
                write!(f, "Reminders: removed")
            }
            FieldChange::Reminders(reminders) => {
                let labels = UnitLabels::default();
                let texts: Vec<String> = reminders.iter().map(|r| r.to_text(&labels)).collect();
                write!(f, "Reminders: {} ({})", reminders.len(), texts.join(", "))
            }
        }
    }
}

/// Result of a successful [`update_event`].
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedEvent {
    pub url: String,
    pub changes: Vec<FieldChange>,
    pub previous_sequence: u64,
    pub sequence: u64,
    /// ETag sent in `If-Match`, if the server provided one on read
    pub etag_used: Option<String>,
    /// ETag of the written resource, if the server returned one
    pub etag: Option<String>,
}

/// Update an event in place.
///
/// Fetches the resource, applies the requested changes to its first VEVENT,
/// bumps SEQUENCE and refreshes DTSTAMP/LAST-MODIFIED, then writes it back
/// with `If-Match` when the read returned an ETag. Content the update does
/// not touch is written back byte-for-byte.
#[tracing::instrument(skip_all, fields(url = %event_url.trim()))]
pub async fn update_event<T: Transport>(
    transport: &T,
    config: &ServerConfig,
    event_url: &str,
    update: &EventUpdate,
) -> CalDavResult<UpdatedEvent> {
    let validated = update.validate()?;
    let url = resolve_event_url(config, event_url)?;

    let response = execute(transport, config, DavRequest::get(&url)).await?;
    check_status(&response, "Fetching event", ConflictKind::Modified)?;
    let etag = response.etag();
    if etag.is_none() {
        tracing::warn!("Server returned no ETag, writing without If-Match");
    }

    let mut document = IcalDocument::parse(&response.text);
    let applied = apply_update(&mut document, &validated, &now_utc_wire())?;

    let mut request = DavRequest::put_calendar(&url, document.to_string());
    if let Some(etag) = &etag {
        request = request.header("If-Match", etag.as_str());
    }
    let put = execute(transport, config, request).await?;
    check_status(&put, "Saving event", ConflictKind::Modified)?;

    tracing::info!(
        changes = applied.changes.len(),
        sequence = applied.sequence,
        "Event updated"
    );

    Ok(UpdatedEvent {
        url,
        changes: applied.changes,
        previous_sequence: applied.previous_sequence,
        sequence: applied.sequence,
        etag_used: etag,
        etag: put.etag(),
    })
}

/// Absolute event URL, which must live on the configured server.
fn resolve_event_url(config: &ServerConfig, event_url: &str) -> CalDavResult<String> {
    let event_url = event_url.trim();
    if event_url.is_empty() {
        return Err(CalDavError::validation(
            "event_url",
            "an event URL is required (search events to find one)",
        ));
    }
    let url = config.url_for(event_url);
    if !config.owns_url(&url) {
        return Err(CalDavError::validation(
            "event_url",
            format!("{} does not belong to the configured server {}", url, config.base_url()),
        ));
    }
    Ok(url)
}

struct AppliedUpdate {
    changes: Vec<FieldChange>,
    previous_sequence: u64,
    sequence: u64,
}

fn apply_update(
    document: &mut IcalDocument,
    update: &ValidatedUpdate,
    now: &str,
) -> CalDavResult<AppliedUpdate> {
    let vevent = document
        .block("VEVENT")
        .ok_or_else(|| CalDavError::Parse("no VEVENT in event resource".to_string()))?;
    let old_title = vevent.property("SUMMARY").map(|p| unescape_text(&p.value));
    let old_start = vevent
        .get_property("DTSTART")
        .and_then(|v| DateTimeValue::decode(&v));
    let old_end = vevent
        .get_property("DTEND")
        .and_then(|v| DateTimeValue::decode(&v));
    let previous_sequence = parse_sequence(vevent.property("SEQUENCE"))?;
    let sequence = previous_sequence.checked_add(1).ok_or_else(|| {
        CalDavError::Parse(format!("SEQUENCE {} cannot be incremented", previous_sequence))
    })?;

    let date_only = old_start.as_ref().is_some_and(DateTimeValue::is_date_only);
    if date_only {
        require_date("start", update.start)?;
        require_date("end", update.end)?;
    }

    let new_end = match (update.start, update.end) {
        // the given end of an all-day event is its last day, DTEND is exclusive
        (_, Some(end)) if date_only => Some(next_day(end)?),
        (_, Some(end)) => Some(end),
        (Some(start), None) => match (&old_start, &old_end) {
            (Some(old_start), Some(old_end)) => Some(shift_end(old_start, old_end, start)),
            _ => None,
        },
        (None, None) => None,
    };

    if update.start.is_some() || new_end.is_some() {
        let start = update.start.or(old_start.as_ref().map(DateTimeValue::naive));
        let end = new_end.or(old_end.as_ref().map(DateTimeValue::naive));
        if let (Some(start), Some(end)) = (start, end) {
            let ordered = if date_only {
                start.date() < end.date()
            } else {
                start < end
            };
            if !ordered {
                let shown_end = if date_only { previous_day(end) } else { end };
                return Err(order_error(start, shown_end));
            }
        }
    }

    let mut changes = Vec::new();

    if let Some(title) = &update.title {
        document.set_property("VEVENT", "SUMMARY", &escape_text(title))?;
        changes.push(FieldChange::Title(title.clone()));
    }
    if let Some(start) = update.start {
        document.set_property("VEVENT", "DTSTART", &reencode_like(start, old_start.as_ref()))?;
        changes.push(FieldChange::Start(display_change(start, date_only)));
    }
    if let Some(end) = new_end {
        match (&old_end, &old_start) {
            (Some(old_end), _) => {
                document.set_property("VEVENT", "DTEND", &reencode_like(end, Some(old_end)))?;
            }
            // no DTEND to copy the shape from, the start's shape decides
            (None, Some(old_start)) => {
                let line = old_start.with_naive(end).to_wire().to_line("DTEND");
                document.replace_property_line("VEVENT", "DTEND", &line)?;
            }
            (None, None) => {
                let line = DateTimeValue::Floating(end).to_wire().to_line("DTEND");
                document.replace_property_line("VEVENT", "DTEND", &line)?;
            }
        }
        // DTEND and DURATION are mutually exclusive
        if document.remove_property("VEVENT", "DURATION")? > 0 {
            tracing::debug!("Replaced DURATION with DTEND");
        }
        let shown = if date_only { previous_day(end) } else { end };
        changes.push(FieldChange::End(display_change(shown, date_only)));
    }
    if let Some(location) = &update.location {
        document.set_property("VEVENT", "LOCATION", &escape_text(location))?;
        changes.push(FieldChange::Location(location.clone()));
    }
    if let Some(description) = &update.description {
        document.set_property("VEVENT", "DESCRIPTION", &escape_text(description))?;
        changes.push(FieldChange::Description(description.clone()));
    }
    if let Some(status) = update.status {
        document.set_property("VEVENT", "STATUS", status.as_str())?;
        changes.push(FieldChange::Status(status));
    }
    if let Some(attendees) = &update.attendees {
        document.remove_all_properties("ATTENDEE");
        document.insert_before_end("VEVENT", attendees.iter().map(|email| attendee_line(email)))?;
        changes.push(FieldChange::Attendees(attendees.clone()));
    }
    if let Some(reminders) = &update.reminders {
        document.remove_all_blocks("VALARM");
        let alarm_text = update
            .title
            .as_deref()
            .or(old_title.as_deref())
            .unwrap_or(DEFAULT_ALARM_TEXT);
        let lines: Vec<String> = reminders
            .iter()
            .flat_map(|reminder| reminder.valarm_lines(alarm_text))
            .collect();
        document.insert_before_end("VEVENT", lines)?;
        changes.push(FieldChange::Reminders(reminders.clone()));
    }

    document.set_property("VEVENT", "SEQUENCE", &sequence.to_string())?;
    document.set_property("VEVENT", "LAST-MODIFIED", now)?;
    document.set_property("VEVENT", "DTSTAMP", now)?;

    Ok(AppliedUpdate {
        changes,
        previous_sequence,
        sequence,
    })
}

/// All-day events take dates; a time of day would be dropped on write.
fn require_date(field: &str, value: Option<NaiveDateTime>) -> CalDavResult<()> {
    match value {
        Some(value) if value.time() != NaiveTime::MIN => Err(CalDavError::validation(
            field,
            format!(
                "the event is all-day, give a date (YYYY-MM-DD) instead of {}",
                display_local(value)
            ),
        )),
        _ => Ok(()),
    }
}

fn next_day(value: NaiveDateTime) -> CalDavResult<NaiveDateTime> {
    value
        .date()
        .checked_add_days(Days::new(1))
        .map(|date| date.and_time(NaiveTime::MIN))
        .ok_or_else(|| CalDavError::validation("end", "date out of range"))
}

fn previous_day(value: NaiveDateTime) -> NaiveDateTime {
    value.checked_sub_days(Days::new(1)).unwrap_or(value)
}

fn clean_attendees(attendees: &[String]) -> CalDavResult<Vec<String>> {
    attendees
        .iter()
        .map(|email| email.trim())
        .filter(|email| !email.is_empty())
        .map(|email| validate_email(email).map(|_| email.to_string()))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn display_local(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn display_change(value: NaiveDateTime, date_only: bool) -> String {
    if date_only {
        value.format("%Y-%m-%d").to_string()
    } else {
        display_local(value)
    }
}

fn order_error(start: NaiveDateTime, end: NaiveDateTime) -> CalDavError {
    CalDavError::validation(
        "end",
        format!(
            "start ({}) must be before end ({})",
            display_local(start),
            display_local(end)
        ),
    )
}
