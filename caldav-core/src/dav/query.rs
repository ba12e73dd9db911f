//! Time-range event search via calendar-query REPORT.

use chrono::{Days, Local, NaiveDate};

use super::{execute, xml};
use crate::config::ServerConfig;
use crate::error::{CalDavError, CalDavResult, ConflictKind, check_status};
use crate::event::CalendarEvent;
use crate::transport::{DavRequest, Transport};

pub const DEFAULT_MAX_RESULTS: usize = 50;
pub const DEFAULT_RANGE_DAYS: u64 = 30;

/// Longest description kept after HTML cleanup.
const MAX_CLEAN_DESCRIPTION_CHARS: usize = 800;

/// Search parameters. Dates are inclusive.
#[derive(Debug, Clone)]
pub struct EventQuery {
    /// Server-relative path of the calendar collection
    pub calendar_id: String,
    /// Defaults to today
    pub start: Option<NaiveDate>,
    /// Defaults to `start` + 30 days
    pub end: Option<NaiveDate>,
    /// Case-insensitive substring of title, description or location
    pub text: Option<String>,
    pub max_results: usize,
    /// Convert HTML descriptions to plain text
    pub clean_html: bool,
}

impl EventQuery {
    pub fn new(calendar_id: impl Into<String>) -> Self {
        EventQuery {
            calendar_id: calendar_id.into(),
            start: None,
            end: None,
            text: None,
            max_results: DEFAULT_MAX_RESULTS,
            clean_html: true,
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Inclusive date range after applying defaults.
    pub fn resolve_range(&self, today: NaiveDate) -> CalDavResult<(NaiveDate, NaiveDate)> {
        let start = self.start.unwrap_or(today);
        let end = match self.end {
            Some(end) => end,
            None => start
                .checked_add_days(Days::new(DEFAULT_RANGE_DAYS))
                .ok_or_else(|| CalDavError::validation("start", "date out of range"))?,
        };
        if end < start {
            return Err(CalDavError::validation(
                "end",
                format!("end date {} is before start date {}", end, start),
            ));
        }
        Ok((start, end))
    }

    fn validate(&self) -> CalDavResult<()> {
        if self.calendar_id.trim().is_empty() {
            return Err(CalDavError::validation(
                "calendar",
                "a calendar id is required (list calendars to find one)",
            ));
        }
        if self.max_results == 0 {
            return Err(CalDavError::validation("max_results", "must be at least 1"));
        }
        Ok(())
    }

    fn matches(&self, event: &CalendarEvent) -> bool {
        let Some(needle) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));

        contains(Some(&event.title))
            || contains(event.description.as_deref())
            || contains(event.location.as_deref())
    }
}

/// calendar-query body for VEVENTs overlapping the inclusive date range.
///
/// CalDAV time ranges exclude their end, so the end date is advanced by one
/// day to include events on the last day.
pub fn build_report_body(start: NaiveDate, end_inclusive: NaiveDate) -> CalDavResult<String> {
    let end = end_inclusive
        .checked_add_days(Days::new(1))
        .ok_or_else(|| CalDavError::validation("end", "date out of range"))?;

    Ok(format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:getetag />
    <c:calendar-data />
  </d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR">
      <c:comp-filter name="VEVENT">
        <c:time-range start="{}T000000Z" end="{}T000000Z"/>
      </c:comp-filter>
    </c:comp-filter>
  </c:filter>
</c:calendar-query>"#,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    ))
}

/// Find events in a calendar, sorted by start. Events without a start come
/// last.
#[tracing::instrument(skip_all, fields(calendar = %query.calendar_id))]
pub async fn search_events<T: Transport>(
    transport: &T,
    config: &ServerConfig,
    query: &EventQuery,
) -> CalDavResult<Vec<CalendarEvent>> {
    query.validate()?;
    let (start, end) = query.resolve_range(Local::now().date_naive())?;
    tracing::debug!(%start, %end, "Searching events");

    let url = config.collection_url(&query.calendar_id);
    let request = DavRequest::report(url, build_report_body(start, end)?);
    let response = execute(transport, config, request).await?;
    check_status(
        &response,
        &format!("Event search in {}", query.calendar_id.trim()),
        ConflictKind::Modified,
    )?;

    let mut events = parse_report(&response.text, config, query)?;
    sort_by_start(&mut events);

    tracing::debug!(count = events.len(), "Search finished");
    Ok(events)
}

fn parse_report(
    body: &str,
    config: &ServerConfig,
    query: &EventQuery,
) -> CalDavResult<Vec<CalendarEvent>> {
    let doc = xml::parse(body)?;
    let mut events = Vec::new();

    for response in xml::responses(&doc) {
        let href = xml::find_text(response, "href");
        let Some(data) = xml::find_text(response, "calendar-data") else {
            tracing::warn!(href = href.as_deref().unwrap_or(""), "No calendar-data in response, skipping");
            continue;
        };

        let mut event = match CalendarEvent::from_ics(&data, href.map(|h| config.url_for(&h))) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparsable event");
                continue;
            }
        };
        event.description = event
            .description
            .as_deref()
            .map(|d| clean_description(d, query.clean_html))
            .filter(|d| !d.is_empty());

        if !query.matches(&event) {
            continue;
        }
        events.push(event);

        if events.len() >= query.max_results {
            tracing::debug!(max = query.max_results, "Result limit reached");
            break;
        }
    }

    Ok(events)
}

fn sort_by_start(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| {
        match (&a.start, &b.start) {
            (Some(a), Some(b)) => a.display_string().cmp(&b.display_string()),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}

/// Prepare an (already unescaped) description for display.
///
/// With `clean_html`, descriptions containing markup are converted to plain
/// text and shortened; anything else is returned trimmed.
pub fn clean_description(description: &str, clean_html: bool) -> String {
    let description = description.trim();
    if !clean_html || !looks_like_html(description) {
        return description.to_string();
    }

    let text = match html2text::from_read(description.as_bytes(), 10_000) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Could not convert HTML description");
            return description.to_string();
        }
    };

    let mut cleaned = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }

    truncate_description(cleaned.trim())
}

fn looks_like_html(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

/// Cut at a paragraph or sentence boundary when one is reasonably close to
/// the limit, otherwise hard at the limit.
fn truncate_description(text: &str) -> String {
    if text.chars().count() <= MAX_CLEAN_DESCRIPTION_CHARS {
        return text.to_string();
    }

    let limit = text
        .char_indices()
        .nth(MAX_CLEAN_DESCRIPTION_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let head = &text[..limit];

    let cut = [head.rfind("\n\n"), head.rfind(". ").map(|i| i + 1)]
        .into_iter()
        .flatten()
        .max()
        .filter(|&cut| cut > limit / 2)
        .unwrap_or(limit);

    text[..cut].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, config, multistatus};
    use crate::transport::{DavResponse, Method};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event_unit(href: &str, uid: &str, summary: &str, dtstart: &str, extra: &str) -> String {
        format!(
            "<d:response><d:href>{href}</d:href><d:propstat><d:prop><d:getetag>\"1\"</d:getetag>\
<cal:calendar-data>BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:{uid}\nDTSTART:{dtstart}\nSUMMARY:{summary}\n{extra}END:VEVENT\nEND:VCALENDAR\n</cal:calendar-data>\
</d:prop></d:propstat></d:response>"
        )
    }

    #[test]
    fn inclusive_end_is_advanced_one_day() {
        let body = build_report_body(date("2025-06-01"), date("2025-06-07")).unwrap();
        assert!(body.contains(r#"start="20250601T000000Z""#));
        assert!(body.contains(r#"end="20250608T000000Z""#));
        assert!(body.contains(r#"<c:comp-filter name="VEVENT">"#));
    }

    #[test]
    fn range_defaults_and_validation() {
        let today = date("2025-01-10");
        let query = EventQuery::new("/cal/");
        assert_eq!(
            query.resolve_range(today).unwrap(),
            (today, date("2025-02-09"))
        );

        let reversed = EventQuery::new("/cal/").between(date("2025-06-07"), date("2025-06-01"));
        assert!(matches!(
            reversed.resolve_range(today),
            Err(CalDavError::Validation { .. })
        ));

        let single_day = EventQuery::new("/cal/").between(date("2025-06-01"), date("2025-06-01"));
        assert!(single_day.resolve_range(today).is_ok());
    }

    #[tokio::test]
    async fn search_sends_report_and_sorts_results() {
        let body = [
            event_unit("/cal/b.ics", "b", "Later", "20250603T090000Z", ""),
            event_unit("/cal/none.ics", "n", "No start", "", ""),
            event_unit("/cal/a.ics", "a", "Earlier", "20250602T090000Z", "LOCATION:Room 1\n"),
            "<d:response><d:href>/cal/broken.ics</d:href><d:propstat><d:prop><d:getetag>\"x\"</d:getetag></d:prop></d:propstat></d:response>".to_string(),
            event_unit("/cal/nouid.ics", "", "No uid", "20250601T090000Z", ""),
        ]
        .concat();
        let transport = MockTransport::new().respond(multistatus(&body));

        let query = EventQuery::new("/cal").between(date("2025-06-01"), date("2025-06-07"));
        let events = search_events(&transport, &config(), &query).await.unwrap();

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Earlier", "Later", "No start"]);
        assert_eq!(
            events[0].source_url.as_deref(),
            Some("https://dav.example.com/cal/a.ics")
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Report);
        assert_eq!(requests[0].url, "https://dav.example.com/cal/");
        assert_eq!(requests[0].header_value("Depth"), Some("1"));
        assert!(
            requests[0]
                .body
                .as_deref()
                .unwrap()
                .contains(r#"end="20250608T000000Z""#)
        );
    }

    #[tokio::test]
    async fn text_filter_and_limit() {
        let body = [
            event_unit("/cal/1.ics", "1", "Standup", "20250602T090000Z", ""),
            event_unit("/cal/2.ics", "2", "Lunch", "20250602T120000Z", "DESCRIPTION:with the STANDUP crew\n"),
            event_unit("/cal/3.ics", "3", "Retro", "20250603T090000Z", "LOCATION:Standup room\n"),
        ]
        .concat();

        let transport = MockTransport::new().respond(multistatus(&body));
        let mut query = EventQuery::new("/cal/").between(date("2025-06-01"), date("2025-06-07"));
        query.text = Some("standup".into());
        let events = search_events(&transport, &config(), &query).await.unwrap();
        assert_eq!(events.len(), 3);

        let transport = MockTransport::new().respond(multistatus(&body));
        query.max_results = 2;
        let events = search_events(&transport, &config(), &query).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn invalid_queries_make_no_request() {
        let transport = MockTransport::new();
        let mut query = EventQuery::new("/cal/");
        query.max_results = 0;
        assert!(search_events(&transport, &config(), &query).await.is_err());

        let query = EventQuery::new("  ");
        assert!(search_events(&transport, &config(), &query).await.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_calendar_is_not_found() {
        let transport = MockTransport::new().respond(DavResponse::new(404, ""));
        let query = EventQuery::new("/nope/").between(date("2025-06-01"), date("2025-06-07"));
        let err = search_events(&transport, &config(), &query).await.unwrap_err();
        assert!(matches!(err, CalDavError::NotFound(_)));
    }

    #[test]
    fn html_descriptions_become_plain_text() {
        let html = "<p>Hello <b>team</b></p><p>Agenda</p>";
        let cleaned = clean_description(html, true);
        assert!(!cleaned.contains('<'));
        assert!(cleaned.contains("Hello"));
        assert!(cleaned.contains("Agenda"));

        assert_eq!(clean_description(html, false), html);
        assert_eq!(clean_description("  plain 1 < 2  ", true), "plain 1 < 2");
    }

    #[test]
    fn long_descriptions_are_cut_at_a_boundary() {
        let sentence = "This sentence is filler text. ";
        let text = sentence.repeat(40);
        let cut = truncate_description(text.trim());
        assert!(cut.chars().count() <= MAX_CLEAN_DESCRIPTION_CHARS);
        assert!(cut.ends_with('.'));
    }
}
