//! Calendar discovery.
//!
//! CalDAV discovery flow:
//! 1. PROPFIND on the well-known entry point to get the user's principal URL
//! 2. PROPFIND on the principal to get the calendar-home-set URL
//! 3. PROPFIND (depth 1) on the home set to list calendar collections
//!
//! Each step needs the previous step's result, so they run strictly in order.

use roxmltree::Node;
use serde::Serialize;

use super::{execute, xml};
use crate::calendar::{CalendarResource, CalendarType, UNNAMED_CALENDAR, normalize_color};
use crate::config::ServerConfig;
use crate::error::{CalDavError, CalDavResult, ConflictKind, check_status};
use crate::transport::{DavRequest, Depth, Transport};

const PRINCIPAL_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:current-user-principal />
    <d:displayname />
  </d:prop>
</d:propfind>"#;

const HOME_SET_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <c:calendar-home-set />
  </d:prop>
</d:propfind>"#;

const CALENDARS_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" xmlns:cs="http://calendarserver.org/ns/" xmlns:apple="http://apple.com/ns/ical/">
  <d:prop>
    <d:resourcetype />
    <d:displayname />
    <c:calendar-description />
    <cs:getctag />
    <c:supported-calendar-component-set />
    <apple:calendar-color />
    <d:owner />
  </d:prop>
</d:propfind>"#;

/// Options for [`list_calendars`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Keep task-only collections (VTODO without VEVENT)
    pub include_tasks: bool,
}

/// Result of a successful [`check_connection`].
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub display_name: String,
    pub principal: Option<String>,
}

/// Verify credentials with a single PROPFIND on the discovery entry point.
#[tracing::instrument(skip_all, fields(server = %config.base_url()))]
pub async fn check_connection<T: Transport>(
    transport: &T,
    config: &ServerConfig,
) -> CalDavResult<ConnectionInfo> {
    let request = DavRequest::propfind(config.discovery_url(), Depth::Zero, PRINCIPAL_BODY);
    let response = execute(transport, config, request).await?;
    check_status(&response, "Connection test", ConflictKind::Modified)?;

    let doc = xml::parse(&response.text)?;
    let principal = xml::property_href(&doc, "current-user-principal");
    let display_name = xml::find_text(doc.root_element(), "displayname")
        .unwrap_or_else(|| config.username().to_string());

    tracing::info!(%display_name, "Connection OK");
    Ok(ConnectionInfo {
        display_name,
        principal,
    })
}

/// Discover and list the user's calendar collections.
#[tracing::instrument(skip_all, fields(server = %config.base_url(), include_tasks = options.include_tasks))]
pub async fn list_calendars<T: Transport>(
    transport: &T,
    config: &ServerConfig,
    options: &ListOptions,
) -> CalDavResult<Vec<CalendarResource>> {
    let principal = discover_href(
        transport,
        config,
        config.discovery_url(),
        PRINCIPAL_BODY,
        "current-user-principal",
        "Principal discovery",
    )
    .await?;
    tracing::debug!(%principal, "Found principal");

    let home_set = discover_href(
        transport,
        config,
        config.url_for(&principal),
        HOME_SET_BODY,
        "calendar-home-set",
        "Calendar home-set discovery",
    )
    .await?;
    tracing::debug!(%home_set, "Found calendar home set");

    let request = DavRequest::propfind(config.url_for(&home_set), Depth::One, CALENDARS_BODY);
    let response = execute(transport, config, request).await?;
    check_status(&response, "Calendar listing", ConflictKind::Modified)?;

    let calendars: Vec<CalendarResource> = parse_calendar_collections(&response.text, config, &home_set)?
        .into_iter()
        .filter(|calendar| {
            let keep = options.include_tasks || calendar.calendar_type != CalendarType::Tasks;
            if !keep {
                tracing::debug!(calendar = %calendar.display_name, "Skipping task-only calendar");
            }
            keep
        })
        .collect();

    tracing::debug!(count = calendars.len(), "Listed calendars");
    Ok(calendars)
}

/// One depth-0 discovery step: PROPFIND `url` and return the href nested
/// in `property`.
async fn discover_href<T: Transport>(
    transport: &T,
    config: &ServerConfig,
    url: String,
    body: &str,
    property: &str,
    step: &str,
) -> CalDavResult<String> {
    let request = DavRequest::propfind(url, Depth::Zero, body);
    let response = execute(transport, config, request).await?;
    check_status(&response, step, ConflictKind::Modified)?;

    let doc = xml::parse(&response.text)?;
    xml::property_href(&doc, property)
        .ok_or_else(|| CalDavError::Parse(format!("{}: no {} href in response", step, property)))
}

fn same_collection(config: &ServerConfig, a: &str, b: &str) -> bool {
    config.url_for(a).trim_end_matches('/') == config.url_for(b).trim_end_matches('/')
}

fn is_calendar_collection(response: Node) -> bool {
    xml::find(response, "resourcetype")
        .is_some_and(|rt| rt.children().any(|child| xml::is(&child, "calendar")))
}

fn supported_components(response: Node) -> Vec<String> {
    xml::find(response, "supported-calendar-component-set")
        .map(|set| {
            set.descendants()
                .filter(|n| xml::is(n, "comp"))
                .filter_map(|n| n.attribute("name"))
                .map(|name| name.trim().to_ascii_uppercase())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_calendar_collections(
    body: &str,
    config: &ServerConfig,
    home_set: &str,
) -> CalDavResult<Vec<CalendarResource>> {
    let doc = xml::parse(body)?;
    let mut calendars = Vec::new();

    for response in xml::responses(&doc) {
        let Some(href) = xml::find_text(response, "href") else {
            tracing::warn!("Skipping multistatus response without href");
            continue;
        };
        if same_collection(config, &href, home_set) || !is_calendar_collection(response) {
            continue;
        }

        let supported_components = supported_components(response);
        let calendar_type = CalendarType::classify(&supported_components);

        calendars.push(CalendarResource {
            url: config.url_for(&href),
            id: href,
            display_name: xml::find_text(response, "displayname")
                .unwrap_or_else(|| UNNAMED_CALENDAR.to_string()),
            calendar_type,
            description: xml::find_text(response, "calendar-description"),
            color: xml::find_text(response, "calendar-color").map(|c| normalize_color(&c)),
            ctag: xml::find_text(response, "getctag"),
            supported_components,
            owner: xml::find(response, "owner").and_then(|owner| xml::find_text(owner, "href")),
        });
    }

    Ok(calendars)
}
