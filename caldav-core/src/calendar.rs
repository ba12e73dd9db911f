//! Calendar collections discovered on the server.

use std::fmt;

use serde::Serialize;

pub const UNNAMED_CALENDAR: &str = "Unnamed calendar";

/// What a collection can hold, derived from its supported components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalendarType {
    Events,
    Tasks,
    Mixed,
}

impl CalendarType {
    /// VEVENT + VTODO is mixed, VTODO alone is tasks, anything else (including
    /// an empty list) is events.
    pub fn classify<S: AsRef<str>>(components: &[S]) -> Self {
        let has = |name: &str| components.iter().any(|c| c.as_ref().eq_ignore_ascii_case(name));
        let has_events = has("VEVENT") || components.is_empty();
        let has_tasks = has("VTODO");

        match (has_events, has_tasks) {
            (true, true) => CalendarType::Mixed,
            (false, true) => CalendarType::Tasks,
            _ => CalendarType::Events,
        }
    }
}

impl fmt::Display for CalendarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarType::Events => write!(f, "Events"),
            CalendarType::Tasks => write!(f, "Tasks"),
            CalendarType::Mixed => write!(f, "Mixed (events & tasks)"),
        }
    }
}

/// A calendar collection.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarResource {
    /// Server-relative path, used as the calendar id in every other operation
    pub id: String,
    pub url: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub calendar_type: CalendarType,
    pub description: Option<String>,
    /// `#RRGGBB`
    pub color: Option<String>,
    /// Change token (getctag)
    pub ctag: Option<String>,
    pub supported_components: Vec<String>,
    pub owner: Option<String>,
}

/// `#RRGGBBAA` → `#RRGGBB`; other forms are kept.
pub fn normalize_color(color: &str) -> String {
    let color = color.trim();
    if color.len() == 9 && color.starts_with('#') && color.is_ascii() {
        color[..7].to_string()
    } else {
        color.to_string()
    }
}
