//! CalDAV engine.
//!
//! This crate talks to any CalDAV server through a pluggable [`Transport`]:
//! - `ics` keeps iCalendar documents intact while editing individual properties
//! - `dav` discovers calendars and runs time-range queries
//! - `guard` creates and updates events behind ETag preconditions
//!
//! Every operation takes a [`ServerConfig`] explicitly; nothing is global.

pub mod alarm;
pub mod calendar;
pub mod config;
pub mod datetime;
pub mod dav;
pub mod error;
pub mod event;
pub mod guard;
pub mod ics;
pub mod timezone;
pub mod transport;

#[cfg(test)]
mod testing;

pub use alarm::{Reminder, UnitLabels};
pub use calendar::{CalendarResource, CalendarType};
pub use config::ServerConfig;
pub use datetime::{DateTimeValue, TimezoneMode};
pub use dav::{
    ConnectionInfo, EventQuery, ListOptions, check_connection, list_calendars, search_events,
};
pub use error::{CalDavError, CalDavResult, ConflictKind};
pub use event::{CalendarEvent, EventStatus};
pub use guard::{
    CreatedEvent, EventUpdate, FieldChange, NewEvent, UpdatedEvent, create_event, update_event,
};
pub use timezone::{BuiltinTimezones, TimezoneProvider};
pub use transport::{DavRequest, DavResponse, Method, Transport, TransportError};
