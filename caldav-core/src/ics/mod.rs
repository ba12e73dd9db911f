//! iCalendar (RFC 5545) text handling.
//!
//! The document model keeps unknown content intact, so resources fetched
//! from a server can be edited and written back without losing anything the
//! engine does not understand.

mod document;
mod escape;
mod fold;
mod generate;

pub use document::{Block, ContentLine, IcalDocument, Property};
pub use escape::{escape_text, unescape_text};
pub use fold::{fold, unfold};
pub use generate::{EventDraft, PRODID, generate_ics};
