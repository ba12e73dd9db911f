//! Error types for the CalDAV engine.

use std::fmt;

use thiserror::Error;

use crate::transport::{DavResponse, TransportError};

/// Errors that can occur in CalDAV operations.
#[derive(Error, Debug)]
pub enum CalDavError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Authentication failed. Check username and password (an app password may be required)")]
    Unauthorized,

    #[error("Access denied for {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("{context} failed with HTTP {status}: {body}")]
    Protocol {
        context: String,
        status: u16,
        body: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Why a conditional write was refused with 412 Precondition Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// `If-None-Match: *` failed: a resource already exists at the target URL.
    AlreadyExists,
    /// `If-Match` failed: the resource changed between read and write.
    Modified,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::AlreadyExists => {
                write!(f, "a resource already exists at this location (UID already in use)")
            }
            ConflictKind::Modified => {
                write!(f, "the event was modified by someone else; reload it and try again")
            }
        }
    }
}

impl CalDavError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CalDavError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CalDavError::Conflict(_))
    }
}

/// Result type alias for CalDAV operations.
pub type CalDavResult<T> = Result<T, CalDavError>;

/// Map a response status onto the protocol error taxonomy.
///
/// 2xx passes through. 412 is reported as `conflict`, the only status whose
/// meaning depends on which conditional header the caller sent.
pub(crate) fn check_status(
    response: &DavResponse,
    context: &str,
    conflict: ConflictKind,
) -> CalDavResult<()> {
    match response.status {
        200..=299 => Ok(()),
        401 => Err(CalDavError::Unauthorized),
        403 => Err(CalDavError::Forbidden(context.to_string())),
        404 => Err(CalDavError::NotFound(context.to_string())),
        412 => Err(CalDavError::Conflict(conflict)),
        status => Err(CalDavError::Protocol {
            context: context.to_string(),
            status,
            body: response.text.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> DavResponse {
        DavResponse::new(status, "body")
    }

    #[test]
    fn success_class_passes() {
        assert!(check_status(&response(207), "x", ConflictKind::Modified).is_ok());
        assert!(check_status(&response(204), "x", ConflictKind::Modified).is_ok());
    }

    #[test]
    fn statuses_map_to_taxonomy() {
        assert!(matches!(
            check_status(&response(401), "x", ConflictKind::Modified),
            Err(CalDavError::Unauthorized)
        ));
        assert!(matches!(
            check_status(&response(403), "x", ConflictKind::Modified),
            Err(CalDavError::Forbidden(_))
        ));
        assert!(matches!(
            check_status(&response(404), "calendar", ConflictKind::Modified),
            Err(CalDavError::NotFound(ctx)) if ctx == "calendar"
        ));
        assert!(matches!(
            check_status(&response(412), "x", ConflictKind::AlreadyExists),
            Err(CalDavError::Conflict(ConflictKind::AlreadyExists))
        ));
    }

    #[test]
    fn other_status_carries_body() {
        let err = check_status(&response(500), "Listing calendars", ConflictKind::Modified)
            .unwrap_err();
        match err {
            CalDavError::Protocol {
                context,
                status,
                body,
            } => {
                assert_eq!(context, "Listing calendars");
                assert_eq!(status, 500);
                assert_eq!(body, "body");
            }
            other => panic!("Expected protocol error, got {:?}", other),
        }
    }
}
