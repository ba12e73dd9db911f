//! Transport collaborator contract.
//!
//! The engine never talks to the network itself. Every operation builds a
//! [`DavRequest`], hands it to a [`Transport`] and waits for the
//! [`DavResponse`] before deciding on the next step. Timeouts, TLS and
//! cancellation belong to the transport implementation.

use std::future::Future;

use thiserror::Error;

pub const CONTENT_TYPE_XML: &str = "application/xml; charset=utf-8";
pub const CONTENT_TYPE_CALENDAR: &str = "text/calendar; charset=utf-8";

/// HTTP methods used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Propfind,
    Report,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Propfind => "PROPFIND",
            Method::Report => "REPORT",
        }
    }
}

/// WebDAV `Depth` header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
        }
    }
}

/// A request handed to the transport.
#[derive(Debug, Clone)]
pub struct DavRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl DavRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        DavRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// PROPFIND with an XML body.
    pub fn propfind(url: impl Into<String>, depth: Depth, body: impl Into<String>) -> Self {
        DavRequest::new(Method::Propfind, url)
            .header("Content-Type", CONTENT_TYPE_XML)
            .header("Depth", depth.as_str())
            .body(body)
    }

    /// REPORT with an XML body (always depth 1 for calendar-query).
    pub fn report(url: impl Into<String>, body: impl Into<String>) -> Self {
        DavRequest::new(Method::Report, url)
            .header("Content-Type", CONTENT_TYPE_XML)
            .header("Depth", Depth::One.as_str())
            .body(body)
    }

    pub fn get(url: impl Into<String>) -> Self {
        DavRequest::new(Method::Get, url)
    }

    /// PUT of an iCalendar document.
    pub fn put_calendar(url: impl Into<String>, body: impl Into<String>) -> Self {
        DavRequest::new(Method::Put, url)
            .header("Content-Type", CONTENT_TYPE_CALENDAR)
            .body(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the transport returns: status, headers and body text.
#[derive(Debug, Clone)]
pub struct DavResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub text: String,
}

impl DavResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        DavResponse {
            status,
            headers: Vec::new(),
            text: text.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup (servers send both `ETag` and `etag`).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The ETag header, if the server sent a non-empty one.
    pub fn etag(&self) -> Option<String> {
        self.header("ETag")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Failures reported by the transport before any HTTP status was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Server not found: {0}")]
    Unreachable(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("TLS certificate error: {0}")]
    Certificate(String),

    #[error("{0}")]
    Other(String),
}

/// Issues one request and resolves with its response.
///
/// Implementations must not retry on their own; the engine reports every
/// failure to its caller unchanged.
pub trait Transport {
    fn send(
        &self,
        request: DavRequest,
    ) -> impl Future<Output = Result<DavResponse, TransportError>> + Send;
}
