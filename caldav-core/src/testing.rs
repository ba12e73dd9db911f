//! Scripted transport for protocol tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::ServerConfig;
use crate::transport::{DavRequest, DavResponse, Transport, TransportError};

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<DavResponse, TransportError>>>,
    requests: Mutex<Vec<DavRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, response: DavResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub(crate) fn fail(self, error: TransportError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<DavRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted response left".into())))
    }
}

pub(crate) fn config() -> ServerConfig {
    ServerConfig::new("https://dav.example.com", "alice", "secret").unwrap()
}

pub(crate) fn multistatus(responses: &str) -> DavResponse {
    DavResponse::new(
        207,
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav" xmlns:cs="http://calendarserver.org/ns/" xmlns:ical="http://apple.com/ns/ical/">{}</d:multistatus>"#,
            responses
        ),
    )
}
