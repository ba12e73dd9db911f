//! `reqwest`-backed transport for the CalDAV engine.

use std::error::Error as _;
use std::time::Duration;

use anyhow::{Context, Result};
use caldav_core::{DavRequest, DavResponse, Transport, TransportError};

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("caldav-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Could not build HTTP client")?;

        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let text = response.text().await.map_err(classify)?;

        Ok(DavResponse {
            status,
            headers,
            text,
        })
    }
}

/// Sort a reqwest failure into the categories the engine reports.
fn classify(error: reqwest::Error) -> TransportError {
    let chain = error_chain(&error);
    let lower = chain.to_lowercase();
    tracing::debug!(error = %chain, "HTTP request failed");

    if error.is_timeout() {
        TransportError::Timeout(chain)
    } else if lower.contains("certificate") || lower.contains("tls") {
        TransportError::Certificate(chain)
    } else if lower.contains("refused") {
        TransportError::ConnectionRefused(chain)
    } else if error.is_connect() {
        TransportError::Unreachable(chain)
    } else {
        TransportError::Other(chain)
    }
}

/// Error message with all of its sources, outermost first.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
