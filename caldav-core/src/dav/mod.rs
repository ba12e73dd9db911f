//! CalDAV protocol operations: discovery and time-range queries.

mod query;
mod resolver;
pub(crate) mod xml;

pub use query::{EventQuery, build_report_body, clean_description, search_events};
pub use resolver::{ConnectionInfo, ListOptions, check_connection, list_calendars};

use crate::config::ServerConfig;
use crate::error::CalDavResult;
use crate::transport::{DavRequest, DavResponse, Transport};

/// Authorize and send one request. Exactly one transport call, no retries.
pub(crate) async fn execute<T: Transport>(
    transport: &T,
    config: &ServerConfig,
    request: DavRequest,
) -> CalDavResult<DavResponse> {
    let method = request.method;
    let url = request.url.clone();
    tracing::debug!(method = method.as_str(), %url, "Sending request");

    let request = request.header("Authorization", config.authorization());
    let response = transport.send(request).await?;

    tracing::debug!(method = method.as_str(), %url, status = response.status, "Received response");
    Ok(response)
}
