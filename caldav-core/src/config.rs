//! Connection configuration passed explicitly into every operation.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{CalDavError, CalDavResult};

pub const DEFAULT_DISCOVERY_PATH: &str = "/.well-known/caldav";

/// Server location and credentials.
///
/// Immutable once built; operations borrow it instead of reading globals.
#[derive(Clone)]
pub struct ServerConfig {
    base_url: String,
    username: String,
    password: String,
    discovery_path: String,
}

impl ServerConfig {
    /// Validate and normalize the server URL and credentials.
    ///
    /// The base URL loses its trailing slash so server-relative hrefs can be
    /// appended directly.
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl AsRef<str>,
        password: impl AsRef<str>,
    ) -> CalDavResult<Self> {
        let base_url = base_url.as_ref().trim().trim_end_matches('/').to_string();
        let username = username.as_ref().trim().to_string();
        // passwords are taken verbatim, surrounding spaces included
        let password = password.as_ref().to_string();

        if base_url.is_empty() {
            return Err(CalDavError::validation(
                "server_url",
                "a server URL is required (e.g. https://dav.example.com)",
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CalDavError::validation(
                "server_url",
                "must start with http:// or https://",
            ));
        }
        if username.is_empty() {
            return Err(CalDavError::validation("username", "a username is required"));
        }
        if password.is_empty() {
            return Err(CalDavError::validation("password", "a password is required"));
        }

        Ok(ServerConfig {
            base_url,
            username,
            password,
            discovery_path: DEFAULT_DISCOVERY_PATH.to_string(),
        })
    }

    /// Use a different entry point for principal discovery.
    pub fn with_discovery_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.discovery_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn discovery_url(&self) -> String {
        format!("{}{}", self.base_url, self.discovery_path)
    }

    /// Value of the `Authorization` header (HTTP Basic).
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// Resolve an href from a multistatus body (or a user-supplied path)
    /// against the server. Absolute URLs are returned unchanged, `/`-rooted
    /// hrefs resolve against scheme and host, anything else against the
    /// base URL.
    pub fn url_for(&self, href: &str) -> String {
        let href = href.trim();
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        if href.starts_with('/') {
            format!("{}{}", self.origin(), href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    /// Scheme and authority of the base URL, e.g. `https://host:8443`.
    fn origin(&self) -> &str {
        let authority_start = self.base_url.find("://").map_or(0, |i| i + 3);
        match self.base_url[authority_start..].find('/') {
            Some(i) => &self.base_url[..authority_start + i],
            None => &self.base_url,
        }
    }

    /// Absolute, slash-terminated URL of a calendar collection given its id.
    pub fn collection_url(&self, calendar_id: &str) -> String {
        let id: String = calendar_id.chars().filter(|c| !c.is_whitespace()).collect();
        let url = self.url_for(&id);
        if url.ends_with('/') {
            url
        } else {
            format!("{}/", url)
        }
    }

    /// Whether an absolute URL points at this server.
    pub fn owns_url(&self, url: &str) -> bool {
        url == self.base_url
            || url
                .strip_prefix(&self.base_url)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("discovery_path", &self.discovery_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slash() {
        let config = ServerConfig::new(" https://dav.example.com/ ", "alice", "secret").unwrap();
        assert_eq!(config.base_url(), "https://dav.example.com");
        assert_eq!(
            config.discovery_url(),
            "https://dav.example.com/.well-known/caldav"
        );
    }

    #[test]
    fn rejects_missing_scheme_and_credentials() {
        assert!(ServerConfig::new("dav.example.com", "alice", "secret").is_err());
        assert!(ServerConfig::new("", "alice", "secret").is_err());
        assert!(ServerConfig::new("https://dav.example.com", " ", "secret").is_err());
        assert!(ServerConfig::new("https://dav.example.com", "alice", "").is_err());
    }

    #[test]
    fn basic_authorization_header() {
        let config = ServerConfig::new("https://dav.example.com", "alice", "secret").unwrap();
        // base64("alice:secret")
        assert_eq!(config.authorization(), "Basic YWxpY2U6c2VjcmV0");
    }

    #[test]
    fn resolves_relative_and_absolute_hrefs() {
        let config = ServerConfig::new("https://dav.example.com", "alice", "secret").unwrap();
        assert_eq!(
            config.url_for("/calendars/alice/"),
            "https://dav.example.com/calendars/alice/"
        );
        assert_eq!(
            config.url_for("https://p01-caldav.example.com/123/"),
            "https://p01-caldav.example.com/123/"
        );
    }

    #[test]
    fn rooted_hrefs_ignore_base_path() {
        let config =
            ServerConfig::new("https://cloud.example.com/remote.php/dav/", "alice", "secret")
                .unwrap();
        assert_eq!(
            config.url_for("/remote.php/dav/calendars/alice/"),
            "https://cloud.example.com/remote.php/dav/calendars/alice/"
        );
        assert_eq!(
            config.url_for("calendars/alice/"),
            "https://cloud.example.com/remote.php/dav/calendars/alice/"
        );
        assert_eq!(
            config.collection_url("/remote.php/dav/calendars/alice/work"),
            "https://cloud.example.com/remote.php/dav/calendars/alice/work/"
        );
        assert_eq!(
            config.discovery_url(),
            "https://cloud.example.com/remote.php/dav/.well-known/caldav"
        );
        assert!(config.owns_url(&config.url_for("/remote.php/dav/calendars/alice/work/e.ics")));

        let with_port = ServerConfig::new("http://localhost:5232", "alice", "secret").unwrap();
        assert_eq!(with_port.url_for("/alice/"), "http://localhost:5232/alice/");
    }

    #[test]
    fn password_is_kept_verbatim() {
        let config = ServerConfig::new("https://dav.example.com", "alice", " secret ").unwrap();
        assert_eq!(
            config.authorization(),
            format!("Basic {}", STANDARD.encode("alice: secret "))
        );
    }

    #[test]
    fn collection_url_is_slash_terminated() {
        let config = ServerConfig::new("https://dav.example.com", "alice", "secret").unwrap();
        assert_eq!(
            config.collection_url("/calendars/alice/work"),
            "https://dav.example.com/calendars/alice/work/"
        );
        assert_eq!(
            config.collection_url(" /calendars/alice/work/\n"),
            "https://dav.example.com/calendars/alice/work/"
        );
    }

    #[test]
    fn owns_url_requires_path_boundary() {
        let config = ServerConfig::new("https://dav.example.com", "alice", "secret").unwrap();
        assert!(config.owns_url("https://dav.example.com/cal/event.ics"));
        assert!(!config.owns_url("https://dav.example.com.evil.org/cal/event.ics"));
    }

    #[test]
    fn debug_redacts_password() {
        let config = ServerConfig::new("https://dav.example.com", "alice", "secret").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
    }
}
