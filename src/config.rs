//! CLI settings: `~/.config/caldav/config.toml` overlaid with `CALDAV_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use caldav_core::{ServerConfig, TimezoneMode, UnitLabels};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Default timezone for new events: `utc`, `floating` or an IANA name
    pub timezone: Option<String>,

    /// Reminder labels: `en` or `de`
    pub language: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Settings {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("caldav");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let settings: Settings = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(Environment::with_prefix("CALDAV").try_parsing(true))
            .build()
            .context("Could not read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        Ok(settings)
    }

    /// Server connection, failing with a hint when something is missing.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let (Some(url), Some(username), Some(password)) =
            (&self.server_url, &self.username, &self.password)
        else {
            anyhow::bail!(
                "No server configured.\n\n\
                Set server_url, username and password in {}\n\
                or export CALDAV_SERVER_URL, CALDAV_USERNAME and CALDAV_PASSWORD.",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".to_string())
            );
        };

        Ok(ServerConfig::new(url, username, password)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timezone for new events, from an explicit value or the configured default.
    pub fn timezone_mode(&self, explicit: Option<&str>) -> Result<TimezoneMode> {
        let mode = match explicit.or(self.timezone.as_deref()) {
            None => TimezoneMode::Utc,
            Some(value) => parse_timezone(value),
        };
        mode.validate()?;
        Ok(mode)
    }

    pub fn unit_labels(&self) -> UnitLabels {
        match self.language.as_deref().map(str::trim) {
            Some(lang) if lang.eq_ignore_ascii_case("de") => UnitLabels::german(),
            _ => UnitLabels::english(),
        }
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> Result<()> {
        let contents = format!(
            "\
# caldav configuration

# Server and credentials (an app password for iCloud, Fastmail, ...):
# server_url = \"https://caldav.icloud.com\"
# username = \"you@example.com\"
# password = \"xxxx-xxxx-xxxx-xxxx\"

# Timezone for new events: \"utc\", \"floating\" or an IANA name
# timezone = \"Europe/Berlin\"

# Reminder labels: \"en\" or \"de\"
# language = \"en\"

# Log level (overridden by RUST_LOG):
# log_level = \"{}\"

# HTTP timeout in seconds:
# timeout_secs = {}
",
            DEFAULT_LOG_LEVEL, DEFAULT_TIMEOUT_SECS
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Could not create config directory")?;
        }
        std::fs::write(path, contents).context("Could not write config file")?;

        Ok(())
    }
}

fn parse_timezone(value: &str) -> TimezoneMode {
    let value = value.trim();
    if value.eq_ignore_ascii_case("utc") {
        TimezoneMode::Utc
    } else if value.eq_ignore_ascii_case("floating") {
        TimezoneMode::Floating
    } else {
        TimezoneMode::Zoned(value.to_string())
    }
}
