mod commands;
mod config;
mod render;
mod transport;

use anyhow::Result;
use caldav_core::datetime::parse_date;
use caldav_core::{
    BuiltinTimezones, EventQuery, EventStatus, EventUpdate, ListOptions, NewEvent, ServerConfig,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "caldav")]
#[command(about = "List, search, create and update events on a CalDAV server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the server URL and credentials
    Check,
    /// List calendar collections
    Calendars {
        /// Also show task-only lists
        #[arg(long)]
        include_tasks: bool,

        /// Show description, color, owner and ctag
        #[arg(long)]
        details: bool,

        #[arg(long)]
        json: bool,
    },
    /// Search events in a calendar
    Events {
        /// Calendar id (path), as shown by `caldav calendars`
        #[arg(short, long)]
        calendar: String,

        /// First day (YYYY-MM-DD, default today)
        #[arg(long)]
        from: Option<String>,

        /// Last day, inclusive (YYYY-MM-DD, default 30 days after --from)
        #[arg(long)]
        to: Option<String>,

        /// Only events whose title, description or location contain this text
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 50)]
        max: usize,

        /// Keep HTML in descriptions
        #[arg(long)]
        raw_html: bool,

        #[arg(long)]
        json: bool,
    },
    /// Create an event
    New {
        #[arg(short, long)]
        calendar: String,

        #[arg(short, long)]
        title: String,

        /// Start (e.g., "2025-03-20T15:00")
        #[arg(short, long)]
        start: String,

        /// End (e.g., "2025-03-20T16:00"); for --all-day the last day
        #[arg(short, long)]
        end: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Attendee email (repeatable)
        #[arg(long = "attendee")]
        attendees: Vec<String>,

        /// Reminder before start as ISO-8601 duration, e.g. PT15M (repeatable)
        #[arg(long = "reminder")]
        reminders: Vec<String>,

        #[arg(long)]
        all_day: bool,

        /// "utc", "floating" or an IANA name like Europe/Berlin
        #[arg(long)]
        timezone: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Update an existing event in place
    Update {
        /// Event URL (absolute or server-relative)
        url: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        start: Option<String>,

        #[arg(short, long)]
        end: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// CONFIRMED, TENTATIVE or CANCELLED
        #[arg(long)]
        status: Option<EventStatus>,

        /// Replace attendees (repeatable)
        #[arg(long = "attendee")]
        attendees: Vec<String>,

        /// Remove all attendees
        #[arg(long, conflicts_with = "attendees")]
        clear_attendees: bool,

        /// Replace reminders (repeatable)
        #[arg(long = "reminder")]
        reminders: Vec<String>,

        /// Remove all reminders
        #[arg(long, conflicts_with = "reminders")]
        clear_reminders: bool,

        #[arg(long)]
        json: bool,
    },
    /// Show (and create) the config file
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    match cli.command {
        Commands::Config => commands::config::run(),
        Commands::Check => {
            let (server, transport) = connect(&settings)?;
            commands::check::run(&transport, &server).await
        }
        Commands::Calendars {
            include_tasks,
            details,
            json,
        } => {
            let (server, transport) = connect(&settings)?;
            let options = ListOptions { include_tasks };
            commands::calendars::run(&transport, &server, options, details, json).await
        }
        Commands::Events {
            calendar,
            from,
            to,
            search,
            max,
            raw_html,
            json,
        } => {
            let (server, transport) = connect(&settings)?;
            let query = EventQuery {
                calendar_id: calendar,
                start: from.as_deref().map(|d| parse_date("from", d)).transpose()?,
                end: to.as_deref().map(|d| parse_date("to", d)).transpose()?,
                text: search,
                max_results: max,
                clean_html: !raw_html,
            };
            let labels = settings.unit_labels();
            commands::events::run(&transport, &server, query, &labels, json).await
        }
        Commands::New {
            calendar,
            title,
            start,
            end,
            description,
            location,
            attendees,
            reminders,
            all_day,
            timezone,
            json,
        } => {
            let (server, transport) = connect(&settings)?;
            let event = NewEvent {
                calendar_id: calendar,
                title,
                start,
                end,
                description,
                location,
                attendees,
                reminders,
                all_day,
                timezone: settings.timezone_mode(timezone.as_deref())?,
            };
            commands::new::run(&transport, &server, &BuiltinTimezones, event, json).await
        }
        Commands::Update {
            url,
            title,
            start,
            end,
            location,
            description,
            status,
            attendees,
            clear_attendees,
            reminders,
            clear_reminders,
            json,
        } => {
            let (server, transport) = connect(&settings)?;
            let update = EventUpdate {
                title,
                start,
                end,
                location,
                description,
                status,
                attendees: list_change(attendees, clear_attendees),
                reminders: list_change(reminders, clear_reminders),
            };
            commands::update::run(&transport, &server, &url, update, json).await
        }
    }
}

fn connect(settings: &Settings) -> Result<(ServerConfig, HttpTransport)> {
    let server = settings.server_config()?;
    let transport = HttpTransport::new(settings.timeout())?;
    Ok((server, transport))
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so `--json`
/// output stays clean.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Repeatable list flag: `None` leaves the list alone, `--clear-*` empties it.
fn list_change(values: Vec<String>, clear: bool) -> Option<Vec<String>> {
    if clear {
        Some(Vec::new())
    } else if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
