//! TUI rendering traits for caldav-core types.
//!
//! Extension traits that add colored terminal output via owo_colors.

use caldav_core::{
    CalendarEvent, CalendarResource, CalendarType, DateTimeValue, EventStatus, FieldChange,
    Reminder, UnitLabels,
};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarType {
    fn render(&self) -> String {
        match self {
            CalendarType::Events => "events".green().to_string(),
            CalendarType::Tasks => "tasks".cyan().to_string(),
            CalendarType::Mixed => "events+tasks".yellow().to_string(),
        }
    }
}

impl Render for CalendarResource {
    fn render(&self) -> String {
        format!(
            "📅 {} {}\n   {}",
            self.display_name.bold(),
            format!("({})", self.calendar_type.render()).dimmed(),
            self.id.dimmed()
        )
    }
}

impl Render for EventStatus {
    fn render(&self) -> String {
        match self {
            EventStatus::Confirmed => String::new(),
            EventStatus::Tentative => "[tentative]".yellow().to_string(),
            EventStatus::Cancelled => "[cancelled]".red().to_string(),
        }
    }
}

impl Render for CalendarEvent {
    fn render(&self) -> String {
        let mut title = self.title.clone();
        if self.is_recurring {
            title.push_str(" ↻");
        }
        let title = match self.status {
            EventStatus::Cancelled => title.strikethrough().to_string(),
            _ => title.bold().to_string(),
        };

        let mut line = format!("{} {}", format_time(self.start.as_ref()), title);
        let status = self.status.render();
        if !status.is_empty() {
            line.push(' ');
            line.push_str(&status);
        }
        if let Some(location) = &self.location {
            line.push_str(&format!(" {}", format!("@ {}", location).dimmed()));
        }
        line
    }
}

impl Render for FieldChange {
    fn render(&self) -> String {
        format!("   {} {}", "~".yellow(), self)
    }
}

/// Time column for an event: `15:00` or `all-day`.
pub fn format_time(start: Option<&DateTimeValue>) -> String {
    match start {
        None => format!("{:>7}", "?"),
        Some(DateTimeValue::Date(_)) => "all-day".to_string(),
        Some(value) => format!("{:>7}", value.naive().format("%H:%M")),
    }
}

/// Comma-separated reminder texts, e.g. `15 Min, 1 day`.
pub fn render_reminders(reminders: &[Reminder], labels: &UnitLabels) -> String {
    reminders
        .iter()
        .map(|reminder| reminder.to_text(labels))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
