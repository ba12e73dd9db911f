use anyhow::Result;
use caldav_core::{CalendarEvent, EventQuery, ServerConfig, Transport, UnitLabels, search_events};
use chrono::NaiveDate;
use owo_colors::OwoColorize;

use crate::commands::print_json;
use crate::render::{Render, pluralize, render_reminders};

pub async fn run<T: Transport>(
    transport: &T,
    server: &ServerConfig,
    query: EventQuery,
    labels: &UnitLabels,
    json: bool,
) -> Result<()> {
    let events = search_events(transport, server, &query).await?;

    if json {
        return print_json(&events);
    }

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    // Events arrive sorted by start; group them by day
    let today = chrono::Local::now().date_naive();
    let mut current_date: Option<String> = None;

    for event in &events {
        let date_label = format_date_label(event, today);

        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date_label.bold());
            current_date = Some(date_label);
        }

        println!("  {}", event.render());
        if !event.alarms.is_empty() {
            println!(
                "          {}",
                format!("⏰ {}", render_reminders(&event.alarms, labels)).dimmed()
            );
        }
        if let Some(url) = &event.source_url {
            println!("          {}", url.dimmed());
        }
    }

    println!();
    println!(
        "{}",
        format!("{} {}", events.len(), pluralize("event", events.len())).dimmed()
    );

    Ok(())
}

/// Day heading, e.g. "Today", "Tomorrow", "Wed Feb 25".
fn format_date_label(event: &CalendarEvent, today: NaiveDate) -> String {
    let Some(start) = &event.start else {
        return "No start date".to_string();
    };
    let date = start.naive().date();

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}
