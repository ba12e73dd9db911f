use anyhow::Result;
use caldav_core::{ListOptions, ServerConfig, Transport, list_calendars};
use owo_colors::OwoColorize;

use crate::commands::print_json;
use crate::render::{Render, pluralize};

pub async fn run<T: Transport>(
    transport: &T,
    server: &ServerConfig,
    options: ListOptions,
    details: bool,
    json: bool,
) -> Result<()> {
    let calendars = list_calendars(transport, server, &options).await?;

    if json {
        return print_json(&calendars);
    }

    if calendars.is_empty() {
        println!("{}", "No calendars found".dimmed());
        return Ok(());
    }

    for calendar in &calendars {
        println!("{}", calendar.render());
        if details {
            if let Some(description) = &calendar.description {
                println!("   {}", description);
            }
            if let Some(color) = &calendar.color {
                println!("   Color: {}", color);
            }
            if let Some(owner) = &calendar.owner {
                println!("   Owner: {}", owner.dimmed());
            }
            if let Some(ctag) = &calendar.ctag {
                println!("   CTag:  {}", ctag.dimmed());
            }
        }
    }

    println!();
    println!(
        "{}",
        format!(
            "{} {}",
            calendars.len(),
            pluralize("calendar", calendars.len())
        )
        .dimmed()
    );

    Ok(())
}
