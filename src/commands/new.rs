use anyhow::Result;
use caldav_core::{NewEvent, ServerConfig, TimezoneProvider, Transport, create_event};
use owo_colors::OwoColorize;

use crate::commands::print_json;
use crate::render::Render;

pub async fn run<T: Transport, Z: TimezoneProvider>(
    transport: &T,
    server: &ServerConfig,
    timezones: &Z,
    event: NewEvent,
    json: bool,
) -> Result<()> {
    let created = create_event(transport, server, timezones, &event).await?;

    if json {
        return print_json(&created);
    }

    println!("{} Created event", "✓".green());
    println!("  {}", created.event.render());
    println!("  UID: {}", created.uid.dimmed());
    println!("  URL: {}", created.url.dimmed());
    if let Some(etag) = &created.etag {
        println!("  ETag: {}", etag.dimmed());
    }

    Ok(())
}
