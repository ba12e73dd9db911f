use anyhow::Result;
use caldav_core::{EventUpdate, ServerConfig, Transport, update_event};
use owo_colors::OwoColorize;

use crate::commands::print_json;
use crate::render::Render;

pub async fn run<T: Transport>(
    transport: &T,
    server: &ServerConfig,
    event_url: &str,
    update: EventUpdate,
    json: bool,
) -> Result<()> {
    let updated = update_event(transport, server, event_url, &update).await?;

    if json {
        return print_json(&updated);
    }

    println!("{} Updated event", "✓".green());
    for change in &updated.changes {
        println!("{}", change.render());
    }
    println!(
        "  {}",
        format!(
            "SEQUENCE {} → {}",
            updated.previous_sequence, updated.sequence
        )
        .dimmed()
    );
    if updated.etag_used.is_none() {
        println!(
            "  {}",
            "Server sent no ETag; written without a concurrency check".yellow()
        );
    }

    Ok(())
}
