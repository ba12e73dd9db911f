use anyhow::Result;
use caldav_core::{ServerConfig, Transport, check_connection};
use owo_colors::OwoColorize;

pub async fn run<T: Transport>(transport: &T, server: &ServerConfig) -> Result<()> {
    let info = check_connection(transport, server).await?;

    println!(
        "{} Connected to {} as {}",
        "✓".green(),
        server.base_url(),
        info.display_name.bold()
    );
    if let Some(principal) = &info.principal {
        println!("  Principal: {}", principal.dimmed());
    }

    Ok(())
}
