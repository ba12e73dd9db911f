use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::Settings;

pub fn run() -> Result<()> {
    let config_path = Settings::config_path()?;

    if !config_path.exists() {
        Settings::create_default_config(&config_path)?;
        println!("{} Created {}", "✓".green(), config_path.display());
    }

    let settings = Settings::load()?;

    println!("{}", "Paths".bold());
    println!("  Config:    {}", config_path.display());
    println!();
    println!("{}", "Settings".bold());
    println!(
        "  Server:    {}",
        settings.server_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Username:  {}",
        settings.username.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Password:  {}",
        if settings.password.is_some() { "(set)" } else { "(not set)" }
    );
    println!(
        "  Timezone:  {}",
        settings.timezone.as_deref().unwrap_or("utc")
    );
    println!("  Log level: {}", settings.log_level);

    Ok(())
}
