//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required (set TOKEN)".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }

    // Database
    if config.database.url.is_empty() {
        errors.push("database.url is required (set DATABASE_URL)".to_string());
    } else if !config.database.url.starts_with("postgres://")
        && !config.database.url.starts_with("postgresql://")
    {
        errors.push("database.url must be a postgres:// connection string".to_string());
    }
    if config.database.max_connections == 0 {
        errors.push("database.max_connections must be at least 1".to_string());
    }

    // Web
    if config.web.port == 0 {
        errors.push("web.port must be non-zero".to_string());
    }
    if config.web.ping_interval_secs < 10 {
        errors.push(format!(
            "web.ping_interval_secs must be at least 10 (got {})",
            config.web.ping_interval_secs
        ));
    }
    if let Some(ref url) = config.web.external_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(format!("web.external_url '{}' must start with http:// or https://", url));
        }
    }
    if config.web.joke_url.is_empty() {
        errors.push("web.joke_url is required".to_string());
    }

    // Commands
    if config.commands.prefix.trim().is_empty() {
        errors.push("commands.prefix must not be empty".to_string());
    }
    if config.commands.prefix.chars().any(char::is_whitespace) {
        errors.push("commands.prefix must not contain whitespace".to_string());
    }

    // Timers
    if config.embed.draft_timeout_secs == 0 {
        errors.push("embed.draft_timeout_secs must be non-zero".to_string());
    }
    if config.counting.wrong_number_grace_secs == 0 {
        errors.push("counting.wrong_number_grace_secs must be non-zero".to_string());
    }
    if config.commands.status_cooldown_ms == 0 {
        errors.push("commands.status_cooldown_ms must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
