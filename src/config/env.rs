//! Environment variable overrides for configuration.
//!
//! Environment values always win over the config file:
//! - `TOKEN` or `KIRABOT_TOKEN` - Discord bot token
//! - `DATABASE_URL` or `KIRABOT_DATABASE_URL` - Postgres connection string
//! - `RENDER_EXTERNAL_URL` or `KIRABOT_EXTERNAL_URL` - base URL for self-pinging
//! - `PORT` or `KIRABOT_PORT` - health endpoint port
//! - `KIRABOT_COMMAND_PREFIX` - text command prefix
//!
//! The prefixed name takes precedence when both are set.

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "KIRABOT";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |name| env::var(name).ok())
}

fn apply_overrides_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    let value = |plain: Option<&str>, suffix: &str| {
        lookup(&format!("{}_{}", ENV_PREFIX, suffix))
            .filter(|v| !v.is_empty())
            .or_else(|| plain.and_then(|name| lookup(name)).filter(|v| !v.is_empty()))
    };

    if let Some(token) = value(Some("TOKEN"), "TOKEN") {
        config.discord.token = token;
    }
    if let Some(url) = value(Some("DATABASE_URL"), "DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(url) = value(Some("RENDER_EXTERNAL_URL"), "EXTERNAL_URL") {
        config.web.external_url = Some(url);
    }
    if let Some(port) = value(Some("PORT"), "PORT") {
        if let Ok(port) = port.parse() {
            config.web.port = port;
        }
    }
    if let Some(prefix) = value(None, "COMMAND_PREFIX") {
        config.commands.prefix = prefix;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `KIRABOT_CONFIG`, otherwise returns "kirabot.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "kirabot.conf".to_string())
}
