//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub commands: CommandsConfig,
    pub counting: CountingConfig,
    pub embed: EmbedConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: String,
    /// Custom status shown under the bot's name.
    pub presence: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            presence: "🎧 Listening to xSleepyo".to_string(),
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

/// Health endpoint, self-ping and outbound HTTP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub port: u16,
    /// Externally reachable base URL. Falls back to localhost.
    pub external_url: Option<String>,
    pub ping_interval_secs: u64,
    pub joke_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            external_url: None,
            ping_interval_secs: 180,
            joke_url:
                "https://v2.jokeapi.dev/joke/Any?blacklistFlags=racist,sexist,explicit&type=single"
                    .to_string(),
        }
    }
}

impl WebConfig {
    pub fn ping_url(&self) -> String {
        match self.external_url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("http://localhost:{}", self.port),
        }
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

/// Text command settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub prefix: String,
    pub status_cooldown_ms: u64,
    pub purge_confirmation_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: ".".to_string(),
            status_cooldown_ms: 2000,
            purge_confirmation_secs: 5,
        }
    }
}

impl CommandsConfig {
    pub fn status_cooldown(&self) -> Duration {
        Duration::from_millis(self.status_cooldown_ms)
    }

    pub fn purge_confirmation(&self) -> Duration {
        Duration::from_secs(self.purge_confirmation_secs)
    }
}

/// Counting game pacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CountingConfig {
    pub ack_delay_ms: u64,
    pub wrong_number_grace_secs: u64,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            ack_delay_ms: 750,
            wrong_number_grace_secs: 3,
        }
    }
}

impl CountingConfig {
    pub fn ack_delay(&self) -> Duration {
        Duration::from_millis(self.ack_delay_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_secs(self.wrong_number_grace_secs)
    }
}

/// Embed builder conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub draft_timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            draft_timeout_secs: 300,
        }
    }
}

impl EmbedConfig {
    pub fn draft_timeout(&self) -> Duration {
        Duration::from_secs(self.draft_timeout_secs)
    }
}
