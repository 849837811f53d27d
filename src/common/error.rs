//! Error types for the application.

use thiserror::Error;

/// Startup failures that stop the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by the state store regardless of the backing database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored value for '{field}' is invalid: {value}")]
    Corrupt { field: &'static str, value: String },
}

/// Coarse classification of chat platform failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// Referenced message, channel, role or member no longer exists.
    NotFound,
    /// The platform rejected the emoji.
    InvalidEmoji,
    /// The bot lacks a capability it needs.
    MissingPermissions,
    /// Anything else (network, rate limit, server error).
    Other,
}

/// A failed chat platform call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Other, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == PlatformErrorKind::NotFound
    }
}

impl From<serenity::Error> for PlatformError {
    fn from(error: serenity::Error) -> Self {
        use serenity::http::HttpError;

        let kind = match &error {
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
                match response.error.code {
                    10003 | 10008 | 10011 | 10013 => PlatformErrorKind::NotFound,
                    10014 => PlatformErrorKind::InvalidEmoji,
                    50001 | 50013 => PlatformErrorKind::MissingPermissions,
                    _ => PlatformErrorKind::Other,
                }
            }
            _ => PlatformErrorKind::Other,
        };

        Self::new(kind, error.to_string())
    }
}

/// Counting game errors surfaced to admins.
#[derive(Debug, Error)]
pub enum CountingError {
    #[error("counting game is not configured")]
    NotConfigured,

    #[error("counting channel must be a text channel")]
    NotTextChannel,

    #[error("failed to clear counting channel: {0}")]
    Platform(#[from] PlatformError),
}

impl CountingError {
    /// Chat text shown to the invoking admin.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConfigured => {
                "The counting game has not been set up yet! Use /countinggame first.".to_string()
            }
            Self::NotTextChannel => "Please select a valid text channel!".to_string(),
            Self::Platform(_) => {
                "❌ I could not clear the counting channel. Make sure my role has \"Manage Messages\" and \"Read Message History\" permissions.".to_string()
            }
        }
    }
}

/// Reaction-role registration errors.
#[derive(Debug, Error)]
pub enum ReactionRoleError {
    #[error("target channel is not a text channel")]
    NotTextChannel,

    #[error("message {message_id} not found")]
    MessageNotFound { message_id: String },

    #[error("invalid emoji {emoji}")]
    InvalidEmoji { emoji: String },

    #[error("platform error: {0}")]
    Platform(PlatformError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ReactionRoleError {
    /// Chat text shown to the invoking admin.
    pub fn user_message(&self, channel_mention: &str) -> String {
        match self {
            Self::NotTextChannel => "❌ The target channel must be a text channel.".to_string(),
            Self::MessageNotFound { message_id } => format!(
                "❌ Could not find a message with ID `{}` in {}. Check the ID and channel!",
                message_id, channel_mention
            ),
            Self::InvalidEmoji { emoji } => format!(
                "Invalid emoji provided: {}. Ensure it is a valid server emoji or standard Unicode emoji.",
                emoji
            ),
            Self::Platform(e) => format!(
                "❌ An error occurred: {}. Check bot permissions (Read History, Add Reactions, Manage Roles).",
                e.message
            ),
            Self::Store(_) => {
                "❌ An unknown error occurred while setting the reaction role.".to_string()
            }
        }
    }
}

/// Embed builder conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("user already has an active embed draft")]
    AlreadyActive,
}

impl EmbedError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AlreadyActive => {
                "❌ You already have an active embed draft! Please finish or cancel it first."
            }
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
