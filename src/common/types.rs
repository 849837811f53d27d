//! Shared types used across the application.
//!
//! These are the platform-neutral shapes the dispatcher and engines work
//! with. The Discord layer converts serenity models into them before any
//! business logic runs.

use chrono::{DateTime, Utc};
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};
use serenity::model::Permissions;

/// Minimal view of a chat user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    /// Display tag (`name` or legacy `name#1234`).
    pub tag: String,
    pub bot: bool,
}

impl UserSummary {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Kind of a guild channel, as far as the bot cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Other,
}

/// Snapshot of a guild channel and the bot's capabilities in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub bot_can_send: bool,
    pub bot_can_embed: bool,
}

/// Guild member details shown by `userinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user: UserSummary,
    pub avatar_url: String,
    /// Account creation, unix seconds.
    pub created_at: i64,
    /// Guild join, unix seconds.
    pub joined_at: Option<i64>,
    pub roles: Vec<RoleId>,
    pub color: Option<u32>,
}

/// A text message received from the gateway.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author: UserSummary,
    pub content: String,
    pub mentions: Vec<UserSummary>,
    /// Author's effective permissions in the channel, when the cache could tell.
    pub author_permissions: Option<Permissions>,
}

/// Handle needed to answer a structured interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionHandle {
    pub id: InteractionId,
    pub token: String,
}

/// A typed option value of a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Channel(ChannelId),
    Role(RoleId),
    Other,
}

/// A slash command invocation.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub handle: InteractionHandle,
    pub name: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub user: UserSummary,
    pub member_permissions: Option<Permissions>,
    pub options: Vec<(String, OptionValue)>,
}

impl CommandInvocation {
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|(option, _)| option == name)
            .map(|(_, value)| value)
    }

    pub fn is_admin(&self) -> bool {
        self.member_permissions
            .map(|permissions| permissions.administrator())
            .unwrap_or(false)
    }
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: Option<UserId>,
    pub user_is_bot: bool,
    pub emoji: ReactionType,
    pub added: bool,
}

/// A single embed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Platform-neutral description of a rich embed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedSpec {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub footer: Option<String>,
    pub thumbnail: Option<String>,
    pub fields: Vec<EmbedField>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Gateway events after conversion, in delivery order.
#[derive(Debug, Clone)]
pub enum BotEvent {
    Message(IncomingMessage),
    Command(CommandInvocation),
    Reaction(ReactionEvent),
    MessagesDeleted {
        guild_id: Option<GuildId>,
        channel_id: ChannelId,
        message_ids: Vec<MessageId>,
    },
}
