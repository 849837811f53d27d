//! Chat platform port.
//!
//! The dispatcher and engines only talk to Discord through [`ChatPlatform`].
//! [`SerenityPlatform`] is the live implementation over a gateway context.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::builder::{
    CreateEmbed, CreateEmbedFooter, CreateInteractionResponse, CreateInteractionResponseMessage,
    CreateMessage, EditInteractionResponse, GetMessages,
};
use serenity::gateway::ShardManager;
use serenity::model::channel::{ChannelType, ReactionType};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::{Permissions, Timestamp};
use serenity::prelude::*;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::common::error::{PlatformError, PlatformResult};
use crate::common::types::{
    ChannelInfo, ChannelKind, EmbedSpec, InteractionHandle, MemberInfo, UserSummary,
};

/// Message text produced off the processing loop.
pub type PendingContent = Pin<Box<dyn Future<Output = String> + Send + 'static>>;

/// Messages older than this cannot be bulk deleted.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

/// Operations the bot performs against the chat service.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own account.
    fn bot_user(&self) -> UserSummary;

    async fn send_message(&self, channel: ChannelId, content: &str) -> PlatformResult<MessageId>;

    async fn send_embed(
        &self,
        channel: ChannelId,
        content: Option<&str>,
        embed: &EmbedSpec,
    ) -> PlatformResult<MessageId>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    /// Await `content` in a detached task, then send it to `channel`.
    /// Failures are logged.
    fn send_message_when_ready(&self, channel: ChannelId, content: PendingContent);

    /// Delete a message after `delay` without blocking the caller. Failures are logged.
    fn delete_message_later(&self, channel: ChannelId, message: MessageId, delay: Duration);

    async fn react(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &ReactionType,
    ) -> PlatformResult<()>;

    /// React after `delay` without blocking the caller. Failures are logged.
    fn react_later(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: ReactionType,
        delay: Duration,
    );

    /// Succeeds when the message can be fetched.
    async fn verify_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    /// Bulk delete up to `limit` recent messages, skipping ones too old to bulk delete.
    /// Returns the number deleted.
    async fn purge_recent(&self, channel: ChannelId, limit: u8) -> PlatformResult<usize>;

    /// `None` when the guild has no such channel.
    async fn channel_info(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelInfo>>;

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool>;

    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()>;

    async fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()>;

    async fn member_info(&self, guild: GuildId, user: UserId) -> PlatformResult<MemberInfo>;

    /// Heartbeat latency of the current shard, once measured.
    async fn gateway_latency(&self) -> Option<Duration>;

    fn guild_count(&self) -> usize;

    async fn reply(
        &self,
        interaction: &InteractionHandle,
        content: &str,
        ephemeral: bool,
    ) -> PlatformResult<()>;

    async fn defer(&self, interaction: &InteractionHandle, ephemeral: bool) -> PlatformResult<()>;

    async fn edit_reply(&self, interaction: &InteractionHandle, content: &str)
        -> PlatformResult<()>;
}

/// Shard manager handle stored in the client data map for latency lookups.
pub struct ShardManagerContainer;

impl TypeMapKey for ShardManagerContainer {
    type Value = Arc<ShardManager>;
}

/// Convert a serenity user into the neutral summary.
pub fn summarize_user(user: &serenity::model::user::User) -> UserSummary {
    UserSummary {
        id: user.id,
        name: user.name.clone(),
        tag: user.tag(),
        bot: user.bot,
    }
}

fn to_create_embed(spec: &EmbedSpec) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(ref title) = spec.title {
        embed = embed.title(title);
    }
    if let Some(ref description) = spec.description {
        embed = embed.description(description);
    }
    if let Some(color) = spec.color {
        embed = embed.colour(color);
    }
    if let Some(ref footer) = spec.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(ref thumbnail) = spec.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    for field in &spec.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(timestamp) = spec
        .timestamp
        .and_then(|t| Timestamp::from_unix_timestamp(t.timestamp()).ok())
    {
        embed = embed.timestamp(timestamp);
    }
    embed
}

/// Live implementation over a serenity gateway context.
#[derive(Clone)]
pub struct SerenityPlatform {
    context: Context,
}

impl SerenityPlatform {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    async fn respond(
        &self,
        interaction: &InteractionHandle,
        response: CreateInteractionResponse,
    ) -> PlatformResult<()> {
        self.context
            .http
            .create_interaction_response(interaction.id, &interaction.token, &response, Vec::new())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    fn bot_user(&self) -> UserSummary {
        let user = self.context.cache.current_user();
        UserSummary {
            id: user.id,
            name: user.name.clone(),
            tag: user.tag(),
            bot: true,
        }
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> PlatformResult<MessageId> {
        let message = channel.say(&self.context.http, content).await?;
        Ok(message.id)
    }

    async fn send_embed(
        &self,
        channel: ChannelId,
        content: Option<&str>,
        embed: &EmbedSpec,
    ) -> PlatformResult<MessageId> {
        let mut builder = CreateMessage::new().embed(to_create_embed(embed));
        if let Some(content) = content {
            builder = builder.content(content);
        }
        let message = channel.send_message(&self.context.http, builder).await?;
        Ok(message.id)
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        channel.delete_message(&self.context.http, message).await?;
        Ok(())
    }

    fn send_message_when_ready(&self, channel: ChannelId, content: PendingContent) {
        let http = self.context.http.clone();
        tokio::spawn(async move {
            let content = content.await;
            if let Err(e) = channel.say(&http, content).await {
                warn!("Failed to send message to {}: {}", channel, e);
            }
        });
    }

    fn delete_message_later(&self, channel: ChannelId, message: MessageId, delay: Duration) {
        let http = self.context.http.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = channel.delete_message(&http, message).await {
                warn!("Failed to delete message {} in {}: {}", message, channel, e);
            }
        });
    }

    async fn react(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &ReactionType,
    ) -> PlatformResult<()> {
        self.context
            .http
            .create_reaction(channel, message, emoji)
            .await?;
        Ok(())
    }

    fn react_later(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: ReactionType,
        delay: Duration,
    ) {
        let http = self.context.http.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = http.create_reaction(channel, message, &emoji).await {
                warn!("Failed to react to message {}: {}", message, e);
            }
        });
    }

    async fn verify_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        channel.message(&self.context, message).await?;
        Ok(())
    }

    async fn purge_recent(&self, channel: ChannelId, limit: u8) -> PlatformResult<usize> {
        let messages = channel
            .messages(&self.context, GetMessages::new().limit(limit))
            .await?;

        let cutoff = chrono::Utc::now().timestamp() - BULK_DELETE_MAX_AGE_SECS;
        let ids: Vec<MessageId> = messages
            .iter()
            .filter(|message| message.timestamp.unix_timestamp() > cutoff)
            .map(|message| message.id)
            .collect();

        match ids.as_slice() {
            [] => {}
            [single] => channel.delete_message(&self.context.http, *single).await?,
            _ => {
                let body = serde_json::json!({ "messages": ids });
                self.context
                    .http
                    .delete_messages(channel, &body, None)
                    .await?;
            }
        }
        debug!("Bulk deleted {} messages in {}", ids.len(), channel);
        Ok(ids.len())
    }

    async fn channel_info(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelInfo>> {
        let bot_id = self.context.cache.current_user().id;

        let (guild_channel, cached_member) = {
            let cached = self
                .context
                .cache
                .guild(guild)
                .ok_or_else(|| PlatformError::other(format!("guild {} is not cached", guild)))?;
            let Some(guild_channel) = cached.channels.get(&channel).cloned() else {
                return Ok(None);
            };
            (guild_channel, cached.members.get(&bot_id).cloned())
        };

        let bot_member = match cached_member {
            Some(member) => member,
            None => guild.member(&self.context, bot_id).await?,
        };

        let permissions = self
            .context
            .cache
            .guild(guild)
            .map(|cached| cached.user_permissions_in(&guild_channel, &bot_member))
            .unwrap_or(Permissions::empty());

        Ok(Some(ChannelInfo {
            id: guild_channel.id,
            name: guild_channel.name.clone(),
            kind: if guild_channel.kind == ChannelType::Text {
                ChannelKind::Text
            } else {
                ChannelKind::Other
            },
            bot_can_send: permissions.send_messages(),
            bot_can_embed: permissions.embed_links(),
        }))
    }

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool> {
        let cached = self
            .context
            .cache
            .guild(guild)
            .map(|cached| cached.roles.contains_key(&role));
        match cached {
            Some(exists) => Ok(exists),
            None => Ok(guild.roles(&self.context.http).await?.contains_key(&role)),
        }
    }

    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        self.context
            .http
            .add_member_role(guild, user, role, Some("Reaction role"))
            .await?;
        Ok(())
    }

    async fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        self.context
            .http
            .remove_member_role(guild, user, role, Some("Reaction role"))
            .await?;
        Ok(())
    }

    async fn member_info(&self, guild: GuildId, user: UserId) -> PlatformResult<MemberInfo> {
        let member = guild.member(&self.context, user).await?;
        Ok(MemberInfo {
            user: summarize_user(&member.user),
            avatar_url: member.user.face(),
            created_at: member.user.created_at().unix_timestamp(),
            joined_at: member.joined_at.map(|t| t.unix_timestamp()),
            roles: member.roles.clone(),
            color: member.colour(&self.context.cache).map(|colour| colour.0),
        })
    }

    async fn gateway_latency(&self) -> Option<Duration> {
        let manager = {
            let data = self.context.data.read().await;
            data.get::<ShardManagerContainer>()?.clone()
        };
        let runners = manager.runners.lock().await;
        runners
            .get(&self.context.shard_id)
            .and_then(|runner| runner.latency)
    }

    fn guild_count(&self) -> usize {
        self.context.cache.guild_count()
    }

    async fn reply(
        &self,
        interaction: &InteractionHandle,
        content: &str,
        ephemeral: bool,
    ) -> PlatformResult<()> {
        let message = CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(ephemeral);
        self.respond(interaction, CreateInteractionResponse::Message(message))
            .await
    }

    async fn defer(&self, interaction: &InteractionHandle, ephemeral: bool) -> PlatformResult<()> {
        let message = CreateInteractionResponseMessage::new().ephemeral(ephemeral);
        self.respond(interaction, CreateInteractionResponse::Defer(message))
            .await
    }

    async fn edit_reply(
        &self,
        interaction: &InteractionHandle,
        content: &str,
    ) -> PlatformResult<()> {
        let edit = EditInteractionResponse::new().content(content);
        self.context
            .http
            .edit_original_interaction_response(&interaction.token, &edit, Vec::new())
            .await?;
        Ok(())
    }
}
