//! Event dispatch.
//!
//! [`Dispatcher`] owns every engine and all in-memory state. The processing
//! loop feeds it one [`BotEvent`] at a time, so each handler runs to
//! completion before the next event is looked at.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::common::types::{
    BotEvent, CommandInvocation, EmbedSpec, IncomingMessage, InteractionHandle,
};
use crate::config::types::Config;
use crate::discord::commands::{is_greeting, parse_text_command, TextCommand};
use crate::discord::formatter;
use crate::discord::interactions::SlashCommand;
use crate::discord::platform::ChatPlatform;
use crate::engines::counting::CountingEngine;
use crate::engines::embed_builder::EmbedBuilderEngine;
use crate::engines::reaction_roles::{ReactionRoleEngine, Registration};
use crate::store::{CountingState, StateStore};
use crate::web::JokeClient;

pub struct Dispatcher {
    prefix: String,
    status_cooldown: Duration,
    purge_confirmation: Duration,
    store: Arc<dyn StateStore>,
    counting: CountingEngine,
    reaction_roles: ReactionRoleEngine,
    embeds: EmbedBuilderEngine,
    /// Channel -> instant until which `status` stays suppressed.
    cooldowns: HashMap<ChannelId, Instant>,
    jokes: JokeClient,
    started_at: Instant,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        store: Arc<dyn StateStore>,
        counting: CountingState,
        jokes: JokeClient,
        started_at: Instant,
    ) -> Self {
        Self {
            prefix: config.commands.prefix.clone(),
            status_cooldown: config.commands.status_cooldown(),
            purge_confirmation: config.commands.purge_confirmation(),
            store,
            counting: CountingEngine::new(counting, &config.counting),
            reaction_roles: ReactionRoleEngine::new(),
            embeds: EmbedBuilderEngine::new(config.embed.draft_timeout()),
            cooldowns: HashMap::new(),
            jokes,
            started_at,
        }
    }

    pub async fn handle_event(&mut self, platform: &dyn ChatPlatform, event: BotEvent, now: Instant) {
        match event {
            BotEvent::Message(message) => self.handle_message(platform, &message, now).await,
            BotEvent::Command(invocation) => self.handle_command(platform, &invocation, now).await,
            BotEvent::Reaction(reaction) => {
                self.reaction_roles
                    .handle_reaction(platform, self.store.as_ref(), &reaction)
                    .await
            }
            BotEvent::MessagesDeleted {
                guild_id,
                channel_id,
                message_ids,
            } => {
                debug!("{} message(s) deleted in {}", message_ids.len(), channel_id);
                self.handle_messages_deleted(guild_id, &message_ids).await
            }
        }
    }

    /// Periodic housekeeping: draft timeouts and cooldown expiry.
    pub async fn handle_tick(&mut self, platform: &dyn ChatPlatform, now: Instant) {
        let drafts = self.embeds.active_drafts();
        self.embeds.expire(platform, now).await;
        let expired = drafts.saturating_sub(self.embeds.active_drafts());
        if expired > 0 {
            debug!("{} embed draft(s) expired", expired);
        }
        self.cooldowns.retain(|_, until| *until > now);
    }

    async fn handle_message(
        &mut self,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
        now: Instant,
    ) {
        // Ignore bots, ourselves included
        if message.author.bot || message.author.id == platform.bot_user().id {
            return;
        }

        // Only handle guild (server) messages
        let Some(guild_id) = message.guild_id else {
            return;
        };

        if self.embeds.handle_message(platform, message, now).await {
            return;
        }

        // The counting channel is reserved for the game
        if self.counting.state().active_channel == Some(message.channel_id) {
            let outcome = self
                .counting
                .handle_message(platform, self.store.as_ref(), message)
                .await;
            debug!("Counting outcome for {}: {:?}", message.id, outcome);
            return;
        }

        if is_greeting(&message.content) {
            say(platform, message.channel_id, "Hey!, how are you?").await;
            return;
        }

        if let Some(command) = parse_text_command(&message.content, &self.prefix) {
            self.run_text_command(platform, guild_id, message, command, now)
                .await;
        }
    }

    async fn run_text_command(
        &mut self,
        platform: &dyn ChatPlatform,
        guild_id: GuildId,
        message: &IncomingMessage,
        command: TextCommand,
        now: Instant,
    ) {
        let channel = message.channel_id;
        info!("{:?} command from {}", command, message.author.name);

        match command {
            TextCommand::Help => {
                send_embed(platform, channel, &formatter::help_embed(&self.prefix)).await;
            }
            TextCommand::Ship => {
                let partner = message
                    .mentions
                    .first()
                    .cloned()
                    .unwrap_or_else(|| platform.bot_user());
                if partner.id == message.author.id {
                    say(
                        platform,
                        channel,
                        "You cannot ship yourself with yourself! Mention someone else.",
                    )
                    .await;
                    return;
                }
                send_embed(platform, channel, &formatter::ship_embed(&message.author, &partner))
                    .await;
            }
            TextCommand::Purge { amount } => self.purge(platform, message, amount).await,
            TextCommand::Flip => {
                let heads = rand::random::<bool>();
                say(platform, channel, &formatter::flip_message(heads)).await;
            }
            TextCommand::UserInfo => {
                let target = message.mentions.first().unwrap_or(&message.author);
                match platform.member_info(guild_id, target.id).await {
                    Ok(member) => {
                        let embed = formatter::userinfo_embed(&member, guild_id, &message.author);
                        send_embed(platform, channel, &embed).await;
                    }
                    Err(e) => {
                        warn!("Failed to fetch member {}: {}", target.id, e);
                        say(platform, channel, "❌ I could not find that member in this server.")
                            .await;
                    }
                }
            }
            TextCommand::EightBall { question } => {
                if question.is_empty() {
                    say(platform, channel, "Please ask the magic 8-ball a question!").await;
                    return;
                }
                let answer = formatter::EIGHT_BALL_RESPONSES
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or(formatter::EIGHT_BALL_RESPONSES[0]);
                let embed = formatter::eight_ball_embed(&question, answer, &message.author);
                send_embed(platform, channel, &embed).await;
            }
            TextCommand::Status => {
                if self.cooldowns.get(&channel).is_some_and(|until| now < *until) {
                    debug!("Suppressing status in {} during cooldown", channel);
                    return;
                }
                self.cooldowns.insert(channel, now + self.status_cooldown);

                let latency = platform.gateway_latency().await;
                let uptime = now.saturating_duration_since(self.started_at);
                let embed = formatter::status_embed(latency, platform.guild_count(), uptime);
                send_embed(platform, channel, &embed).await;
            }
            TextCommand::Joke => {
                let jokes = self.jokes.clone();
                platform.send_message_when_ready(
                    channel,
                    Box::pin(async move {
                        match jokes.fetch().await {
                            Ok(Some(joke)) => formatter::joke_message(&joke),
                            Ok(None) => "Sorry, I couldn't fetch a joke right now.".to_string(),
                            Err(e) => {
                                error!("Error fetching joke: {}", e);
                                "My joke generator seems to be taking a nap. Try again later!"
                                    .to_string()
                            }
                        }
                    }),
                );
            }
        }
    }

    async fn purge(&self, platform: &dyn ChatPlatform, message: &IncomingMessage, amount: Option<u8>) {
        let channel = message.channel_id;
        let allowed = message
            .author_permissions
            .is_some_and(|p| p.manage_messages() || p.administrator());
        if !allowed {
            say(platform, channel, "❌ You do not have permission to manage messages.").await;
            return;
        }
        let Some(amount) = amount else {
            say(
                platform,
                channel,
                "Please provide a number between 1 and 100 for messages to delete.",
            )
            .await;
            return;
        };

        match platform.purge_recent(channel, amount).await {
            Ok(deleted) => {
                info!("Purged {} messages in {}", deleted, channel);
                let confirmation = format!("✅ Successfully deleted {} messages.", deleted);
                match platform.send_message(channel, &confirmation).await {
                    Ok(id) => platform.delete_message_later(channel, id, self.purge_confirmation),
                    Err(e) => warn!("Failed to send purge confirmation: {}", e),
                }
            }
            Err(e) => {
                error!("Error during purge: {}", e);
                say(
                    platform,
                    channel,
                    "❌ I was unable to delete messages. Make sure my role has \"Manage Messages\" permission.",
                )
                .await;
            }
        }
    }

    async fn handle_command(
        &mut self,
        platform: &dyn ChatPlatform,
        invocation: &CommandInvocation,
        now: Instant,
    ) {
        let handle = &invocation.handle;
        let Some(command) = SlashCommand::from_invocation(invocation) else {
            debug!("Ignoring unknown command /{}", invocation.name);
            return;
        };
        let Some(guild_id) = invocation.guild_id else {
            reply(platform, handle, "This command can only be used in a server.", true).await;
            return;
        };
        info!("/{} from {}", invocation.name, invocation.user.name);

        if !invocation.is_admin() {
            let refusal = match command {
                SlashCommand::Embed => "❌ You need Administrator permissions to use the embed builder.",
                SlashCommand::ReactionRole { .. } => {
                    "❌ You need Administrator permissions to set up reaction roles."
                }
                SlashCommand::CountingGame { .. } | SlashCommand::ResetCounting => {
                    "You do not have permission to use this command."
                }
            };
            reply(platform, handle, refusal, true).await;
            return;
        }

        let store = self.store.as_ref();
        match command {
            SlashCommand::CountingGame { channel } => {
                match self.counting.setup(platform, store, guild_id, channel).await {
                    Ok(()) => {
                        let confirmation =
                            format!("Counting Game has been successfully set up in <#{}>!", channel);
                        reply(platform, handle, &confirmation, false).await;
                        say(platform, channel, "**Counting Game Created!** Start counting from **1**!")
                            .await;
                    }
                    Err(e) => {
                        warn!("Counting setup failed: {}", e);
                        reply(platform, handle, &e.user_message(), true).await;
                    }
                }
            }
            SlashCommand::ResetCounting => match self.counting.reset(platform, store).await {
                Ok(channel) => {
                    let confirmation = format!(
                        "The Counting Game in <#{}> has been **reset**! Start counting from **1**!",
                        channel
                    );
                    reply(platform, handle, &confirmation, false).await;
                    say(platform, channel, "**Counting Game Reset!** Start counting from **1**!")
                        .await;
                }
                Err(e) => {
                    warn!("Counting reset failed: {}", e);
                    reply(platform, handle, &e.user_message(), true).await;
                }
            },
            SlashCommand::Embed => {
                match self
                    .embeds
                    .start(guild_id, invocation.channel_id, &invocation.user, now)
                {
                    Ok(prompt) => {
                        reply(
                            platform,
                            handle,
                            "✍️ **Embed Builder Started!** Please check the next message.",
                            true,
                        )
                        .await;
                        say(platform, invocation.channel_id, &prompt).await;
                    }
                    Err(e) => reply(platform, handle, e.user_message(), true).await,
                }
            }
            SlashCommand::ReactionRole {
                message_id,
                emoji,
                role,
                channel,
            } => {
                let channel = channel.unwrap_or(invocation.channel_id);
                if let Err(e) = platform.defer(handle, true).await {
                    warn!("Failed to defer reaction role reply: {}", e);
                    return;
                }

                let request = Registration {
                    guild_id,
                    channel_id: channel,
                    message_id: &message_id,
                    emoji: &emoji,
                    role_id: role,
                };
                let mention = format!("<#{}>", channel);
                let content = match self.reaction_roles.register(platform, store, request).await {
                    Ok(_) => format!(
                        "✅ Reaction role set! Reacting to the message in {} with {} will now grant the <@&{}> role.",
                        mention, emoji, role
                    ),
                    Err(e) => {
                        warn!("Error setting reaction role: {}", e);
                        e.user_message(&mention)
                    }
                };
                if let Err(e) = platform.edit_reply(handle, &content).await {
                    warn!("Failed to edit reaction role reply: {}", e);
                }
            }
        }
    }

    async fn handle_messages_deleted(&self, guild_id: Option<GuildId>, message_ids: &[MessageId]) {
        let Some(guild_id) = guild_id else {
            return;
        };
        if let Err(e) = self
            .reaction_roles
            .handle_messages_deleted(self.store.as_ref(), guild_id, message_ids)
            .await
        {
            error!("Error during reaction role cleanup: {}", e);
        }
    }
}

async fn say(platform: &dyn ChatPlatform, channel: ChannelId, content: &str) {
    if let Err(e) = platform.send_message(channel, content).await {
        warn!("Failed to send message to {}: {}", channel, e);
    }
}

async fn send_embed(platform: &dyn ChatPlatform, channel: ChannelId, embed: &EmbedSpec) {
    if let Err(e) = platform.send_embed(channel, None, embed).await {
        warn!("Failed to send embed to {}: {}", channel, e);
    }
}

async fn reply(
    platform: &dyn ChatPlatform,
    handle: &InteractionHandle,
    content: &str,
    ephemeral: bool,
) {
    if let Err(e) = platform.reply(handle, content, ephemeral).await {
        warn!("Failed to respond to interaction: {}", e);
    }
}
