//! Discord bot client abstraction.
//!
//! Owns the serenity client and the single processing loop. Gateway
//! callbacks only forward events into a channel; the loop feeds them to the
//! [`Dispatcher`] one at a time.

use std::time::Duration;

use serenity::async_trait;
use serenity::gateway::ActivityData;
use serenity::http::HttpBuilder;
use serenity::model::application::{Command, Interaction};
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::*;
use serenity::Client;

use backon::BackoffBuilder;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::common::types::BotEvent;
use crate::discord::events::{command_event, message_event, reaction_event};
use crate::discord::handler::Dispatcher;
use crate::discord::interactions::command_definitions;
use crate::discord::platform::{SerenityPlatform, ShardManagerContainer};

/// How often draft timers and cooldowns are checked.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// A converted gateway event.
    Event { context: Context, event: BotEvent },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }

    fn forward(&self, event: DiscordBotEvent) {
        if let Err(error) = self.discord_events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        self.forward(DiscordBotEvent::Ready { context, ready });
    }

    async fn message(&self, context: Context, message: Message) {
        let event = message_event(&context, &message);
        self.forward(DiscordBotEvent::Event { context, event });
    }

    async fn interaction_create(&self, context: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            let event = command_event(&command);
            self.forward(DiscordBotEvent::Event { context, event });
        }
    }

    async fn reaction_add(&self, context: Context, reaction: Reaction) {
        let event = reaction_event(&context, &reaction, true).await;
        self.forward(DiscordBotEvent::Event { context, event });
    }

    async fn reaction_remove(&self, context: Context, reaction: Reaction) {
        let event = reaction_event(&context, &reaction, false).await;
        self.forward(DiscordBotEvent::Event { context, event });
    }

    async fn message_delete(
        &self,
        context: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let event = BotEvent::MessagesDeleted {
            guild_id,
            channel_id,
            message_ids: vec![deleted_message_id],
        };
        self.forward(DiscordBotEvent::Event { context, event });
    }

    async fn message_delete_bulk(
        &self,
        context: Context,
        channel_id: ChannelId,
        multiple_deleted_messages_ids: Vec<MessageId>,
        guild_id: Option<GuildId>,
    ) {
        let event = BotEvent::MessagesDeleted {
            guild_id,
            channel_id,
            message_ids: multiple_deleted_messages_ids,
        };
        self.forward(DiscordBotEvent::Event { context, event });
    }
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    token: String,
    presence: String,
    dispatcher: Dispatcher,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBotBuilder {
    pub fn new(
        token: String,
        presence: String,
        dispatcher: Dispatcher,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            token,
            presence,
            dispatcher,
            shutdown_rx,
        }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();

        let client = build_client(&self.token, discord_events_tx.clone()).await?;

        Ok(DiscordBot {
            client: Some(client),
            token: self.token,
            presence: self.presence,
            dispatcher: self.dispatcher,
            discord_events_rx,
            discord_events_tx,
            shutdown_rx: self.shutdown_rx,
        })
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;

    client
        .data
        .write()
        .await
        .insert::<ShardManagerContainer>(client.shard_manager.clone());
    Ok(client)
}

/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    presence: String,
    dispatcher: Dispatcher,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let client = &mut self.client;
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::select! {
            _ = Self::run_connection(client, &self.token, &self.discord_events_tx) => {},
            _ = Self::process_events(
                &mut self.discord_events_rx,
                &mut self.dispatcher,
                &self.presence,
                &mut self.shutdown_rx,
            ) => {},
            _ = async {
                crate::web::wait_for_shutdown(&mut shutdown_rx).await;
                // Gracefully shutdown Discord gateway
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, discord_events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        dispatcher: &mut Dispatcher,
        presence: &str,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        let mut platform: Option<SerenityPlatform> = None;
        let mut tick = interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = discord_events_rx.recv() => {
                    match event {
                        Some(DiscordBotEvent::Ready { context, ready }) => {
                            info!("Logged in as {}!", ready.user.tag());
                            handle_ready(&context, presence).await;
                            platform = Some(SerenityPlatform::new(context));
                        }
                        Some(DiscordBotEvent::Event { context, event }) => {
                            let current = platform.get_or_insert_with(|| SerenityPlatform::new(context));
                            dispatcher.handle_event(&*current, event, Instant::now()).await;
                        }
                        Some(DiscordBotEvent::Disconnected) => {
                            platform = None;
                        }
                        None => {
                            debug!("Discord events channel closed.");
                            break;
                        }
                    }
                }

                // Timers only fire while connected
                _ = tick.tick() => {
                    if let Some(ref current) = platform {
                        dispatcher.handle_tick(current, Instant::now()).await;
                    }
                }

                // Shutdown signal
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event processing");
                        break;
                    }
                }
            }
        }
    }
}

/// Presence and global command registration. Failures are logged and the
/// bot keeps running.
async fn handle_ready(context: &Context, presence: &str) {
    context.set_activity(Some(ActivityData::custom(presence)));

    match Command::set_global_commands(&context.http, command_definitions()).await {
        Ok(commands) => info!("Registered {} slash commands", commands.len()),
        Err(e) => error!("Failed to register slash commands: {}", e),
    }
}
