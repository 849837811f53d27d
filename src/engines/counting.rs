//! Counting game.
//!
//! One channel per deployment counts upwards from 1. A correct number is
//! acknowledged with a reaction, a wrong one gets a short-lived notice and
//! is removed.

use std::time::Duration;

use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, error, info, warn};

use crate::common::error::CountingError;
use crate::common::types::{ChannelKind, IncomingMessage};
use crate::config::types::CountingConfig;
use crate::discord::platform::ChatPlatform;
use crate::store::{CountingState, StateStore};

/// How many recent messages a reset clears.
const RESET_HISTORY_LIMIT: u8 = 100;

const ACK_EMOJI: &str = "✔️";

/// What happened to a message in the counting channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOutcome {
    /// Not the counting channel, or not a number.
    NotApplicable,
    /// Correct. Holds the new expected value.
    Accepted { next: u32 },
    /// Wrong number. Holds the value that was expected.
    Rejected { expected: u32 },
}

pub struct CountingEngine {
    state: CountingState,
    ack_delay: Duration,
    grace_delay: Duration,
}

impl CountingEngine {
    pub fn new(state: CountingState, config: &CountingConfig) -> Self {
        Self {
            state,
            ack_delay: config.ack_delay(),
            grace_delay: config.grace_delay(),
        }
    }

    pub fn state(&self) -> &CountingState {
        &self.state
    }

    pub async fn handle_message(
        &mut self,
        platform: &dyn ChatPlatform,
        store: &dyn StateStore,
        message: &IncomingMessage,
    ) -> CountOutcome {
        if self.state.active_channel != Some(message.channel_id) {
            return CountOutcome::NotApplicable;
        }
        let Some(number) = parse_count(&message.content) else {
            return CountOutcome::NotApplicable;
        };

        let expected = self.state.next_expected;
        if number == i64::from(expected) {
            // Advance before any acknowledgement so it never depends on the reaction.
            self.state.next_expected = expected.saturating_add(1);
            self.persist(store).await;
            platform.react_later(
                message.channel_id,
                message.id,
                ReactionType::Unicode(ACK_EMOJI.to_string()),
                self.ack_delay,
            );
            debug!("Count {} accepted from {}", number, message.author.name);
            return CountOutcome::Accepted {
                next: self.state.next_expected,
            };
        }

        let notice = format!(
            "Wrong Number! The next number was **{}**. Try again.",
            expected
        );
        match platform.send_message(message.channel_id, &notice).await {
            Ok(notice_id) => {
                platform.delete_message_later(message.channel_id, notice_id, self.grace_delay)
            }
            Err(e) => warn!("Failed to send wrong number notice: {}", e),
        }
        platform.delete_message_later(message.channel_id, message.id, self.grace_delay);

        CountOutcome::Rejected { expected }
    }

    /// Start the game in `channel` from 1.
    pub async fn setup(
        &mut self,
        platform: &dyn ChatPlatform,
        store: &dyn StateStore,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<(), CountingError> {
        let info = platform.channel_info(guild, channel).await?;
        if !matches!(info, Some(ref c) if c.kind == ChannelKind::Text) {
            return Err(CountingError::NotTextChannel);
        }

        self.state = CountingState {
            active_channel: Some(channel),
            next_expected: 1,
        };
        self.persist(store).await;
        info!("Counting game set up in channel {}", channel);
        Ok(())
    }

    /// Clear recent history of the active channel and restart from 1.
    pub async fn reset(
        &mut self,
        platform: &dyn ChatPlatform,
        store: &dyn StateStore,
    ) -> Result<ChannelId, CountingError> {
        let channel = self
            .state
            .active_channel
            .ok_or(CountingError::NotConfigured)?;

        let deleted = platform.purge_recent(channel, RESET_HISTORY_LIMIT).await?;

        self.state.next_expected = 1;
        self.persist(store).await;
        info!(
            "Counting game in {} reset, cleared {} messages",
            channel, deleted
        );
        Ok(channel)
    }

    async fn persist(&self, store: &dyn StateStore) {
        if let Err(e) = store.save_counting(&self.state).await {
            error!("Failed to save counting state: {}", e);
        }
    }
}

fn parse_count(content: &str) -> Option<i64> {
    content.trim().parse().ok()
}
