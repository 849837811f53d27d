//! Persistent state: the counting game record and reaction-role bindings.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId};

use crate::common::error::StoreResult;

pub use postgres::PgStore;

/// The singleton counting game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountingState {
    pub active_channel: Option<ChannelId>,
    pub next_expected: u32,
}

impl Default for CountingState {
    fn default() -> Self {
        Self {
            active_channel: None,
            next_expected: 1,
        }
    }
}

/// A persisted (message, emoji) -> role association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRoleBinding {
    pub guild_id: GuildId,
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    /// Custom emoji id, or the literal Unicode symbol.
    pub emoji_key: String,
    pub role_id: RoleId,
}

/// Storage backend. Every call is an independent statement.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the counting record, creating the default row if it is missing.
    async fn load_counting(&self) -> StoreResult<CountingState>;

    async fn save_counting(&self, state: &CountingState) -> StoreResult<()>;

    /// Insert a binding, replacing the role of an existing (message, emoji) pair.
    async fn upsert_binding(&self, binding: &ReactionRoleBinding) -> StoreResult<()>;

    async fn find_binding_role(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
        emoji_key: &str,
    ) -> StoreResult<Option<RoleId>>;

    /// Remove every binding of a message. Returns the number removed.
    async fn delete_bindings_for_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> StoreResult<u64>;
}
