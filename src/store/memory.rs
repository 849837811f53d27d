//! In-memory store for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serenity::async_trait;
use serenity::model::id::{GuildId, MessageId, RoleId};

use crate::common::error::{StoreError, StoreResult};
use crate::store::{CountingState, ReactionRoleBinding, StateStore};

#[derive(Default)]
pub struct MemoryStore {
    counting: Mutex<Option<CountingState>>,
    bindings: Mutex<Vec<ReactionRoleBinding>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn saved_counting(&self) -> Option<CountingState> {
        *self.counting.lock().unwrap()
    }

    pub fn bindings(&self) -> Vec<ReactionRoleBinding> {
        self.bindings.lock().unwrap().clone()
    }

    pub fn insert_binding(&self, binding: ReactionRoleBinding) {
        self.bindings.lock().unwrap().push(binding);
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_counting(&self) -> StoreResult<CountingState> {
        let mut counting = self.counting.lock().unwrap();
        Ok(*counting.get_or_insert_with(CountingState::default))
    }

    async fn save_counting(&self, state: &CountingState) -> StoreResult<()> {
        self.check_write()?;
        *self.counting.lock().unwrap() = Some(*state);
        Ok(())
    }

    async fn upsert_binding(&self, binding: &ReactionRoleBinding) -> StoreResult<()> {
        self.check_write()?;
        let mut bindings = self.bindings.lock().unwrap();
        match bindings
            .iter_mut()
            .find(|b| b.message_id == binding.message_id && b.emoji_key == binding.emoji_key)
        {
            Some(existing) => existing.role_id = binding.role_id,
            None => bindings.push(binding.clone()),
        }
        Ok(())
    }

    async fn find_binding_role(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
        emoji_key: &str,
    ) -> StoreResult<Option<RoleId>> {
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .find(|b| {
                b.guild_id == guild_id && b.message_id == message_id && b.emoji_key == emoji_key
            })
            .map(|b| b.role_id))
    }

    async fn delete_bindings_for_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> StoreResult<u64> {
        self.check_write()?;
        let mut bindings = self.bindings.lock().unwrap();
        let before = bindings.len();
        bindings.retain(|b| !(b.guild_id == guild_id && b.message_id == message_id));
        Ok((before - bindings.len()) as u64)
    }
}
