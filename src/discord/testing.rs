//! Recording platform used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serenity::async_trait;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::common::error::{PlatformError, PlatformErrorKind, PlatformResult};
use crate::common::types::{
    ChannelInfo, ChannelKind, EmbedSpec, InteractionHandle, MemberInfo, UserSummary,
};
use crate::discord::platform::{ChatPlatform, PendingContent};

pub const BOT_ID: u64 = 999;

/// Everything the fake was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Sent {
        channel: ChannelId,
        content: String,
    },
    SentEmbed {
        channel: ChannelId,
        content: Option<String>,
        embed: EmbedSpec,
    },
    Deleted {
        channel: ChannelId,
        message: MessageId,
    },
    DeleteScheduled {
        channel: ChannelId,
        message: MessageId,
        delay: Duration,
    },
    Reacted {
        message: MessageId,
        emoji: ReactionType,
    },
    ReactScheduled {
        message: MessageId,
        emoji: ReactionType,
        delay: Duration,
    },
    Purged {
        channel: ChannelId,
        limit: u8,
    },
    RoleAdded {
        user: UserId,
        role: RoleId,
    },
    RoleRemoved {
        user: UserId,
        role: RoleId,
    },
    Replied {
        content: String,
        ephemeral: bool,
    },
    Deferred {
        ephemeral: bool,
    },
    Edited {
        content: String,
    },
}

pub struct RecordingPlatform {
    actions: Arc<Mutex<Vec<Action>>>,
    next_id: AtomicU64,
    channels: Mutex<HashMap<ChannelId, ChannelInfo>>,
    roles: Mutex<HashSet<RoleId>>,
    missing_messages: Mutex<HashSet<MessageId>>,
    rejected_emojis: Mutex<HashSet<String>>,
    failing_channels: Mutex<HashSet<ChannelId>>,
    members: Mutex<HashMap<UserId, MemberInfo>>,
    fail_role_changes: Mutex<bool>,
    fail_purges: Mutex<bool>,
    purge_count: Mutex<usize>,
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self {
            actions: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(5000),
            channels: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashSet::new()),
            missing_messages: Mutex::new(HashSet::new()),
            rejected_emojis: Mutex::new(HashSet::new()),
            failing_channels: Mutex::new(HashSet::new()),
            members: Mutex::new(HashMap::new()),
            fail_role_changes: Mutex::new(false),
            fail_purges: Mutex::new(false),
            purge_count: Mutex::new(0),
        }
    }
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_channel(self, id: u64) -> Self {
        self.with_channel(id, ChannelKind::Text, true, true)
    }

    pub fn with_channel(self, id: u64, kind: ChannelKind, can_send: bool, can_embed: bool) -> Self {
        let id = ChannelId::new(id);
        self.channels.lock().unwrap().insert(
            id,
            ChannelInfo {
                id,
                name: format!("channel-{}", id),
                kind,
                bot_can_send: can_send,
                bot_can_embed: can_embed,
            },
        );
        self
    }

    pub fn with_role(self, id: u64) -> Self {
        self.roles.lock().unwrap().insert(RoleId::new(id));
        self
    }

    pub fn with_member(self, member: MemberInfo) -> Self {
        self.members.lock().unwrap().insert(member.user.id, member);
        self
    }

    pub fn remove_channel(&self, id: u64) {
        self.channels.lock().unwrap().remove(&ChannelId::new(id));
    }

    pub fn missing_message(&self, id: u64) {
        self.missing_messages.lock().unwrap().insert(MessageId::new(id));
    }

    pub fn reject_emoji(&self, emoji: &str) {
        self.rejected_emojis.lock().unwrap().insert(emoji.to_string());
    }

    pub fn fail_sends_to(&self, id: u64) {
        self.failing_channels.lock().unwrap().insert(ChannelId::new(id));
    }

    pub fn fail_role_changes(&self) {
        *self.fail_role_changes.lock().unwrap() = true;
    }

    /// Bulk deletes fail as if the bot lacked Manage Messages.
    pub fn fail_purges(&self) {
        *self.fail_purges.lock().unwrap() = true;
    }

    pub fn set_purge_count(&self, count: usize) {
        *self.purge_count.lock().unwrap() = count;
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.actions.lock().unwrap().clear();
    }

    /// Plain text messages sent to a channel.
    pub fn sent_to(&self, channel: u64) -> Vec<String> {
        let channel = ChannelId::new(channel);
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Sent { channel: c, content } if c == channel => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn embeds_to(&self, channel: u64) -> Vec<EmbedSpec> {
        let channel = ChannelId::new(channel);
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::SentEmbed { channel: c, embed, .. } if c == channel => Some(embed),
                _ => None,
            })
            .collect()
    }

    pub fn replies(&self) -> Vec<(String, bool)> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Replied { content, ephemeral } => Some((content, ephemeral)),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Edited { content } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn was_deleted(&self, message: u64) -> bool {
        let message = MessageId::new(message);
        self.actions()
            .iter()
            .any(|action| matches!(action, Action::Deleted { message: m, .. } if *m == message))
    }

    pub fn delete_scheduled(&self, message: u64) -> Option<Duration> {
        let message = MessageId::new(message);
        self.actions().into_iter().find_map(|action| match action {
            Action::DeleteScheduled { message: m, delay, .. } if m == message => Some(delay),
            _ => None,
        })
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Id the next sent message will get.
    pub fn peek_next_message_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    fn check_channel(&self, channel: ChannelId) -> PlatformResult<()> {
        if self.failing_channels.lock().unwrap().contains(&channel) {
            return Err(PlatformError::new(
                PlatformErrorKind::MissingPermissions,
                "Missing Permissions",
            ));
        }
        Ok(())
    }
}

fn emoji_text(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Custom { id, .. } => id.to_string(),
        ReactionType::Unicode(symbol) => symbol.clone(),
        _ => String::new(),
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    fn bot_user(&self) -> UserSummary {
        UserSummary {
            id: UserId::new(BOT_ID),
            name: "KiraBot".to_string(),
            tag: "KiraBot#0001".to_string(),
            bot: true,
        }
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> PlatformResult<MessageId> {
        self.check_channel(channel)?;
        self.record(Action::Sent {
            channel,
            content: content.to_string(),
        });
        Ok(self.next_message_id())
    }

    async fn send_embed(
        &self,
        channel: ChannelId,
        content: Option<&str>,
        embed: &EmbedSpec,
    ) -> PlatformResult<MessageId> {
        self.check_channel(channel)?;
        self.record(Action::SentEmbed {
            channel,
            content: content.map(str::to_string),
            embed: embed.clone(),
        });
        Ok(self.next_message_id())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.record(Action::Deleted { channel, message });
        Ok(())
    }

    fn send_message_when_ready(&self, channel: ChannelId, content: PendingContent) {
        let actions = Arc::clone(&self.actions);
        tokio::spawn(async move {
            let content = content.await;
            actions.lock().unwrap().push(Action::Sent { channel, content });
        });
    }

    fn delete_message_later(&self, channel: ChannelId, message: MessageId, delay: Duration) {
        self.record(Action::DeleteScheduled {
            channel,
            message,
            delay,
        });
    }

    async fn react(
        &self,
        _channel: ChannelId,
        message: MessageId,
        emoji: &ReactionType,
    ) -> PlatformResult<()> {
        if self.rejected_emojis.lock().unwrap().contains(&emoji_text(emoji)) {
            return Err(PlatformError::new(PlatformErrorKind::InvalidEmoji, "Unknown Emoji"));
        }
        self.record(Action::Reacted {
            message,
            emoji: emoji.clone(),
        });
        Ok(())
    }

    fn react_later(
        &self,
        _channel: ChannelId,
        message: MessageId,
        emoji: ReactionType,
        delay: Duration,
    ) {
        self.record(Action::ReactScheduled {
            message,
            emoji,
            delay,
        });
    }

    async fn verify_message(&self, _channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        if self.missing_messages.lock().unwrap().contains(&message) {
            return Err(PlatformError::not_found("Unknown Message"));
        }
        Ok(())
    }

    async fn purge_recent(&self, channel: ChannelId, limit: u8) -> PlatformResult<usize> {
        if *self.fail_purges.lock().unwrap() {
            return Err(PlatformError::new(
                PlatformErrorKind::MissingPermissions,
                "Missing Permissions",
            ));
        }
        self.record(Action::Purged { channel, limit });
        let available = *self.purge_count.lock().unwrap();
        Ok(available.min(limit as usize))
    }

    async fn channel_info(
        &self,
        _guild: GuildId,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelInfo>> {
        Ok(self.channels.lock().unwrap().get(&channel).cloned())
    }

    async fn role_exists(&self, _guild: GuildId, role: RoleId) -> PlatformResult<bool> {
        Ok(self.roles.lock().unwrap().contains(&role))
    }

    async fn add_role(&self, _guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        if *self.fail_role_changes.lock().unwrap() {
            return Err(PlatformError::new(
                PlatformErrorKind::MissingPermissions,
                "Missing Permissions",
            ));
        }
        self.record(Action::RoleAdded { user, role });
        Ok(())
    }

    async fn remove_role(&self, _guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        if *self.fail_role_changes.lock().unwrap() {
            return Err(PlatformError::new(
                PlatformErrorKind::MissingPermissions,
                "Missing Permissions",
            ));
        }
        self.record(Action::RoleRemoved { user, role });
        Ok(())
    }

    async fn member_info(&self, _guild: GuildId, user: UserId) -> PlatformResult<MemberInfo> {
        self.members
            .lock()
            .unwrap()
            .get(&user)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("Unknown Member"))
    }

    async fn gateway_latency(&self) -> Option<Duration> {
        Some(Duration::from_millis(42))
    }

    fn guild_count(&self) -> usize {
        3
    }

    async fn reply(
        &self,
        _interaction: &InteractionHandle,
        content: &str,
        ephemeral: bool,
    ) -> PlatformResult<()> {
        self.record(Action::Replied {
            content: content.to_string(),
            ephemeral,
        });
        Ok(())
    }

    async fn defer(&self, _interaction: &InteractionHandle, ephemeral: bool) -> PlatformResult<()> {
        self.record(Action::Deferred { ephemeral });
        Ok(())
    }

    async fn edit_reply(
        &self,
        _interaction: &InteractionHandle,
        content: &str,
    ) -> PlatformResult<()> {
        self.record(Action::Edited {
            content: content.to_string(),
        });
        Ok(())
    }
}
