//! Reaction roles.
//!
//! Keeps the stored (message, emoji) -> role bindings in sync with
//! reactions. Bindings live only in the store and are looked up per event.

use fancy_regex::Regex;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, EmojiId, GuildId, MessageId, RoleId};
use tracing::{debug, error, info, warn};

use crate::common::error::{PlatformErrorKind, ReactionRoleError, StoreError};
use crate::common::types::{ChannelKind, ReactionEvent};
use crate::discord::platform::ChatPlatform;
use crate::store::{ReactionRoleBinding, StateStore};

/// Emoji as the admin typed it, resolved for reacting and keying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmoji {
    /// Lookup key shared by registration and reaction events.
    pub key: String,
    pub reaction: ReactionType,
}

/// Registration request from the `reactionrole` command.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: &'a str,
    pub emoji: &'a str,
    pub role_id: RoleId,
}

pub struct ReactionRoleEngine {
    custom_emoji: Regex,
    shortcode: Regex,
}

impl ReactionRoleEngine {
    pub fn new() -> Self {
        Self {
            custom_emoji: Regex::new(r"<(a?):(\w+):(\d+)>").expect("valid custom emoji pattern"),
            shortcode: Regex::new(r"^:([\w+-]+):$").expect("valid shortcode pattern"),
        }
    }

    /// Resolve an emoji designator. Custom emoji mentions key by their id,
    /// everything else by the literal symbol.
    pub fn resolve_emoji(&self, input: &str) -> Option<ResolvedEmoji> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(Some(captures)) = self.custom_emoji.captures(input) {
            let animated = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
            let name = captures.get(2).map(|m| m.as_str().to_string());
            let id = captures
                .get(3)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .filter(|id| *id != 0)?;
            return Some(ResolvedEmoji {
                key: id.to_string(),
                reaction: ReactionType::Custom {
                    animated,
                    id: EmojiId::new(id),
                    name,
                },
            });
        }

        let symbol = match self.shortcode.captures(input) {
            Ok(Some(captures)) => captures
                .get(1)
                .and_then(|m| emojis::get_by_shortcode(m.as_str()))
                .map(|emoji| emoji.as_str().to_string())
                .unwrap_or_else(|| input.to_string()),
            _ => input.to_string(),
        };

        Some(ResolvedEmoji {
            key: symbol.clone(),
            reaction: ReactionType::Unicode(symbol),
        })
    }

    /// Verify the message, react with the emoji, then store the binding.
    /// Nothing is written unless the reaction succeeds.
    pub async fn register(
        &self,
        platform: &dyn ChatPlatform,
        store: &dyn StateStore,
        request: Registration<'_>,
    ) -> Result<ReactionRoleBinding, ReactionRoleError> {
        let channel = platform
            .channel_info(request.guild_id, request.channel_id)
            .await
            .map_err(ReactionRoleError::Platform)?;
        if !matches!(channel, Some(ref c) if c.kind == ChannelKind::Text) {
            return Err(ReactionRoleError::NotTextChannel);
        }

        let not_found = || ReactionRoleError::MessageNotFound {
            message_id: request.message_id.to_string(),
        };
        let message_id = request
            .message_id
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(MessageId::new)
            .ok_or_else(not_found)?;

        platform
            .verify_message(request.channel_id, message_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    not_found()
                } else {
                    ReactionRoleError::Platform(e)
                }
            })?;

        let invalid_emoji = || ReactionRoleError::InvalidEmoji {
            emoji: request.emoji.to_string(),
        };
        let emoji = self.resolve_emoji(request.emoji).ok_or_else(invalid_emoji)?;

        platform
            .react(request.channel_id, message_id, &emoji.reaction)
            .await
            .map_err(|e| match e.kind {
                PlatformErrorKind::InvalidEmoji => invalid_emoji(),
                _ => ReactionRoleError::Platform(e),
            })?;

        let binding = ReactionRoleBinding {
            guild_id: request.guild_id,
            message_id,
            channel_id: request.channel_id,
            emoji_key: emoji.key,
            role_id: request.role_id,
        };
        store.upsert_binding(&binding).await?;

        info!(
            "Reaction role bound: message {} emoji {} -> role {}",
            binding.message_id, binding.emoji_key, binding.role_id
        );
        Ok(binding)
    }

    /// Grant or revoke the bound role for a reaction. Failures are logged only.
    pub async fn handle_reaction(
        &self,
        platform: &dyn ChatPlatform,
        store: &dyn StateStore,
        event: &ReactionEvent,
    ) {
        if event.user_is_bot {
            return;
        }
        let (Some(guild_id), Some(user_id)) = (event.guild_id, event.user_id) else {
            return;
        };
        let Some(key) = reaction_key(&event.emoji) else {
            return;
        };

        let role_id = match store
            .find_binding_role(guild_id, event.message_id, &key)
            .await
        {
            Ok(Some(role_id)) => role_id,
            Ok(None) => return,
            Err(e) => {
                error!("Error looking up reaction role: {}", e);
                return;
            }
        };

        match platform.role_exists(guild_id, role_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Role ID {} not found in guild {}", role_id, guild_id);
                return;
            }
            Err(e) => {
                warn!("Failed to check role {}: {}", role_id, e);
                return;
            }
        }

        let result = if event.added {
            platform.add_role(guild_id, user_id, role_id).await
        } else {
            platform.remove_role(guild_id, user_id, role_id).await
        };
        match result {
            Ok(()) => debug!(
                "{} role {} for user {} (message {} in channel {})",
                if event.added { "Granted" } else { "Revoked" },
                role_id,
                user_id,
                event.message_id,
                event.channel_id
            ),
            Err(e) => warn!(
                "Failed to update role {} for user {} (message {} in channel {}): {}",
                role_id, user_id, event.message_id, event.channel_id, e
            ),
        }
    }

    /// Drop every binding of the deleted messages.
    pub async fn handle_messages_deleted(
        &self,
        store: &dyn StateStore,
        guild_id: GuildId,
        message_ids: &[MessageId],
    ) -> Result<u64, StoreError> {
        let mut removed = 0;
        for message_id in message_ids {
            let count = store.delete_bindings_for_message(guild_id, *message_id).await?;
            if count > 0 {
                info!(
                    "Removed {} reaction role entries associated with deleted message {}",
                    count, message_id
                );
            }
            removed += count;
        }
        Ok(removed)
    }
}

impl Default for ReactionRoleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Key of a live reaction: custom emoji id, or the Unicode symbol.
pub fn reaction_key(emoji: &ReactionType) -> Option<String> {
    match emoji {
        ReactionType::Custom { id, .. } => Some(id.to_string()),
        ReactionType::Unicode(symbol) => Some(symbol.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serenity::model::id::UserId;

    use super::*;
    use crate::discord::testing::{Action, RecordingPlatform};
    use crate::store::memory::MemoryStore;

    const GUILD: u64 = 1;
    const CHANNEL: u64 = 10;
    const MESSAGE: u64 = 500;
    const ROLE: u64 = 77;

    fn registration<'a>(message_id: &'a str, emoji: &'a str, role: u64) -> Registration<'a> {
        Registration {
            guild_id: GuildId::new(GUILD),
            channel_id: ChannelId::new(CHANNEL),
            message_id,
            emoji,
            role_id: RoleId::new(role),
        }
    }

    fn reaction(emoji: ReactionType, added: bool) -> ReactionEvent {
        ReactionEvent {
            guild_id: Some(GuildId::new(GUILD)),
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(MESSAGE),
            user_id: Some(UserId::new(42)),
            user_is_bot: false,
            emoji,
            added,
        }
    }

    fn thumbs_up() -> ReactionType {
        ReactionType::Unicode("👍".to_string())
    }

    #[test]
    fn test_custom_emoji_keys_by_id() {
        let engine = ReactionRoleEngine::new();
        let resolved = engine.resolve_emoji("<a:party:123456>").unwrap();
        assert_eq!(resolved.key, "123456");
        assert_eq!(
            resolved.reaction,
            ReactionType::Custom {
                animated: true,
                id: EmojiId::new(123456),
                name: Some("party".to_string()),
            }
        );
        assert_eq!(reaction_key(&resolved.reaction), Some(resolved.key));
    }

    #[test]
    fn test_unicode_and_shortcode_emoji() {
        let engine = ReactionRoleEngine::new();
        assert_eq!(engine.resolve_emoji(" 👍 ").unwrap().key, "👍");
        assert_eq!(engine.resolve_emoji(":thumbsup:").unwrap().key, "👍");
        assert_eq!(engine.resolve_emoji(":notarealcode:").unwrap().key, ":notarealcode:");
        assert!(engine.resolve_emoji("   ").is_none());
    }

    #[tokio::test]
    async fn test_register_then_react_grants_and_revokes() {
        let platform = RecordingPlatform::new().with_text_channel(CHANNEL).with_role(ROLE);
        let store = MemoryStore::new();
        let engine = ReactionRoleEngine::new();

        let binding = engine
            .register(&platform, &store, registration("500", "👍", ROLE))
            .await
            .unwrap();
        assert_eq!(binding.emoji_key, "👍");
        assert!(platform.actions().contains(&Action::Reacted {
            message: MessageId::new(MESSAGE),
            emoji: thumbs_up(),
        }));

        engine
            .handle_reaction(&platform, &store, &reaction(thumbs_up(), true))
            .await;
        engine
            .handle_reaction(&platform, &store, &reaction(thumbs_up(), false))
            .await;

        let roles: Vec<Action> = platform
            .actions()
            .into_iter()
            .filter(|a| matches!(a, Action::RoleAdded { .. } | Action::RoleRemoved { .. }))
            .collect();
        assert_eq!(
            roles,
            vec![
                Action::RoleAdded {
                    user: UserId::new(42),
                    role: RoleId::new(ROLE),
                },
                Action::RoleRemoved {
                    user: UserId::new(42),
                    role: RoleId::new(ROLE),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_reregistering_overwrites_role() {
        let platform = RecordingPlatform::new().with_text_channel(CHANNEL);
        let store = MemoryStore::new();
        let engine = ReactionRoleEngine::new();

        engine
            .register(&platform, &store, registration("500", "👍", ROLE))
            .await
            .unwrap();
        engine
            .register(&platform, &store, registration("500", "👍", 88))
            .await
            .unwrap();

        let bindings = store.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].role_id, RoleId::new(88));
    }

    #[tokio::test]
    async fn test_missing_message_writes_nothing() {
        let platform = RecordingPlatform::new().with_text_channel(CHANNEL);
        platform.missing_message(MESSAGE);
        let store = MemoryStore::new();
        let engine = ReactionRoleEngine::new();

        let result = engine
            .register(&platform, &store, registration("500", "👍", ROLE))
            .await;

        assert!(matches!(result, Err(ReactionRoleError::MessageNotFound { .. })));
        assert!(store.bindings().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_message_id_is_not_found() {
        let platform = RecordingPlatform::new().with_text_channel(CHANNEL);
        let store = MemoryStore::new();
        let engine = ReactionRoleEngine::new();

        let result = engine
            .register(&platform, &store, registration("not-an-id", "👍", ROLE))
            .await;
        assert!(matches!(result, Err(ReactionRoleError::MessageNotFound { .. })));
    }

    #[tokio::test]
    async fn test_rejected_emoji_writes_nothing() {
        let platform = RecordingPlatform::new().with_text_channel(CHANNEL);
        platform.reject_emoji("banana");
        let store = MemoryStore::new();
        let engine = ReactionRoleEngine::new();

        let result = engine
            .register(&platform, &store, registration("500", "banana", ROLE))
            .await;

        match result {
            Err(ReactionRoleError::InvalidEmoji { emoji }) => assert_eq!(emoji, "banana"),
            other => panic!("expected InvalidEmoji, got {:?}", other),
        }
        assert!(store.bindings().is_empty());
    }

    #[tokio::test]
    async fn test_register_requires_text_channel() {
        let platform =
            RecordingPlatform::new().with_channel(CHANNEL, ChannelKind::Other, true, true);
        let store = MemoryStore::new();
        let engine = ReactionRoleEngine::new();

        let result = engine
            .register(&platform, &store, registration("500", "👍", ROLE))
            .await;
        assert!(matches!(result, Err(ReactionRoleError::NotTextChannel)));
    }

    #[tokio::test]
    async fn test_bot_and_unbound_reactions_ignored() {
        let platform = RecordingPlatform::new().with_role(ROLE);
        let store = MemoryStore::new();
        store.insert_binding(ReactionRoleBinding {
            guild_id: GuildId::new(GUILD),
            message_id: MessageId::new(MESSAGE),
            channel_id: ChannelId::new(CHANNEL),
            emoji_key: "👍".to_string(),
            role_id: RoleId::new(ROLE),
        });
        let engine = ReactionRoleEngine::new();

        let mut from_bot = reaction(thumbs_up(), true);
        from_bot.user_is_bot = true;
        engine.handle_reaction(&platform, &store, &from_bot).await;
        engine
            .handle_reaction(
                &platform,
                &store,
                &reaction(ReactionType::Unicode("🎉".to_string()), true),
            )
            .await;

        assert!(platform.actions().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_role_is_skipped() {
        let platform = RecordingPlatform::new();
        let store = MemoryStore::new();
        store.insert_binding(ReactionRoleBinding {
            guild_id: GuildId::new(GUILD),
            message_id: MessageId::new(MESSAGE),
            channel_id: ChannelId::new(CHANNEL),
            emoji_key: "👍".to_string(),
            role_id: RoleId::new(ROLE),
        });
        let engine = ReactionRoleEngine::new();

        engine
            .handle_reaction(&platform, &store, &reaction(thumbs_up(), true))
            .await;
        assert!(platform.actions().is_empty());
        assert_eq!(store.bindings().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_grant_keeps_binding() {
        let platform = RecordingPlatform::new().with_role(ROLE);
        platform.fail_role_changes();
        let store = MemoryStore::new();
        store.insert_binding(ReactionRoleBinding {
            guild_id: GuildId::new(GUILD),
            message_id: MessageId::new(MESSAGE),
            channel_id: ChannelId::new(CHANNEL),
            emoji_key: "👍".to_string(),
            role_id: RoleId::new(ROLE),
        });
        let engine = ReactionRoleEngine::new();

        engine
            .handle_reaction(&platform, &store, &reaction(thumbs_up(), true))
            .await;
        assert_eq!(store.bindings().len(), 1);
    }

    #[tokio::test]
    async fn test_message_delete_removes_only_its_bindings() {
        let store = MemoryStore::new();
        for (message, emoji) in [(MESSAGE, "👍"), (MESSAGE, "🎉"), (600, "👍")] {
            store.insert_binding(ReactionRoleBinding {
                guild_id: GuildId::new(GUILD),
                message_id: MessageId::new(message),
                channel_id: ChannelId::new(CHANNEL),
                emoji_key: emoji.to_string(),
                role_id: RoleId::new(ROLE),
            });
        }
        let engine = ReactionRoleEngine::new();

        let removed = engine
            .handle_messages_deleted(&store, GuildId::new(GUILD), &[MessageId::new(MESSAGE)])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        let remaining = store.bindings();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message_id, MessageId::new(600));
    }
}
