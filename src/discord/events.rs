//! Conversion from serenity gateway models into [`BotEvent`]s.

use serenity::model::application::{CommandDataOptionValue, CommandInteraction};
use serenity::model::channel::{Message, Reaction};
use serenity::model::id::UserId;
use serenity::prelude::*;
use tracing::warn;

use crate::common::types::{
    BotEvent, CommandInvocation, IncomingMessage, InteractionHandle, OptionValue, ReactionEvent,
};
use crate::discord::platform::summarize_user;

/// Bot flag from what the event and the cache already know, if anything.
fn known_bot_flag(
    bot_id: UserId,
    user: Option<UserId>,
    member_bot: Option<bool>,
    cached_bot: Option<bool>,
) -> Option<bool> {
    match user {
        Some(user) if user == bot_id => Some(true),
        _ => member_bot.or(cached_bot),
    }
}

pub fn message_event(context: &Context, message: &Message) -> BotEvent {
    BotEvent::Message(IncomingMessage {
        id: message.id,
        channel_id: message.channel_id,
        guild_id: message.guild_id,
        author: summarize_user(&message.author),
        content: message.content.clone(),
        mentions: message.mentions.iter().map(summarize_user).collect(),
        author_permissions: message.author_permissions(&context.cache),
    })
}

pub fn command_event(command: &CommandInteraction) -> BotEvent {
    BotEvent::Command(CommandInvocation {
        handle: InteractionHandle {
            id: command.id,
            token: command.token.clone(),
        },
        name: command.data.name.clone(),
        guild_id: command.guild_id,
        channel_id: command.channel_id,
        user: summarize_user(&command.user),
        member_permissions: command.member.as_ref().and_then(|member| member.permissions),
        options: command
            .data
            .options
            .iter()
            .map(|option| (option.name.clone(), option_value(&option.value)))
            .collect(),
    })
}

/// Reactions by bots are flagged so the role engine can skip them.
/// Removal events carry no member, so the cache is consulted and then the
/// HTTP API. A user that cannot be looked up is treated as a bot.
pub async fn reaction_event(context: &Context, reaction: &Reaction, added: bool) -> BotEvent {
    let bot_id = context.cache.current_user().id;
    let member_bot = reaction.member.as_ref().map(|member| member.user.bot);
    let cached_bot = reaction
        .user_id
        .and_then(|user| context.cache.user(user).map(|cached| cached.bot));

    let known = known_bot_flag(bot_id, reaction.user_id, member_bot, cached_bot);
    let user_is_bot = match (known, reaction.user_id) {
        (Some(flag), _) => flag,
        (None, Some(user)) => match context.http.get_user(user).await {
            Ok(fetched) => fetched.bot,
            Err(e) => {
                warn!("Failed to look up reacting user {}: {}", user, e);
                true
            }
        },
        (None, None) => true,
    };

    BotEvent::Reaction(ReactionEvent {
        guild_id: reaction.guild_id,
        channel_id: reaction.channel_id,
        message_id: reaction.message_id,
        user_id: reaction.user_id,
        user_is_bot,
        emoji: reaction.emoji.clone(),
        added,
    })
}

fn option_value(value: &CommandDataOptionValue) -> OptionValue {
    match value {
        CommandDataOptionValue::String(text) => OptionValue::String(text.clone()),
        CommandDataOptionValue::Channel(id) => OptionValue::Channel(*id),
        CommandDataOptionValue::Role(id) => OptionValue::Role(*id),
        _ => OptionValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use serenity::model::id::{ChannelId, RoleId};

    use super::*;

    #[test]
    fn test_option_values() {
        assert_eq!(
            option_value(&CommandDataOptionValue::String("👍".to_string())),
            OptionValue::String("👍".to_string())
        );
        assert_eq!(
            option_value(&CommandDataOptionValue::Channel(ChannelId::new(5))),
            OptionValue::Channel(ChannelId::new(5))
        );
        assert_eq!(
            option_value(&CommandDataOptionValue::Role(RoleId::new(6))),
            OptionValue::Role(RoleId::new(6))
        );
        assert_eq!(
            option_value(&CommandDataOptionValue::Integer(3)),
            OptionValue::Other
        );
    }

    #[test]
    fn test_known_bot_flag() {
        let bot = UserId::new(999);
        let user = UserId::new(8);

        assert_eq!(known_bot_flag(bot, Some(bot), Some(false), None), Some(true));
        assert_eq!(known_bot_flag(bot, Some(user), Some(false), Some(true)), Some(false));
        assert_eq!(known_bot_flag(bot, Some(user), None, Some(true)), Some(true));
        // Removal with a cold cache needs a lookup
        assert_eq!(known_bot_flag(bot, Some(user), None, None), None);
        assert_eq!(known_bot_flag(bot, None, None, None), None);
    }
}
