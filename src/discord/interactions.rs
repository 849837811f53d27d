//! Slash command definitions and option parsing.

use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::CommandOptionType;
use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, RoleId};
use serenity::model::Permissions;

use crate::common::types::{CommandInvocation, OptionValue};

/// Slash commands after option extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    CountingGame {
        channel: ChannelId,
    },
    ResetCounting,
    Embed,
    ReactionRole {
        message_id: String,
        emoji: String,
        role: RoleId,
        /// Defaults to the invoking channel.
        channel: Option<ChannelId>,
    },
}

impl SlashCommand {
    /// `None` for unknown commands or missing required options.
    pub fn from_invocation(invocation: &CommandInvocation) -> Option<Self> {
        let string = |name: &str| match invocation.option(name) {
            Some(OptionValue::String(value)) => Some(value.trim().to_string()),
            _ => None,
        };
        let channel = |name: &str| match invocation.option(name) {
            Some(OptionValue::Channel(id)) => Some(*id),
            _ => None,
        };

        match invocation.name.as_str() {
            "countinggame" => Some(Self::CountingGame {
                channel: channel("channel")?,
            }),
            "resetcounting" => Some(Self::ResetCounting),
            "embed" => Some(Self::Embed),
            "reactionrole" => {
                let role = match invocation.option("role") {
                    Some(OptionValue::Role(id)) => *id,
                    _ => return None,
                };
                Some(Self::ReactionRole {
                    message_id: string("message_id")?,
                    emoji: string("emoji")?,
                    role,
                    channel: channel("channel"),
                })
            }
            _ => None,
        }
    }
}

/// The four global commands registered on Ready.
pub fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("countinggame")
            .description("Sets up the counting game in a specified channel (Admin/Owner only).")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "The channel where the counting game will take place.",
                )
                .required(true),
            ),
        CreateCommand::new("resetcounting")
            .description(
                "Resets the counting game channel and restarts the count from 1 (Admin/Owner only).",
            )
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new("embed")
            .description("Starts an interactive conversation to build and send a new embed.")
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new("reactionrole")
            .description("Sets up a reaction role on a specific message (Admin only).")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "message_id",
                    "The ID of the message to monitor for reactions.",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "emoji",
                    "The emoji users must react with (e.g., 👍 or custom emoji ID).",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Role, "role", "The role to assign/remove.")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "The channel the message is in (defaults to current channel).",
                )
                .required(false)
                .channel_types(vec![ChannelType::Text]),
            ),
    ]
}
