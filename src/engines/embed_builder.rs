//! Interactive embed builder.
//!
//! An admin starts a draft with `/embed` and answers one prompt per message
//! in the same channel: title, description, footer, colour, target channel,
//! then `send`. Each user has at most one draft. Drafts live in memory only.
//!
//! Time never comes from the system clock here. Callers pass `now`, and
//! [`EmbedBuilderEngine::expire`] is driven by the dispatcher tick.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use fancy_regex::Regex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::common::error::EmbedError;
use crate::common::types::{ChannelKind, EmbedSpec, IncomingMessage, UserSummary};
use crate::discord::platform::ChatPlatform;

pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_DESCRIPTION_CHARS: usize = 4096;
pub const MAX_FOOTER_CHARS: usize = 2048;

/// Sidebar colour used until the user picks one.
pub const DEFAULT_COLOR: u32 = 0x3498db;

const NAMED_COLORS: &[(&str, u32)] = &[
    ("RED", 0xff0000),
    ("GREEN", 0x00ff00),
    ("BLUE", 0x0000ff),
    ("YELLOW", 0xffff00),
    ("PURPLE", 0x9b59b6),
    ("CYAN", 0x00ffff),
    ("DEFAULT", DEFAULT_COLOR),
];

/// Which answer the draft is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStage {
    AwaitingTitle,
    AwaitingDescription,
    AwaitingFooter,
    AwaitingColor,
    AwaitingChannel,
    AwaitingSend,
}

#[derive(Debug, Clone)]
pub struct EmbedDraft {
    pub title: String,
    pub description: String,
    pub footer: Option<String>,
    pub color: u32,
    pub target_channel: Option<ChannelId>,
    pub stage: DraftStage,
    guild_id: GuildId,
    origin_channel: ChannelId,
    user: UserSummary,
    /// Set until the first qualifying input arrives.
    first_input_deadline: Option<Instant>,
    idle_deadline: Instant,
}

impl EmbedDraft {
    fn to_embed(&self) -> EmbedSpec {
        EmbedSpec {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            color: Some(self.color),
            footer: self.footer.clone(),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// Result of applying one input to a draft.
enum Step {
    /// Input accepted and consumed.
    Advance,
    /// Input rejected. The draft stays where it was and the message is kept.
    Reject(String),
    /// Draft finished, successfully or not.
    Finished,
}

pub struct EmbedBuilderEngine {
    drafts: HashMap<UserId, EmbedDraft>,
    timeout: Duration,
    channel_mention: Regex,
}

impl EmbedBuilderEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            drafts: HashMap::new(),
            timeout,
            channel_mention: Regex::new(r"<#(\d+)>").expect("valid channel mention pattern"),
        }
    }

    #[cfg(test)]
    pub fn draft(&self, user: UserId) -> Option<&EmbedDraft> {
        self.drafts.get(&user)
    }

    pub fn active_drafts(&self) -> usize {
        self.drafts.len()
    }

    /// Open a draft for `user` in `channel` and return the title prompt.
    /// The caller posts it once the interaction has been answered.
    pub fn start(
        &mut self,
        guild_id: GuildId,
        channel: ChannelId,
        user: &UserSummary,
        now: Instant,
    ) -> Result<String, EmbedError> {
        if self.drafts.contains_key(&user.id) {
            return Err(EmbedError::AlreadyActive);
        }

        let deadline = now + self.timeout;
        self.drafts.insert(
            user.id,
            EmbedDraft {
                title: String::new(),
                description: String::new(),
                footer: None,
                color: DEFAULT_COLOR,
                target_channel: None,
                stage: DraftStage::AwaitingTitle,
                guild_id,
                origin_channel: channel,
                user: user.clone(),
                first_input_deadline: Some(deadline),
                idle_deadline: deadline,
            },
        );
        info!("Embed draft started by {}", user.name);

        Ok(format!(
            "Hey {}, please type the **TITLE** you want for your embed. (Max {} chars)",
            user.mention(),
            MAX_TITLE_CHARS
        ))
    }

    /// Feed a message to its author's draft. Returns `true` when the message
    /// belonged to a draft conversation.
    pub async fn handle_message(
        &mut self,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
        now: Instant,
    ) -> bool {
        let belongs = self
            .drafts
            .get(&message.author.id)
            .is_some_and(|draft| draft.origin_channel == message.channel_id);
        if !belongs {
            return false;
        }
        let Some(mut draft) = self.drafts.remove(&message.author.id) else {
            return false;
        };

        draft.first_input_deadline = None;
        draft.idle_deadline = now + self.timeout;

        let input = message.content.trim();
        if input.eq_ignore_ascii_case("cancel") {
            delete_input(platform, message).await;
            say(platform, draft.origin_channel, "🗑️ Embed draft successfully cancelled.").await;
            info!("Embed draft cancelled by {}", draft.user.name);
            return true;
        }

        match self.apply(platform, &mut draft, input).await {
            Step::Advance => {
                delete_input(platform, message).await;
                self.drafts.insert(message.author.id, draft);
            }
            Step::Reject(reason) => {
                say(platform, draft.origin_channel, &reason).await;
                self.drafts.insert(message.author.id, draft);
            }
            Step::Finished => {
                delete_input(platform, message).await;
            }
        }
        true
    }

    /// Drop drafts whose timers elapsed and tell their channels.
    pub async fn expire(&mut self, platform: &dyn ChatPlatform, now: Instant) {
        let expired: Vec<UserId> = self
            .drafts
            .iter()
            .filter(|(_, draft)| {
                draft.first_input_deadline.is_some_and(|d| now >= d) || now >= draft.idle_deadline
            })
            .map(|(user, _)| *user)
            .collect();

        for user in expired {
            let Some(draft) = self.drafts.remove(&user) else {
                continue;
            };
            let notice = if draft.first_input_deadline.is_some() {
                format!(
                    "⏳ {} Embed draft cancelled due to 5-minute inactivity.",
                    draft.user.mention()
                )
            } else {
                "⏳ Embed draft cancelled due to inactivity.".to_string()
            };
            info!("Embed draft of {} timed out", draft.user.name);
            say(platform, draft.origin_channel, &notice).await;
        }
    }

    async fn apply(&self, platform: &dyn ChatPlatform, draft: &mut EmbedDraft, input: &str) -> Step {
        if input.is_empty() {
            return Step::Reject("❌ Please reply with some text.".to_string());
        }

        match draft.stage {
            DraftStage::AwaitingTitle => {
                if input.chars().count() > MAX_TITLE_CHARS {
                    return Step::Reject(
                        "❌ Title is too long! Please keep it under 256 characters.".to_string(),
                    );
                }
                draft.title = input.to_string();
                draft.stage = DraftStage::AwaitingDescription;
                let prompt = format!(
                    "✅ Title set to: **{}**.\n\nNext, please type the **DESCRIPTION**. (Supports live mentions and basic formatting like `\\n` for new lines).",
                    input
                );
                say(platform, draft.origin_channel, &prompt).await;
                Step::Advance
            }
            DraftStage::AwaitingDescription => {
                if input.chars().count() > MAX_DESCRIPTION_CHARS {
                    return Step::Reject(
                        "❌ Description is too long! Please keep it under 4096 characters."
                            .to_string(),
                    );
                }
                draft.description = input.to_string();
                draft.stage = DraftStage::AwaitingFooter;
                say(
                    platform,
                    draft.origin_channel,
                    "✅ Description set.\n\nNext, please type the **FOOTER** text. (Optional - type \"skip\" if you don't want a footer). (Max 2048 chars)",
                )
                .await;
                Step::Advance
            }
            DraftStage::AwaitingFooter => {
                if input.eq_ignore_ascii_case("skip") {
                    draft.footer = None;
                } else if input.chars().count() > MAX_FOOTER_CHARS {
                    return Step::Reject(
                        "❌ Footer is too long! Please keep it under 2048 characters.".to_string(),
                    );
                } else {
                    draft.footer = Some(input.to_string());
                }
                draft.stage = DraftStage::AwaitingColor;
                say(
                    platform,
                    draft.origin_channel,
                    "✅ Footer set.\n\nFinally, please provide the **COLOR** for the sidebar. (Example: `RED`, `BLUE`, or hex code like `0xFF0000`)",
                )
                .await;
                Step::Advance
            }
            DraftStage::AwaitingColor => {
                let Some(color) = parse_color(input) else {
                    return Step::Reject(
                        "❌ Invalid color. Please use a valid color name (RED, BLUE) or a hex code (e.g., 0xFF0000).".to_string(),
                    );
                };
                draft.color = color;
                draft.stage = DraftStage::AwaitingChannel;
                say(
                    platform,
                    draft.origin_channel,
                    "✅ Color set.\n\nNext, please **MENTION THE CHANNEL** where you want the embed sent (e.g., `#announcements`).",
                )
                .await;
                Step::Advance
            }
            DraftStage::AwaitingChannel => self.choose_channel(platform, draft, input).await,
            DraftStage::AwaitingSend => {
                if !input.eq_ignore_ascii_case("send") {
                    return Step::Reject(
                        "Unrecognized command. Type `send` to send or `cancel` to discard."
                            .to_string(),
                    );
                }
                finalize(platform, draft).await;
                Step::Finished
            }
        }
    }

    async fn choose_channel(
        &self,
        platform: &dyn ChatPlatform,
        draft: &mut EmbedDraft,
        input: &str,
    ) -> Step {
        let invalid = || Step::Reject("❌ Please mention a valid channel (e.g., `#general`).".to_string());

        let mentioned = self.channel_mentions(input);
        let [target] = mentioned.as_slice() else {
            return invalid();
        };

        let channel = match platform.channel_info(draft.guild_id, *target).await {
            Ok(Some(channel)) => channel,
            Ok(None) => return invalid(),
            Err(e) => {
                warn!("Failed to inspect channel {}: {}", target, e);
                return invalid();
            }
        };

        if channel.kind != ChannelKind::Text {
            return Step::Reject("❌ The target must be a text channel.".to_string());
        }
        if !channel.bot_can_send || !channel.bot_can_embed {
            return Step::Reject(format!(
                "❌ I do not have permission to send messages and/or embeds in <#{}>. Please check my permissions.",
                channel.id
            ));
        }

        draft.target_channel = Some(channel.id);
        draft.stage = DraftStage::AwaitingSend;

        let preview = format!(
            "🎉 **Embed Complete!** It will be sent to <#{}>. Here is the preview:",
            channel.id
        );
        if let Err(e) = platform
            .send_embed(draft.origin_channel, Some(&preview), &draft.to_embed())
            .await
        {
            warn!("Failed to send embed preview: {}", e);
        }
        say(
            platform,
            draft.origin_channel,
            "Last step: Type `send` to finalize and send the embed, or type `cancel` to discard it.",
        )
        .await;
        Step::Advance
    }

    fn channel_mentions(&self, input: &str) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = Vec::new();
        for captures in self.channel_mention.captures_iter(input).flatten() {
            let Some(id) = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .filter(|id| *id != 0)
                .map(ChannelId::new)
            else {
                continue;
            };
            if !channels.contains(&id) {
                channels.push(id);
            }
        }
        channels
    }
}

async fn finalize(platform: &dyn ChatPlatform, draft: &EmbedDraft) {
    let target = match draft.target_channel {
        Some(target) => platform
            .channel_info(draft.guild_id, target)
            .await
            .ok()
            .flatten(),
        None => None,
    };
    let Some(target) = target else {
        say(
            platform,
            draft.origin_channel,
            "❌ Could not find the target channel. Draft cleared.",
        )
        .await;
        return;
    };

    match platform.send_embed(target.id, None, &draft.to_embed()).await {
        Ok(_) => {
            info!("Embed from {} sent to {}", draft.user.name, target.id);
            let notice = format!(
                "🥳 **Success!** Your embed has been sent to <#{}>. Draft cleared.",
                target.id
            );
            say(platform, draft.origin_channel, &notice).await;
        }
        Err(e) => {
            warn!("Embed send error: {}", e);
            let notice = format!(
                "❌ Failed to send embed to <#{}>. Check my permissions (Send Messages, Embed Links).",
                target.id
            );
            say(platform, draft.origin_channel, &notice).await;
        }
    }
}

async fn say(platform: &dyn ChatPlatform, channel: ChannelId, content: &str) {
    if let Err(e) = platform.send_message(channel, content).await {
        warn!("Failed to send embed builder message: {}", e);
    }
}

async fn delete_input(platform: &dyn ChatPlatform, message: &IncomingMessage) {
    if let Err(e) = platform.delete_message(message.channel_id, message.id).await {
        debug!("Could not delete draft input {}: {}", message.id, e);
    }
}

/// Resolve a colour name or a `0x`/`#` prefixed hex literal.
pub fn parse_color(input: &str) -> Option<u32> {
    let upper = input.trim().to_ascii_uppercase();
    if let Some((_, color)) = NAMED_COLORS.iter().find(|(name, _)| *name == upper) {
        return Some(*color);
    }

    let hex = upper
        .strip_prefix("0X")
        .or_else(|| upper.strip_prefix('#'))?;
    if hex.is_empty() || hex.len() > 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
