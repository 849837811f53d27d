//! Stateless reply formatters for the text commands.

use std::time::Duration;

use chrono::Utc;
use serenity::model::id::{GuildId, UserId};

use crate::common::types::{EmbedField, EmbedSpec, MemberInfo, UserSummary};

pub const BRAND_COLOR: u32 = 0x3498db;
const EIGHT_BALL_COLOR: u32 = 0x9b59b6;
const STATUS_COLOR: u32 = 0x00ff00;

pub const EIGHT_BALL_RESPONSES: [&str; 20] = [
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes, definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

pub fn help_embed(prefix: &str) -> EmbedSpec {
    let p = prefix;
    EmbedSpec {
        title: Some("Kira Bot Commands".to_string()),
        description: Some("Here is a list of commands you can use:".to_string()),
        color: Some(BRAND_COLOR),
        footer: Some(format!("Prefix: {}", p)),
        fields: vec![
            EmbedField::new(
                "Admin Commands (Slash)",
                "`/countinggame` - Setup the counting channel.\n`/resetcounting` - Reset the count to 1.\n`/embed` - Starts an interactive conversation to build an embed.\n`/reactionrole` - Set up a reaction role on a message.",
                false,
            ),
            EmbedField::new(
                "Moderation & Utility (Admin Required)",
                format!("`{p}purge [number]` - Delete messages."),
                false,
            ),
            EmbedField::new(
                "General Utility",
                format!(
                    "`{p}status` - Check the bot's ping and uptime.\n`{p}userinfo [user]` - Get information about a user."
                ),
                false,
            ),
            EmbedField::new(
                "Counting Game",
                "Just post the next number in the counting channel!",
                false,
            ),
            EmbedField::new(
                "Fun Commands",
                format!(
                    "`{p}joke` - Get a random joke.\n`{p}8ball [question]` - Ask the magic 8-ball a question.\n`{p}flip` - Flip a coin (Heads or Tails).\n`{p}ship [user]` - Calculate compatibility."
                ),
                false,
            ),
        ],
        ..Default::default()
    }
}

/// Deterministic compatibility in `0..=100` for an ordered pair of users.
///
/// Hashes the first five characters of both ids with `c + (h << 5) - h`,
/// where only the shift wraps to 32 bits.
pub fn ship_compatibility(first: UserId, second: UserId) -> u32 {
    let first = first.to_string();
    let second = second.to_string();
    let seed: String = first.chars().take(5).chain(second.chars().take(5)).collect();

    let mut hash: i64 = 0;
    for c in seed.chars() {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        hash = i64::from(u32::from(c)) + (shifted - hash);
    }
    (hash % 101).unsigned_abs() as u32
}

/// First half of one name glued to the second half of the other.
pub fn ship_name(first: &str, second: &str) -> String {
    let first: Vec<char> = first.chars().filter(char::is_ascii_alphanumeric).collect();
    let second: Vec<char> = second.chars().filter(char::is_ascii_alphanumeric).collect();

    let head = first.len().div_ceil(2);
    let tail = second.len().div_ceil(2);
    let name: String = first[..head]
        .iter()
        .chain(&second[second.len() - tail..])
        .collect();

    let mut chars = name.chars();
    match chars.next() {
        Some(initial) => initial.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn ship_embed(author: &UserSummary, partner: &UserSummary) -> EmbedSpec {
    let compatibility = ship_compatibility(author.id, partner.id);
    let (color, description) = match compatibility {
        90.. => (0x00ff00, "A perfect match! Soulmates detected!".to_string()),
        60..=89 => (
            0xffa500,
            "A strong connection! This ship has smooth sailing ahead.".to_string(),
        ),
        30..=59 => (
            0xffff00,
            "There's potential, but watch out for a few icebergs.".to_string(),
        ),
        _ => (
            0xff0000,
            format!(
                "Compatibility between **{}** and **{}**.",
                author.name, partner.name
            ),
        ),
    };

    EmbedSpec {
        title: Some("Compatibility Calculator".to_string()),
        description: Some(description),
        color: Some(color),
        footer: Some(format!("Requested by {}", author.tag)),
        fields: vec![
            EmbedField::new(
                "Pair",
                format!("{} + {}", author.mention(), partner.mention()),
                false,
            ),
            EmbedField::new(
                "Ship Name",
                format!("**{}**", ship_name(&author.name, &partner.name)),
                false,
            ),
            EmbedField::new("Compatibility", format!("**{}%**", compatibility), false),
        ],
        ..Default::default()
    }
}

pub fn eight_ball_embed(question: &str, answer: &str, asker: &UserSummary) -> EmbedSpec {
    EmbedSpec {
        title: Some("Magic 8-Ball".to_string()),
        color: Some(EIGHT_BALL_COLOR),
        footer: Some(format!("Asked by {}", asker.tag)),
        fields: vec![
            EmbedField::new("Question", question, false),
            EmbedField::new("Answer", answer, false),
        ],
        ..Default::default()
    }
}

pub fn flip_message(heads: bool) -> String {
    let outcome = if heads { "Heads" } else { "Tails" };
    format!("🪙 The coin landed on **{}**!", outcome)
}

pub fn userinfo_embed(member: &MemberInfo, guild: GuildId, requester: &UserSummary) -> EmbedSpec {
    let roles: Vec<String> = member
        .roles
        .iter()
        .filter(|role| role.get() != guild.get())
        .map(|role| format!("<@&{}>", role))
        .collect();
    let roles = if roles.is_empty() {
        "None".to_string()
    } else {
        roles.join(", ")
    };
    let joined = member
        .joined_at
        .map(|t| format!("<t:{}:R>", t))
        .unwrap_or_else(|| "Unknown".to_string());

    EmbedSpec {
        title: Some(format!("User Information: {}", member.user.tag)),
        color: Some(member.color.unwrap_or(BRAND_COLOR)),
        thumbnail: Some(member.avatar_url.clone()),
        footer: Some(format!("Requested by {}", requester.tag)),
        fields: vec![
            EmbedField::new("User ID", member.user.id.to_string(), false),
            EmbedField::new(
                "Account Creation Date",
                format!("<t:{}:R>", member.created_at),
                false,
            ),
            EmbedField::new("Joined Server Date", joined, false),
            EmbedField::new("Roles", roles, false),
        ],
        ..Default::default()
    }
}

/// `Xd, Xh, Xm, Xs`.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{}d, {}h, {}m, {}s", days, hours, minutes, seconds)
}

fn ansi_green(value: &str) -> String {
    format!("```ansi\n\u{1b}[0;32m{}\u{1b}[0m\n```", value)
}

pub fn status_embed(latency: Option<Duration>, guilds: usize, uptime: Duration) -> EmbedSpec {
    let ping = latency
        .map(|latency| format!("{}ms", latency.as_millis()))
        .unwrap_or_else(|| "N/A".to_string());

    EmbedSpec {
        title: Some("Bot Status Report".to_string()),
        color: Some(STATUS_COLOR),
        footer: Some("Updated Live".to_string()),
        timestamp: Some(Utc::now()),
        fields: vec![
            EmbedField::new("**Connection**", ansi_green("Online"), true),
            EmbedField::new("**Ping**", ansi_green(&ping), true),
            EmbedField::new("**Servers**", ansi_green(&guilds.to_string()), true),
            EmbedField::new("**Uptime**", ansi_green(&format_uptime(uptime)), false),
        ],
        ..Default::default()
    }
}

pub fn joke_message(joke: &str) -> String {
    format!("**Here's a joke!**\n\n{}", joke)
}
