//! Prefix text commands (.help, .ship, etc).
//!
//! Handles tokenizing a message into a command. Execution lives in the
//! dispatcher.

use tracing::debug;

/// Text commands understood after the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    Help,
    /// Partner comes from the message mentions.
    Ship,
    /// `None` when the argument is missing or not a number in 1..=100.
    Purge { amount: Option<u8> },
    Flip,
    /// Target comes from the message mentions.
    UserInfo,
    EightBall { question: String },
    Status,
    Joke,
}

/// Largest batch a single purge may delete.
pub const MAX_PURGE: u8 = 100;

/// Parse `content` as a prefixed command.
///
/// Returns `None` for messages without the prefix and for unknown commands.
pub fn parse_text_command(content: &str, prefix: &str) -> Option<TextCommand> {
    let rest = content.trim().strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let command = parts.next()?.to_lowercase();
    let args: Vec<&str> = parts.collect();

    debug!("Processing command: {} with args: {:?}", command, args);

    let parsed = match command.as_str() {
        "help" => TextCommand::Help,
        "ship" => TextCommand::Ship,
        "purge" => TextCommand::Purge {
            amount: args.first().and_then(|arg| parse_purge_amount(arg)),
        },
        "flip" => TextCommand::Flip,
        "userinfo" => TextCommand::UserInfo,
        "8ball" => TextCommand::EightBall {
            question: args.join(" "),
        },
        "status" => TextCommand::Status,
        "joke" => TextCommand::Joke,
        _ => return None,
    };
    Some(parsed)
}

fn parse_purge_amount(arg: &str) -> Option<u8> {
    arg.parse::<u8>()
        .ok()
        .filter(|amount| (1..=MAX_PURGE).contains(amount))
}

/// `hello!` and `hey!` as a whole message, any case.
pub fn is_greeting(content: &str) -> bool {
    let content = content.trim();
    content.eq_ignore_ascii_case("hello!") || content.eq_ignore_ascii_case("hey!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_required() {
        assert_eq!(parse_text_command("help", "."), None);
        assert_eq!(parse_text_command(".help", "."), Some(TextCommand::Help));
        assert_eq!(parse_text_command("  .HELP  ", "."), Some(TextCommand::Help));
    }

    #[test]
    fn test_unknown_command_ignored() {
        assert_eq!(parse_text_command(".dance", "."), None);
        assert_eq!(parse_text_command(".", "."), None);
        assert_eq!(parse_text_command(". help", "."), Some(TextCommand::Help));
    }

    #[test]
    fn test_purge_amount_bounds() {
        let amount = |content| match parse_text_command(content, ".") {
            Some(TextCommand::Purge { amount }) => amount,
            other => panic!("unexpected parse {:?}", other),
        };
        assert_eq!(amount(".purge 10"), Some(10));
        assert_eq!(amount(".purge 100"), Some(100));
        assert_eq!(amount(".purge 0"), None);
        assert_eq!(amount(".purge 101"), None);
        assert_eq!(amount(".purge -4"), None);
        assert_eq!(amount(".purge lots"), None);
        assert_eq!(amount(".purge"), None);
    }

    #[test]
    fn test_eight_ball_keeps_question() {
        assert_eq!(
            parse_text_command(".8ball will   it rain?", "."),
            Some(TextCommand::EightBall {
                question: "will it rain?".to_string()
            })
        );
        assert_eq!(
            parse_text_command(".8ball", "."),
            Some(TextCommand::EightBall {
                question: String::new()
            })
        );
    }

    #[test]
    fn test_custom_prefix() {
        assert_eq!(parse_text_command("!flip", "!"), Some(TextCommand::Flip));
        assert_eq!(parse_text_command(".flip", "!"), None);
        assert_eq!(
            parse_text_command("kira:status", "kira:"),
            Some(TextCommand::Status)
        );
    }

    #[test]
    fn test_greetings() {
        assert!(is_greeting("Hello!"));
        assert!(is_greeting("HEY!"));
        assert!(!is_greeting("hey"));
        assert!(!is_greeting("hello! there"));
    }
}
