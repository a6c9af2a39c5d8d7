//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Reset the conversation to the welcome message.
    Clear,

    /// Switch between streamed and batch replies.
    Stream(bool),

    /// Show the starter prompts.
    Suggestions,

    /// Reprint the conversation log.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use ernie_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/stream on").is_some());
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "suggest" | "suggestions" => ChatCommand::Suggestions,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_on_off(argument: &str) -> Option<bool> {
    match argument.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns the help text for available commands.
pub fn help_text() -> &'static str {
    "Commands:
  /clear          Start over from the welcome message
  /stream on|off  Stream replies as they are generated
  /suggest        Show some prompts to start with
  /history        Print the conversation so far
  /help           Show this help
  /quit           Exit

Press Ctrl+C while waiting for a reply to stop it."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("  what is 1/2?"), None);
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/HELP"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command(" /exit "), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/suggest"), Some(ChatCommand::Suggestions));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn stream_toggle() {
        assert_eq!(parse_command("/stream on"), Some(ChatCommand::Stream(true)));
        assert_eq!(parse_command("/stream OFF"), Some(ChatCommand::Stream(false)));
        assert!(matches!(
            parse_command("/stream"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/stream maybe"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model x"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn help_mentions_every_command() {
        let help = help_text();
        for command in ["/clear", "/stream", "/suggest", "/history", "/help", "/quit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
