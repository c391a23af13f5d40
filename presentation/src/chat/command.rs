//! Slash commands understood by the chat REPL

/// A parsed `/command` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Tools,
    New,
    Sessions,
    Summary,
    Execute,
    Stream,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    /// Parse a line; `None` when it is not a command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('/') {
            return None;
        }

        let name = line.split_whitespace().next().unwrap_or(line);
        let command = match name {
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/tools" => ReplCommand::Tools,
            "/new" => ReplCommand::New,
            "/sessions" => ReplCommand::Sessions,
            "/summary" => ReplCommand::Summary,
            "/execute" | "/exec" => ReplCommand::Execute,
            "/stream" => ReplCommand::Stream,
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        };
        Some(command)
    }

    /// Help text listing every command
    pub fn help() -> &'static str {
        "Commands:
  /help, /h, /?     - Show this help
  /tools            - List tools by provider
  /new              - Start a new session
  /sessions         - List sessions
  /summary          - Summarize the current session
  /execute          - Run the pending plan of the current session
  /stream           - Toggle streaming output
  /quit, /exit, /q  - Exit chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(ReplCommand::parse("list my files"), None);
        assert_eq!(ReplCommand::parse(""), None);
    }

    #[test]
    fn test_parse_commands_and_aliases() {
        assert_eq!(ReplCommand::parse("/tools"), Some(ReplCommand::Tools));
        assert_eq!(ReplCommand::parse("  /q  "), Some(ReplCommand::Quit));
        assert_eq!(ReplCommand::parse("/exec"), Some(ReplCommand::Execute));
        assert_eq!(ReplCommand::parse("/stream now"), Some(ReplCommand::Stream));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            ReplCommand::parse("/frobnicate"),
            Some(ReplCommand::Unknown("/frobnicate".to_string()))
        );
    }

    #[test]
    fn test_help_mentions_every_command() {
        for name in ["/tools", "/new", "/sessions", "/summary", "/execute", "/stream", "/quit"] {
            assert!(ReplCommand::help().contains(name), "{name} missing from help");
        }
    }
}
