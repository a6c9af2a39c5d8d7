//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the REPL runs with.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::config::ClientConfig;

/// Command-line arguments for the ernie-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// API base URL, overriding ERNIE_API_BASE_URL.
    #[arrrg(optional, "API base URL (default: $ERNIE_API_BASE_URL)", "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Stream replies as they are generated.
    #[arrrg(flag, "Stream replies as they are generated")]
    pub stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Settings for the API client.
    pub client: ClientConfig,

    /// Whether replies are streamed.
    pub stream: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig around `client` with batch replies and color.
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            stream: false,
            use_color: true,
        }
    }

    /// Enables or disables streaming.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Resolve command-line arguments on top of an environment-derived client config.
    pub fn from_args(args: ChatArgs, client: ClientConfig) -> Self {
        let mut client = client;
        if let Some(base_url) = args.base_url {
            client = client.with_base_url(base_url);
        }
        if let Some(secs) = args.timeout {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        ChatConfig {
            client,
            stream: args.stream,
            use_color: !args.no_color,
        }
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        Self::from_args(args, ClientConfig::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new(ClientConfig::new());
        assert!(!config.stream);
        assert!(config.use_color);
        assert_eq!(config.client, ClientConfig::new());
    }

    #[test]
    fn config_from_args_defaults() {
        let base = ClientConfig::new().with_base_url("https://env.example.com");
        let config = ChatConfig::from_args(ChatArgs::default(), base.clone());
        assert_eq!(config.client, base);
        assert!(!config.stream);
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            base_url: Some("https://cli.example.com".to_string()),
            timeout: Some(5),
            stream: true,
            no_color: true,
        };
        let config = ChatConfig::from_args(args, ClientConfig::new().with_base_url("https://env.example.com"));
        assert_eq!(config.client.base_url.as_deref(), Some("https://cli.example.com"));
        assert_eq!(config.client.timeout, Duration::from_secs(5));
        assert!(config.stream);
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new(ClientConfig::new())
            .with_stream(true)
            .without_color();
        assert!(config.stream);
        assert!(!config.use_color);
    }
}
