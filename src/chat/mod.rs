//! Terminal front end for a conversation.
//!
//! This module provides the pieces of the `ernie-chat` REPL on top of
//! [`ConversationStore`](crate::ConversationStore):
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//! - [`render`]: Output rendering

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
