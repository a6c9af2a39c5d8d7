// Public modules
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod sse;
pub mod store;
pub mod token;
pub mod types;

// Re-exports
pub use client::Ernie;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use sse::{CompletionStream, parse_line, process_lines};
pub use store::{CompletionBackend, ConversationState, ConversationStore, SUGGESTIONS};
pub use token::{AccessToken, Clock, ManualClock, SystemClock, TokenCache};
pub use types::*;

pub use tokio_util::sync::CancellationToken;
