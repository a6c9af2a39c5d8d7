// Public modules
pub mod completion_request;
pub mod completion_response;
pub mod message;
pub mod message_param;
pub mod stream_chunk;
pub mod token_response;
pub mod usage;

// Re-exports
pub use completion_request::CompletionRequest;
pub use completion_response::CompletionResponse;
pub use message::{Message, WELCOME_MESSAGE_ID, WELCOME_MESSAGE_TEXT};
pub use message_param::{MessageParam, MessageRole};
pub use stream_chunk::StreamChunk;
pub use token_response::TokenResponse;
pub use usage::Usage;
