use serde::{Deserialize, Serialize};

use crate::types::MessageParam;

/// Body of a request to the completion endpoint.
///
/// The client sends exactly one user turn per request; earlier turns stay in the local
/// conversation log and are not replayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// Conversation history, oldest first.
    pub messages: Vec<MessageParam>,

    /// Whether the reply should be streamed as `data: ` lines.
    pub stream: bool,

    /// Nominal identifier of the end user.
    pub user_id: String,

    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create a single-turn request for `text`.
    pub fn single_turn(
        text: impl Into<String>,
        stream: bool,
        user_id: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            messages: vec![MessageParam::user(text)],
            stream,
            user_id: user_id.into(),
            temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn batch_request_shape() {
        let request = CompletionRequest::single_turn("hello", false, "web_user", 0.5);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "messages": [{"role": "user", "content": "hello"}],
                "stream": false,
                "user_id": "web_user",
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn streaming_flag_serializes() {
        let request = CompletionRequest::single_turn("hello", true, "web_user", 0.5);
        assert_eq!(to_value(&request).unwrap()["stream"], json!(true));
    }
}
