use serde::{Deserialize, Serialize};

use crate::types::Usage;

/// Body returned by the completion endpoint.
///
/// A provider-level failure may arrive with HTTP 200; in that case `error_code` is set and
/// `result` is usually absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    /// Identifier of this completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Object type, e.g. `chat.completion`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Creation time in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,

    /// The assistant's reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Whether the provider asks the caller to drop prior history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_clear_history: Option<bool>,

    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Provider error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,

    /// Provider error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl CompletionResponse {
    /// Create a successful response carrying `result`.
    pub fn with_result(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            ..Self::default()
        }
    }

    /// Returns true if the body reports a provider-level error.
    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}
