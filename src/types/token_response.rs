use serde::{Deserialize, Serialize};

/// Body returned by the OAuth client-credentials exchange.
///
/// On failure the identity endpoint replies with `error` and `error_description` instead of a
/// token, so every field is optional on decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Bearer credential for the completion endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Lifetime of `access_token` in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// OAuth error identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Human-readable OAuth error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// The most descriptive error text in the body, if any.
    pub fn error_message(&self) -> Option<&str> {
        let non_empty = |m: &&str| !m.is_empty();
        self.error_description
            .as_deref()
            .filter(non_empty)
            .or(self.error.as_deref().filter(non_empty))
    }
}
