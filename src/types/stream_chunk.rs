use serde::{Deserialize, Serialize};

/// Payload of one `data: ` line in a streamed completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    /// Identifier of the completion this fragment belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Position of this fragment within the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<u64>,

    /// Whether the provider marked this as the final fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_end: Option<bool>,

    /// Text fragment; absent fragments decode as empty text.
    #[serde(default)]
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_defaults_to_empty() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"is_end":true}"#).unwrap();
        assert_eq!(chunk.result, "");
        assert_eq!(chunk.is_end, Some(true));
    }

    #[test]
    fn fragment_deserializes() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"id":"as-1","sentence_id":0,"result":"Hi"}"#).unwrap();
        assert_eq!(chunk.result, "Hi");
        assert_eq!(chunk.sentence_id, Some(0));
    }
}
