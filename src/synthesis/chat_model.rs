use serde::{Deserialize, Serialize};

/// Body posted to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model_type: String,
    /// Empty string starts a new conversation.
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ChatData>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatData {
    #[serde(default)]
    pub chat: String,
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
}

impl ChatResponse {
    pub fn ok(session_id: &str, chat: &str) -> Self {
        Self {
            success: true,
            data: Some(ChatData {
                chat: chat.to_string(),
                id: session_id.to_string(),
            }),
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Session ids arrive as strings or numbers depending on the server.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
