//! Message and part types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::wire::DataEvent;

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message in a conversation.
///
/// Deserializing skips part types this crate does not model, such as
/// reasoning or step markers sent by other chat front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    #[serde(default, deserialize_with = "known_parts")]
    pub parts: Vec<Part>,
}

fn known_parts<'de, D>(deserializer: D) -> Result<Vec<Part>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(part) => Some(part),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unrecognized message part");
                None
            }
        })
        .collect())
}

impl Message {
    /// Create a user message holding a single text part.
    #[must_use]
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Create an empty assistant message.
    #[must_use]
    pub fn assistant(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            parts: Vec::new(),
        }
    }

    /// Concatenated text of every text part.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Part of a message, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Part {
    /// Text content.
    Text { text: String },
    /// Tool invocation.
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    /// Tool outcome. `tool_name` is absent for results without a prior call.
    ToolResult {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        is_error: bool,
    },
    /// File, command, web or subagent activity.
    Event(EventPart),
}

impl Part {
    #[must_use]
    pub const fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}

/// Activity event stamped with its client-side receipt time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPart {
    pub event: DataEvent,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_chat_ui_message_shape() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "role": "user",
            "parts": [{"type": "text", "text": "hi"}]
        }))
        .unwrap();

        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "hi");
    }

    #[test]
    fn unknown_parts_are_skipped() {
        let message: Message = serde_json::from_value(json!({
            "id": "m2",
            "role": "assistant",
            "parts": [
                {"type": "step-start"},
                {"type": "text", "text": "ok"},
                {"type": "tool-call", "toolCallId": "c1", "toolName": "ls"}
            ]
        }))
        .unwrap();

        assert_eq!(message.parts.len(), 2);
        assert!(matches!(&message.parts[1], Part::ToolCall { args, .. } if args.is_null()));
    }

    #[test]
    fn missing_parts_and_id_default() {
        let message: Message = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert!(message.id.is_empty());
        assert!(message.parts.is_empty());
    }
}
