//! Conversation message types.

use serde::{Deserialize, Serialize};

/// Placeholder text shown in a provisional model message while its
/// response is still in flight.
pub const PROVISIONAL_TEXT: &str = "...";

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message authored by the user.
    User,
    /// Message authored by the model.
    Model,
}

/// A single message in the conversation log.
///
/// Messages are immutable after creation except for the targeted in-place
/// text/image rewrite applied to a provisional model message while its
/// response streams in. `workflow_id` and `module_ids` are provenance
/// metadata attached only to model-authored messages, recording which
/// template context produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique, time-ordered message id.
    pub id: String,
    /// Author of the message.
    pub role: MessageRole,
    /// Message text. For a provisional model message this starts as
    /// [`PROVISIONAL_TEXT`] and is progressively rewritten.
    pub text: String,
    /// Image references (preview handles or data URIs), in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Workflow that produced a model message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Modules that were applied when a model message was produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub module_ids: Vec<String>,
}

impl ChatMessage {
    /// Creates a user message.
    pub fn user(id: impl Into<String>, text: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            text: text.into(),
            images,
            workflow_id: None,
            module_ids: Vec::new(),
        }
    }

    /// Creates a provisional model message carrying its template provenance.
    pub fn provisional_model(
        id: impl Into<String>,
        workflow_id: Option<String>,
        module_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Model,
            text: PROVISIONAL_TEXT.to_string(),
            images: Vec::new(),
            workflow_id,
            module_ids,
        }
    }
}

/// One entry of the text-only history replayed on the streaming path.
///
/// Images in history are never replayed, only text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Author of the entry.
    pub role: MessageRole,
    /// Text of the entry.
    pub text: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            text: message.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Model).unwrap(),
            "\"model\""
        );
    }

    #[test]
    fn test_provisional_model_message_carries_provenance() {
        let message = ChatMessage::provisional_model(
            "1",
            Some("workflow_beauty_ad".to_string()),
            vec!["photo_realism".to_string()],
        );
        assert_eq!(message.text, PROVISIONAL_TEXT);
        assert_eq!(message.role, MessageRole::Model);
        assert_eq!(message.workflow_id.as_deref(), Some("workflow_beauty_ad"));
        assert_eq!(message.module_ids, vec!["photo_realism"]);
    }

    #[test]
    fn test_history_entry_drops_images() {
        let message = ChatMessage::user("1", "hello", vec!["preview.png".to_string()]);
        let entry = HistoryEntry::from(&message);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"role": "user", "text": "hello"})
        );
    }
}
