//! Conversation store.
//!
//! An ordered log of chat messages, append-only except for the single
//! targeted update applied to a not-yet-finished model message while its
//! response streams in. Messages are addressed by id through an owned
//! index rather than by scanning, and updates replace the whole message so
//! readers never observe a torn intermediate.

use std::collections::HashMap;

use chrono::Utc;

use crate::message::{ChatMessage, HistoryEntry};

/// Ordered conversation log with by-id addressing.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<ChatMessage>,
    index: HashMap<String, usize>,
    seq: u64,
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the next unique, time-ordered message id.
    ///
    /// Ids combine a millisecond timestamp with a monotonic sequence so
    /// messages created within the same millisecond still order correctly.
    pub fn next_message_id(&mut self) -> String {
        self.seq += 1;
        format!("{:013}-{:06}", Utc::now().timestamp_millis(), self.seq)
    }

    /// Appends a message to the end of the log.
    pub fn append(&mut self, message: ChatMessage) {
        self.index.insert(message.id.clone(), self.messages.len());
        self.messages.push(message);
    }

    /// Applies a targeted update to the message with the given id.
    ///
    /// The message is cloned, transformed, and swapped back in one step.
    /// Returns `false` when no message has that id.
    pub fn update<F>(&mut self, id: &str, transform: F) -> bool
    where
        F: FnOnce(&mut ChatMessage),
    {
        let Some(&position) = self.index.get(id) else {
            return false;
        };
        let mut updated = self.messages[position].clone();
        transform(&mut updated);
        self.messages[position] = updated;
        true
    }

    /// Returns the message with the given id, if present.
    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.index.get(id).map(|&position| &self.messages[position])
    }

    /// Returns all messages in log order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages in the log.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the text-only role/text pairs for replay on the streaming
    /// path.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(HistoryEntry::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageRole, PROVISIONAL_TEXT};

    #[test]
    fn test_append_preserves_order() {
        let mut store = ConversationStore::new();
        let first = store.next_message_id();
        let second = store.next_message_id();
        store.append(ChatMessage::user(&first, "one", Vec::new()));
        store.append(ChatMessage::provisional_model(&second, None, Vec::new()));

        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[0].role, MessageRole::User);
        assert_eq!(store.messages()[1].role, MessageRole::Model);
        assert_eq!(store.messages()[1].text, PROVISIONAL_TEXT);
    }

    #[test]
    fn test_ids_are_unique_and_time_ordered() {
        let mut store = ConversationStore::new();
        let ids: Vec<_> = (0..10).map(|_| store.next_message_id()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_update_targets_exactly_one_message() {
        let mut store = ConversationStore::new();
        let first = store.next_message_id();
        let second = store.next_message_id();
        store.append(ChatMessage::user(&first, "one", Vec::new()));
        store.append(ChatMessage::provisional_model(&second, None, Vec::new()));

        assert!(store.update(&second, |m| m.text = "reply".to_string()));
        assert_eq!(store.get(&second).unwrap().text, "reply");
        assert_eq!(store.get(&first).unwrap().text, "one");
    }

    #[test]
    fn test_update_unknown_id_is_reported() {
        let mut store = ConversationStore::new();
        assert!(!store.update("missing", |m| m.text.clear()));
    }

    #[test]
    fn test_history_replays_text_only() {
        let mut store = ConversationStore::new();
        let id = store.next_message_id();
        store.append(ChatMessage::user(
            &id,
            "hello",
            vec!["preview.png".to_string()],
        ));

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello");
    }
}
