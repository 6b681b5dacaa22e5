//! Per-user bounded conversation history and context

use crate::types::{ConversationContext, ConversationRecord, Message, MessageMeta, Role, SeverityWord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_MAX_HISTORY: usize = 10;

/// In-memory conversation store. Lives for the process lifetime; callers
/// serialize access per user.
#[derive(Debug)]
pub struct ConversationStore {
    max_history: usize,
    records: HashMap<String, ConversationRecord>,
}

/// Snapshot of a user's conversation for status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub total_messages: usize,
    pub main_symptoms: Vec<String>,
    pub last_severity: Option<SeverityWord>,
    pub conversation_started: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ConversationStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            records: HashMap::new(),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn record_mut(&mut self, user_id: &str) -> &mut ConversationRecord {
        self.records.entry(user_id.to_string()).or_default()
    }

    /// Append a message, creating the record on first use and evicting the
    /// oldest message once the history is full
    pub fn append(&mut self, user_id: &str, role: Role, content: &str, metadata: MessageMeta) {
        let max_history = self.max_history;
        let now = Utc::now();
        let record = self.record_mut(user_id);

        if record.messages.len() >= max_history {
            record.messages.pop_front();
        }
        record.messages.push_back(Message {
            role,
            content: content.to_string(),
            timestamp: now,
            metadata,
        });
        record.last_updated = now;
    }

    /// Last `limit` messages in chronological order
    pub fn recent(&self, user_id: &str, limit: usize) -> Vec<Message> {
        match self.records.get(user_id) {
            Some(record) => {
                let skip = record.messages.len().saturating_sub(limit);
                record.messages.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn get_context(&mut self, user_id: &str) -> ConversationContext {
        self.record_mut(user_id).context.clone()
    }

    pub fn set_context(&mut self, user_id: &str, context: ConversationContext) {
        let record = self.record_mut(user_id);
        record.context = context;
        record.last_updated = Utc::now();
    }

    pub fn context_mut(&mut self, user_id: &str) -> &mut ConversationContext {
        &mut self.record_mut(user_id).context
    }

    /// Empty history and context; the record itself stays
    pub fn clear(&mut self, user_id: &str) {
        if let Some(record) = self.records.get_mut(user_id) {
            record.messages.clear();
            record.context = ConversationContext::default();
            record.last_updated = Utc::now();
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.records.contains_key(user_id)
    }

    pub fn history_len(&self, user_id: &str) -> usize {
        self.records
            .get(user_id)
            .map(|r| r.messages.len())
            .unwrap_or(0)
    }

    pub fn summary(&self, user_id: &str) -> Option<ConversationSummary> {
        let record = self.records.get(user_id)?;
        if record.messages.is_empty() {
            return None;
        }
        Some(ConversationSummary {
            total_messages: record.messages.len(),
            main_symptoms: record.context.symptoms.clone(),
            last_severity: record.context.severity,
            conversation_started: record.messages.front().map(|m| m.timestamp),
            last_updated: record.messages.back().map(|m| m.timestamp),
        })
    }

    /// Drop every record
    pub fn reset(&mut self) {
        self.records.clear();
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityBundle;

    fn user_msg(store: &mut ConversationStore, user: &str, text: &str) {
        store.append(user, Role::User, text, MessageMeta::default());
    }

    #[test]
    fn test_append_creates_record() {
        let mut store = ConversationStore::default();
        assert!(!store.contains("u1"));
        user_msg(&mut store, "u1", "hello");
        assert!(store.contains("u1"));
        assert_eq!(store.history_len("u1"), 1);
    }

    #[test]
    fn test_history_bounded_fifo() {
        let mut store = ConversationStore::new(3);
        for i in 0..5 {
            user_msg(&mut store, "u1", &format!("msg {}", i));
        }

        assert_eq!(store.history_len("u1"), 3);
        let contents: Vec<String> = store
            .recent("u1", 10)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_recent_is_chronological_tail() {
        let mut store = ConversationStore::default();
        for i in 0..4 {
            user_msg(&mut store, "u1", &format!("msg {}", i));
        }
        let recent: Vec<String> = store.recent("u1", 2).into_iter().map(|m| m.content).collect();
        assert_eq!(recent, vec!["msg 2", "msg 3"]);
        assert!(store.recent("nobody", 5).is_empty());
    }

    #[test]
    fn test_get_context_auto_creates() {
        let mut store = ConversationStore::default();
        assert!(store.get_context("u1").is_empty());
        assert!(store.contains("u1"));
    }

    #[test]
    fn test_clear_keeps_record() {
        let mut store = ConversationStore::default();
        user_msg(&mut store, "u1", "fever");
        store.context_mut("u1").merge_entities(&EntityBundle {
            symptoms: vec!["fever".to_string()],
            ..Default::default()
        });

        store.clear("u1");

        assert!(store.contains("u1"));
        assert_eq!(store.history_len("u1"), 0);
        assert!(store.get_context("u1").is_empty());

        user_msg(&mut store, "u1", "back again");
        assert_eq!(store.history_len("u1"), 1);
    }

    #[test]
    fn test_users_are_independent() {
        let mut store = ConversationStore::new(2);
        user_msg(&mut store, "a", "one");
        user_msg(&mut store, "a", "two");
        user_msg(&mut store, "a", "three");
        user_msg(&mut store, "b", "only");

        assert_eq!(store.history_len("a"), 2);
        assert_eq!(store.history_len("b"), 1);
    }

    #[test]
    fn test_summary() {
        let mut store = ConversationStore::default();
        assert!(store.summary("u1").is_none());

        user_msg(&mut store, "u1", "cough");
        store.append("u1", Role::Assistant, "reply", MessageMeta::default());
        store.context_mut("u1").symptoms = vec!["cough".to_string()];

        let summary = store.summary("u1").unwrap();
        assert_eq!(summary.total_messages, 2);
        assert_eq!(summary.main_symptoms, vec!["cough"]);
        assert!(summary.conversation_started <= summary.last_updated);
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut store = ConversationStore::default();
        user_msg(&mut store, "u1", "hi");
        store.reset();
        assert!(!store.contains("u1"));
    }
}
