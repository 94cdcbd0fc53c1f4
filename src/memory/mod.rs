//! Per-conversation memory: accumulated context the engine reads before
//! classification and writes after assembly.
//!
//! The store is the engine's only synchronization point. Updates for one
//! conversation are serialized; different conversations never contend.

mod in_memory;
mod json_file;

pub use in_memory::InMemoryStore;
pub use json_file::JsonFileStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MemoryLimits;
use crate::error::StorageError;
use crate::types::Intent;

/// One sent-reply entry in the conversation's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyLogEntry {
    pub template_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Accumulated context for one conversation. Created lazily on first
/// message, mutated on every processed message, never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub conversation_id: String,
    /// Intents in processing order, most recent last. Bounded.
    pub last_intents: Vec<Intent>,
    /// Name → value bindings. Last write wins per key.
    pub variable_bindings: BTreeMap<String, String>,
    /// Replies sent, oldest first. Bounded.
    pub reply_log: Vec<ReplyLogEntry>,
}

impl ConversationMemory {
    /// Fresh, empty memory for a conversation seen for the first time.
    pub fn fresh(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            last_intents: Vec::new(),
            variable_bindings: BTreeMap::new(),
            reply_log: Vec::new(),
        }
    }

    /// Most recent intent, if any message has been processed.
    pub fn last_intent(&self) -> Option<Intent> {
        self.last_intents.last().copied()
    }

    /// Apply one mutation: append intent and reply entry (trimming oldest
    /// past the bounds, never reordering), upsert bindings.
    pub fn apply(&mut self, mutation: MemoryMutation, limits: &MemoryLimits) {
        if let Some(intent) = mutation.intent {
            self.last_intents.push(intent);
            let excess = self.last_intents.len().saturating_sub(limits.max_intents);
            if excess > 0 {
                self.last_intents.drain(..excess);
            }
        }
        for (k, v) in mutation.bindings {
            self.variable_bindings.insert(k, v);
        }
        if let Some(entry) = mutation.reply {
            self.reply_log.push(entry);
            let excess = self.reply_log.len().saturating_sub(limits.max_replies);
            if excess > 0 {
                self.reply_log.drain(..excess);
            }
        }
    }
}

/// A merge-style mutation produced by one processed message.
#[derive(Debug, Clone, Default)]
pub struct MemoryMutation {
    pub intent: Option<Intent>,
    pub bindings: BTreeMap<String, String>,
    pub reply: Option<ReplyLogEntry>,
}

/// Backend-agnostic memory persistence.
///
/// `get` treats absence as a fresh conversation. `update` is a transactional
/// read-modify-write, serialized per `conversation_id`; distinct ids proceed
/// in parallel.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Result<ConversationMemory, StorageError>;

    async fn update(
        &self,
        conversation_id: &str,
        mutation: MemoryMutation,
    ) -> Result<ConversationMemory, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_intents: usize, max_replies: usize) -> MemoryLimits {
        MemoryLimits {
            max_intents,
            max_replies,
        }
    }

    #[test]
    fn apply_appends_and_trims_intents() {
        let mut mem = ConversationMemory::fresh("c1");
        let lim = limits(2, 10);
        for intent in [
            Intent::BookingInquiry,
            Intent::CheckinQuestion,
            Intent::AmenityQuestion,
        ] {
            mem.apply(
                MemoryMutation {
                    intent: Some(intent),
                    ..Default::default()
                },
                &lim,
            );
        }
        // Oldest dropped, order preserved.
        assert_eq!(
            mem.last_intents,
            vec![Intent::CheckinQuestion, Intent::AmenityQuestion]
        );
        assert_eq!(mem.last_intent(), Some(Intent::AmenityQuestion));
    }

    #[test]
    fn apply_upserts_bindings_last_write_wins() {
        let mut mem = ConversationMemory::fresh("c1");
        let lim = MemoryLimits::default();
        let mut first = MemoryMutation::default();
        first.bindings.insert("destination".into(), "Stingaree".into());
        mem.apply(first, &lim);

        let mut second = MemoryMutation::default();
        second.bindings.insert("destination".into(), "The Spot".into());
        second.bindings.insert("requested_time".into(), "1pm".into());
        mem.apply(second, &lim);

        assert_eq!(
            mem.variable_bindings.get("destination").unwrap(),
            "The Spot"
        );
        assert_eq!(mem.variable_bindings.get("requested_time").unwrap(), "1pm");
    }

    #[test]
    fn apply_trims_reply_log_oldest_first() {
        let mut mem = ConversationMemory::fresh("c1");
        let lim = limits(10, 2);
        for id in ["a", "b", "c"] {
            mem.apply(
                MemoryMutation {
                    reply: Some(ReplyLogEntry {
                        template_id: id.into(),
                        timestamp: Utc::now(),
                    }),
                    ..Default::default()
                },
                &lim,
            );
        }
        let ids: Vec<_> = mem.reply_log.iter().map(|e| e.template_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn memory_serde_roundtrip() {
        let mut mem = ConversationMemory::fresh("c1");
        mem.last_intents.push(Intent::LocalRecommendation);
        mem.variable_bindings.insert("k".into(), "v".into());
        let json = serde_json::to_string(&mem).unwrap();
        let back: ConversationMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.conversation_id, "c1");
        assert_eq!(back.last_intent(), Some(Intent::LocalRecommendation));
        assert_eq!(back.variable_bindings.get("k").unwrap(), "v");
    }
}
