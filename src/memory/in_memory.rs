//! In-process memory store, used by tests and the demo shell.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::MemoryLimits;
use crate::error::StorageError;
use crate::memory::{ConversationMemory, MemoryMutation, MemoryStore};

/// In-memory [`MemoryStore`] with per-conversation locking.
///
/// The outer map lock is held only to look up or create the per-conversation
/// entry; the read-modify-write itself runs under that conversation's own
/// mutex, so distinct conversations never contend.
pub struct InMemoryStore {
    limits: MemoryLimits,
    conversations: StdMutex<HashMap<String, Arc<Mutex<ConversationMemory>>>>,
}

impl InMemoryStore {
    pub fn new(limits: MemoryLimits) -> Self {
        Self {
            limits,
            conversations: StdMutex::new(HashMap::new()),
        }
    }

    fn entry(&self, conversation_id: &str) -> Arc<Mutex<ConversationMemory>> {
        let mut map = self
            .conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationMemory::fresh(conversation_id))))
            .clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(MemoryLimits::default())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, conversation_id: &str) -> Result<ConversationMemory, StorageError> {
        let entry = self.entry(conversation_id);
        let memory = entry.lock().await;
        Ok(memory.clone())
    }

    async fn update(
        &self,
        conversation_id: &str,
        mutation: MemoryMutation,
    ) -> Result<ConversationMemory, StorageError> {
        let entry = self.entry(conversation_id);
        let mut memory = entry.lock().await;
        memory.apply(mutation, &self.limits);
        debug!(
            conversation_id,
            intents = memory.last_intents.len(),
            bindings = memory.variable_bindings.len(),
            "Memory updated"
        );
        Ok(memory.clone())
    }
}
