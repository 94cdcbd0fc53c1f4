//! File-backed memory store: one JSON document per conversation.
//!
//! Writes go to a `.tmp` sibling and are renamed into place, so a crashed
//! write never leaves a torn document behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::MemoryLimits;
use crate::error::StorageError;
use crate::memory::{ConversationMemory, MemoryMutation, MemoryStore};

/// JSON-file [`MemoryStore`]. Same per-conversation locking discipline as
/// [`super::InMemoryStore`]; the lock covers the whole read-modify-write so
/// concurrent updates to one conversation cannot interleave on disk.
pub struct JsonFileStore {
    root: PathBuf,
    limits: MemoryLimits,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>, limits: MemoryLimits) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            limits,
            locks: StdMutex::new(HashMap::new()),
        })
    }

    fn key_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut map = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn path_for(&self, conversation_id: &str) -> PathBuf {
        // Conversation ids come from external channels; keep filenames tame.
        let mut stem: String = conversation_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        // Sanitization is lossy ("conv.1" and "conv_1" share a stem), so a
        // rewritten id also carries a fingerprint of the raw bytes. Ids that
        // needed no rewriting keep their bare filename.
        if stem != conversation_id {
            stem.push('-');
            stem.push_str(&format!("{:016x}", fingerprint(conversation_id)));
        }
        self.root.join(format!("{stem}.json"))
    }

    async fn read(&self, path: &Path, conversation_id: &str) -> Result<ConversationMemory, StorageError> {
        match fs::read_to_string(path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(ConversationMemory::fresh(conversation_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, memory: &ConversationMemory) -> Result<(), StorageError> {
        let raw = serde_json::to_vec_pretty(memory)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// FNV-1a over the raw id bytes. Filenames outlive the process, so this
/// must stay stable across builds — `std::hash` hashers make no such
/// guarantee between releases.
fn fingerprint(id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in id.as_bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl MemoryStore for JsonFileStore {
    async fn get(&self, conversation_id: &str) -> Result<ConversationMemory, StorageError> {
        let lock = self.key_lock(conversation_id);
        let _guard = lock.lock().await;
        self.read(&self.path_for(conversation_id), conversation_id)
            .await
    }

    async fn update(
        &self,
        conversation_id: &str,
        mutation: MemoryMutation,
    ) -> Result<ConversationMemory, StorageError> {
        let lock = self.key_lock(conversation_id);
        let _guard = lock.lock().await;

        let path = self.path_for(conversation_id);
        let mut memory = self.read(&path, conversation_id).await?;
        memory.apply(mutation, &self.limits);
        self.write(&path, &memory).await?;
        debug!(conversation_id, path = %path.display(), "Memory persisted");
        Ok(memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Intent;

    fn intent_mutation(intent: Intent) -> MemoryMutation {
        MemoryMutation {
            intent: Some(intent),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fresh_memory_for_unseen_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), MemoryLimits::default())
            .await
            .unwrap();
        let mem = store.get("conv-1").await.unwrap();
        assert!(mem.last_intents.is_empty());
    }

    #[tokio::test]
    async fn update_persists_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path(), MemoryLimits::default())
                .await
                .unwrap();
            let mut mutation = intent_mutation(Intent::DepositQuestion);
            mutation
                .bindings
                .insert("deposit_amount".into(), "250".into());
            store.update("conv-1", mutation).await.unwrap();
        }

        let reopened = JsonFileStore::open(dir.path(), MemoryLimits::default())
            .await
            .unwrap();
        let mem = reopened.get("conv-1").await.unwrap();
        assert_eq!(mem.last_intent(), Some(Intent::DepositQuestion));
        assert_eq!(mem.variable_bindings.get("deposit_amount").unwrap(), "250");
    }

    #[tokio::test]
    async fn hostile_conversation_ids_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), MemoryLimits::default())
            .await
            .unwrap();
        store
            .update("../escape/attempt", intent_mutation(Intent::Unknown))
            .await
            .unwrap();
        // The sanitized file lands under the root, nothing outside it.
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("___escape_attempt-"));
        assert!(entries[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn ids_with_identical_sanitized_stems_stay_independent() {
        // "conv.1" and "conv_1" both sanitize to "conv_1"; the fingerprint
        // suffix keeps their files apart so neither overwrites the other.
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), MemoryLimits::default())
            .await
            .unwrap();

        store
            .update("conv.1", intent_mutation(Intent::CheckinQuestion))
            .await
            .unwrap();
        store
            .update("conv_1", intent_mutation(Intent::DepositQuestion))
            .await
            .unwrap();

        let dotted = store.get("conv.1").await.unwrap();
        assert_eq!(dotted.conversation_id, "conv.1");
        assert_eq!(dotted.last_intents, vec![Intent::CheckinQuestion]);

        let underscored = store.get("conv_1").await.unwrap();
        assert_eq!(underscored.conversation_id, "conv_1");
        assert_eq!(underscored.last_intents, vec![Intent::DepositQuestion]);
    }

    #[tokio::test]
    async fn bounds_apply_to_persisted_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(
            dir.path(),
            MemoryLimits {
                max_intents: 2,
                max_replies: 2,
            },
        )
        .await
        .unwrap();
        for _ in 0..4 {
            store
                .update("c", intent_mutation(Intent::CheckinQuestion))
                .await
                .unwrap();
        }
        let mem = store.get("c").await.unwrap();
        assert_eq!(mem.last_intents.len(), 2);
    }
}
