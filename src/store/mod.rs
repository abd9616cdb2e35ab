//! Document store boundary.
//!
//! The store owns the knowledge corpus; the engine only reads versioned
//! snapshots from it and rebuilds derived indices. Corpus mutations are
//! serialized inside the store implementation, never by the engine.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::{EngineError, Result};
use crate::types::KnowledgeEntry;

/// A consistent read of the active corpus, tagged with the mutation version
/// it was taken at.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    pub version: u64,
    pub entries: Vec<KnowledgeEntry>,
}

/// Read-side contract the engine consumes. Persistence mechanics live behind
/// this trait and are out of engine scope.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All active knowledge entries plus the version they were read at
    async fn active_entries(&self) -> Result<CorpusSnapshot>;

    /// Count of corpus mutations since the given version; drives rebuild
    /// triggering
    async fn delta_since(&self, version: u64) -> Result<u64>;
}

struct StoreInner {
    entries: BTreeMap<u64, KnowledgeEntry>,
    version: u64,
}

/// In-process document store used by the CLI and tests. Every mutation bumps
/// the version counter, which is what `delta_since` reports against.
pub struct InMemoryDocumentStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                entries: BTreeMap::new(),
                version: 0,
            }),
        }
    }

    /// Seed a store from a batch of entries as one mutation per entry
    pub async fn seed(entries: Vec<KnowledgeEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.upsert(entry).await;
        }
        store
    }

    /// Insert or replace an entry, stamping `updated_at`
    pub async fn upsert(&self, mut entry: KnowledgeEntry) {
        let mut inner = self.inner.write().await;
        entry.updated_at = Utc::now();
        inner.entries.insert(entry.id, entry);
        inner.version += 1;
    }

    /// Mark an entry inactive without deleting its history
    pub async fn deactivate(&self, id: u64) -> bool {
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(&id) {
            Some(entry) => {
                entry.active = false;
                entry.updated_at = Utc::now();
                inner.version += 1;
                true
            }
            None => false,
        }
    }

    /// Remove an entry entirely
    pub async fn remove(&self, id: u64) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.entries.remove(&id).is_some();
        if removed {
            inner.version += 1;
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn active_entries(&self) -> Result<CorpusSnapshot> {
        let inner = self.inner.read().await;
        let entries = inner
            .entries
            .values()
            .filter(|e| e.active)
            .cloned()
            .collect();
        Ok(CorpusSnapshot {
            version: inner.version,
            entries,
        })
    }

    async fn delta_since(&self, version: u64) -> Result<u64> {
        let inner = self.inner.read().await;
        if version > inner.version {
            return Err(EngineError::Store(format!(
                "version {} is ahead of store version {}",
                version, inner.version
            )));
        }
        Ok(inner.version - version)
    }
}
