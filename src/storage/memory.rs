//! In-process snapshot store.
//!
//! Clones share the same snapshot, so a caller can keep a handle to inspect
//! what a detector wrote. Used for dry runs and tests.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::ItemSet;
use crate::storage::ItemStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<RwLock<Option<ItemSet>>>,
    writes: Arc<RwLock<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a snapshot.
    pub fn with_items(items: ItemSet) -> Self {
        let store = Self::new();
        *store.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Some(items);
        store
    }

    /// Current snapshot, `None` if nothing was ever recorded.
    pub fn snapshot(&self) -> Option<ItemSet> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of successful `save` calls.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn load(&self) -> Result<ItemSet, StoreError> {
        Ok(self.snapshot().unwrap_or_default())
    }

    async fn save(&self, items: &ItemSet) -> Result<(), StoreError> {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Some(items.clone());
        *self.writes.write().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[tokio::test]
    async fn test_clones_share_snapshot() {
        let store = MemoryStore::new();
        let handle = store.clone();
        assert!(handle.snapshot().is_none());

        let items: ItemSet = vec![Item::new("A", "https://example.com/a")].into();
        store.save(&items).await.unwrap();

        assert_eq!(handle.snapshot(), Some(items));
        assert_eq!(handle.write_count(), 1);
    }
}
