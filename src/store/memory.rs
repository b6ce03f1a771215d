//! In-memory `StateStore`, used when no database path is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dialog::SessionKey;
use crate::error::DatabaseError;

use super::traits::StateStore;

/// Volatile store; everything is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(
        &self,
        key: &SessionKey,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&key.storage_key(property)).cloned())
    }

    async fn set(
        &self,
        key: &SessionKey,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.storage_key(property), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &SessionKey, property: &str) -> Result<bool, DatabaseError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&key.storage_key(property)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryStore::new();
        let key = SessionKey::new("cli", "c1");

        assert!(store.get(&key, "conversation").await.unwrap().is_none());
        store.set(&key, "conversation", &json!({"a": 1})).await.unwrap();
        assert_eq!(
            store.get(&key, "conversation").await.unwrap(),
            Some(json!({"a": 1}))
        );
        assert!(store.delete(&key, "conversation").await.unwrap());
        assert!(!store.delete(&key, "conversation").await.unwrap());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let store = MemoryStore::new();
        let a = SessionKey::new("cli", "a");
        let b = SessionKey::new("cli", "b");
        store.set(&a, "conversation", &json!(1)).await.unwrap();
        assert!(store.get(&b, "conversation").await.unwrap().is_none());
        assert!(store.get(&a, "other").await.unwrap().is_none());
    }
}
