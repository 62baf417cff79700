//! Volatile in-process state store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::store::traits::StateStore;

/// Keeps state in a map for the life of the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(scope: &str, property: &str) -> (String, String) {
    (scope.to_string(), property.to_string())
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read_state(
        &self,
        scope: &str,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        Ok(self.entries.read().await.get(&key(scope, property)).cloned())
    }

    async fn write_state(
        &self,
        scope: &str,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        self.entries
            .write()
            .await
            .insert(key(scope, property), value.clone());
        Ok(())
    }

    async fn delete_state(&self, scope: &str, property: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .entries
            .write()
            .await
            .remove(&key(scope, property))
            .is_some())
    }
}
