//! `StateStore` trait: scoped JSON property storage for bot state.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Key-value storage of JSON state, addressed by scope and property name.
///
/// Scopes look like `{channel}/conversations/{id}` or `{channel}/users/{id}`.
/// Writes overwrite the whole value; there is no merge and no expiry.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a property, `None` when it was never written.
    async fn read_state(
        &self,
        scope: &str,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Create or overwrite a property.
    async fn write_state(
        &self,
        scope: &str,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Remove a property. Returns whether it existed.
    async fn delete_state(&self, scope: &str, property: &str) -> Result<bool, DatabaseError>;
}
