//! libSQL backend: async `StateStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::StateStore;

/// libSQL state store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    // Keeps the database handle alive alongside its connection.
    _db: libsql::Database,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::connect(db).await?;
        info!(path = %path.display(), "State store opened");
        Ok(store)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::connect(db).await
    }

    async fn connect(db: libsql::Database) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self { _db: db, conn })
    }
}

#[async_trait]
impl StateStore for LibSqlStore {
    async fn read_state(
        &self,
        scope: &str,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM bot_state WHERE scope = ?1 AND property = ?2",
                params![scope, property],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read_state: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("read_state: {e}")))?
        else {
            return Ok(None);
        };

        let raw: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("read_state: {e}")))?;
        let value = serde_json::from_str(&raw).map_err(|e| {
            DatabaseError::Serialization(format!("{scope}/{property} is not valid JSON: {e}"))
        })?;
        debug!(scope, property, "State loaded");
        Ok(Some(value))
    }

    async fn write_state(
        &self,
        scope: &str,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO bot_state (scope, property, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (scope, property) DO UPDATE SET value = ?3, updated_at = ?4",
                params![scope, property, raw, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("write_state: {e}")))?;
        Ok(())
    }

    async fn delete_state(&self, scope: &str, property: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM bot_state WHERE scope = ?1 AND property = ?2",
                params![scope, property],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_state: {e}")))?;
        Ok(count > 0)
    }
}
