//! libSQL backend for `StateStore`.
//!
//! Supports a local database file and an in-memory database. Each property
//! is one row of `conversation_state`, keyed by `SessionKey::storage_key`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::dialog::SessionKey;
use crate::error::DatabaseError;

use super::migrations;
use super::traits::StateStore;

/// libSQL-backed state store.
///
/// Holds a single connection reused for every operation; `libsql::Connection`
/// is `Send + Sync`.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
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

        let store = Self::from_database(db)?;
        store.init_schema().await?;
        info!(path = %path.display(), "State database opened");
        Ok(store)
    }

    /// In-memory database, for tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        store.init_schema().await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(&self.conn).await
    }
}

#[async_trait]
impl StateStore for LibSqlStore {
    async fn get(
        &self,
        key: &SessionKey,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM conversation_state WHERE key = ?1",
                params![key.storage_key(property)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_state: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_state: {e}")))?;
                let value = serde_json::from_str(&raw)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_state: {e}"))),
        }
    }

    async fn set(
        &self,
        key: &SessionKey,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO conversation_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key.storage_key(property), raw, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_state: {e}")))?;

        debug!(key = %key, property, "State saved");
        Ok(())
    }

    async fn delete(&self, key: &SessionKey, property: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM conversation_state WHERE key = ?1",
                params![key.storage_key(property)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_state: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_db() -> LibSqlStore {
        LibSqlStore::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let db = test_db().await;
        let key = SessionKey::new("cli", "c1");
        assert!(db.get(&key, "conversation").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_overwrite() {
        let db = test_db().await;
        let key = SessionKey::new("cli", "c1");

        db.set(&key, "conversation", &json!({"tickets": []})).await.unwrap();
        db.set(&key, "conversation", &json!({"tickets": [1]})).await.unwrap();

        assert_eq!(
            db.get(&key, "conversation").await.unwrap(),
            Some(json!({"tickets": [1]}))
        );
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let db = test_db().await;
        let key = SessionKey::new("cli", "c1");
        db.set(&key, "conversation", &json!(true)).await.unwrap();
        assert!(db.delete(&key, "conversation").await.unwrap());
        assert!(!db.delete(&key, "conversation").await.unwrap());
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        migrations::run_migrations(&db.conn).await.unwrap();
        assert_eq!(
            migrations::current_version(&db.conn).await.unwrap(),
            migrations::latest_version()
        );
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("rosy.db");
        let key = SessionKey::new("cli", "c1");

        {
            let db = LibSqlStore::new_local(&path).await.unwrap();
            db.set(&key, "conversation", &json!({"n": 7})).await.unwrap();
        }

        let db = LibSqlStore::new_local(&path).await.unwrap();
        assert_eq!(
            db.get(&key, "conversation").await.unwrap(),
            Some(json!({"n": 7}))
        );
    }
}
