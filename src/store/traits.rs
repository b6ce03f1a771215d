//! `StateStore` trait — async key/property interface for conversation state.

use async_trait::async_trait;

use crate::dialog::SessionKey;
use crate::error::DatabaseError;

/// Backend-agnostic store for per-conversation JSON properties.
///
/// Implementations must tolerate concurrent calls for different keys.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch a property, `None` if it was never written.
    async fn get(
        &self,
        key: &SessionKey,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a property.
    async fn set(
        &self,
        key: &SessionKey,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Remove a property. Returns whether anything was deleted.
    async fn delete(&self, key: &SessionKey, property: &str) -> Result<bool, DatabaseError>;
}
