//! Scoped settings storage
//!
//! This module provides the storage abstraction the rest of the platform is
//! written against, plus the in-memory reference implementation used by tests
//! and single-process deployments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Identifier of a tenant site within the network.
///
/// Tenant ids are numeric and assigned by the hosting network; the platform
/// never allocates them. Serialized as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub u64);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TenantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Scope of a settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Network-wide record shared by every tenant.
    Global,
    /// Record owned by a single tenant site.
    Tenant(TenantId),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Tenant(id) => write!(f, "tenant:{}", id),
        }
    }
}

/// Settings store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend failed
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Scoped key/value store of JSON records.
///
/// Writes are last-write-wins; the contract has no transactions and no key
/// enumeration. Implementations must be safe to share across tasks.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a record. Returns `None` when the key was never written.
    async fn get(&self, scope: Scope, key: &str) -> StoreResult<Option<Value>>;

    /// Create or overwrite a record.
    async fn set(&self, scope: Scope, key: &str, value: Value) -> StoreResult<()>;

    /// Remove a record. Removing an absent record is not an error.
    async fn delete(&self, scope: Scope, key: &str) -> StoreResult<()>;
}

/// In-memory settings store.
///
/// This is suitable for tests and single-process deployments. State is held
/// behind an async `RwLock`, so clones of the store observe the same records.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Records keyed by scope and key
    records: Arc<RwLock<HashMap<(Scope, String), Value>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of records currently held, across all scopes.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, scope: Scope, key: &str) -> StoreResult<Option<Value>> {
        let records = self.records.read().await;
        Ok(records.get(&(scope, key.to_string())).cloned())
    }

    async fn set(&self, scope: Scope, key: &str, value: Value) -> StoreResult<()> {
        let mut records = self.records.write().await;
        records.insert((scope, key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, scope: Scope, key: &str) -> StoreResult<()> {
        let mut records = self.records.write().await;
        records.remove(&(scope, key.to_string()));
        Ok(())
    }
}
