//! Tenant directory
//!
//! The admin surface resolves tenant ids against a directory owned by the
//! embedding platform. Only resolution is modeled here; tenant
//! provisioning and lifecycle stay with the host.

use crate::api::ApiResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use warden_store::TenantId;

/// Directory metadata for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantInfo {
    /// Numeric tenant id
    pub id: TenantId,

    /// Display name
    pub name: String,

    /// Primary domain
    pub domain: String,
}

impl TenantInfo {
    /// Create a directory entry.
    pub fn new(id: impl Into<TenantId>, name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain: domain.into(),
        }
    }
}

/// Resolves tenant ids to directory metadata.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up one tenant. `Ok(None)` when the id is not in the directory.
    async fn lookup(&self, tenant: TenantId) -> ApiResult<Option<TenantInfo>>;
}

/// In-memory tenant directory.
#[derive(Debug, Default)]
pub struct MemoryTenantDirectory {
    tenants: RwLock<HashMap<TenantId, TenantInfo>>,
}

impl MemoryTenantDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tenant entry.
    pub async fn insert(&self, info: TenantInfo) {
        self.tenants.write().await.insert(info.id, info);
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn lookup(&self, tenant: TenantId) -> ApiResult<Option<TenantInfo>> {
        Ok(self.tenants.read().await.get(&tenant).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_known_tenant() {
        let directory = MemoryTenantDirectory::new();
        directory
            .insert(TenantInfo::new(7u64, "Acme Shop", "acme.example.com"))
            .await;

        let info = directory.lookup(TenantId(7)).await.unwrap().unwrap();
        assert_eq!(info.name, "Acme Shop");
        assert_eq!(info.domain, "acme.example.com");
    }

    #[tokio::test]
    async fn test_lookup_unknown_tenant() {
        let directory = MemoryTenantDirectory::new();
        assert!(directory.lookup(TenantId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let directory = MemoryTenantDirectory::new();
        directory
            .insert(TenantInfo::new(7u64, "Acme Shop", "acme.example.com"))
            .await;
        directory
            .insert(TenantInfo::new(7u64, "Acme Store", "store.acme.example.com"))
            .await;

        let info = directory.lookup(TenantId(7)).await.unwrap().unwrap();
        assert_eq!(info.name, "Acme Store");
    }
}
