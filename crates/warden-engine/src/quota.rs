//! Storage quota policy
//!
//! One number per level: the upload quota in megabytes, zero meaning
//! unlimited. Pull-based, so the host asks when it needs the figure;
//! nothing happens on a level transition.

use crate::error::EngineResult;
use crate::policy::{PolicyContext, PolicyModule};
use crate::service::LevelService;
use crate::settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use warden_levels::LevelCatalog;
use warden_store::{SettingsStore, TenantId};

/// Per-level quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRule {
    /// Upload quota in megabytes; 0 = unlimited
    #[serde(default)]
    pub quota_mb: u64,
}

impl QuotaRule {
    /// Whether this rule places no limit at all.
    pub fn unlimited(&self) -> bool {
        self.quota_mb == 0
    }
}

/// Storage quota policy module.
pub struct QuotaManager {
    store: Arc<dyn SettingsStore>,
    levels: Arc<LevelService>,
}

impl QuotaManager {
    /// Module slug; also the settings key prefix.
    pub const SLUG: &'static str = "quota_manager";

    /// Build from a policy context.
    pub fn new(ctx: &PolicyContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            levels: Arc::clone(&ctx.levels),
        }
    }

    /// Resolved per-level quotas for a tenant.
    pub async fn settings(
        &self,
        tenant: Option<TenantId>,
    ) -> EngineResult<BTreeMap<String, QuotaRule>> {
        let stored = settings::load::<QuotaRule>(self.store.as_ref(), Self::SLUG, tenant).await?;
        let catalog = self.levels.catalog().await?;
        Ok(stored.resolved(&catalog))
    }

    /// The tenant's quota in megabytes at its current level; 0 = unlimited.
    pub async fn space_allowed(&self, tenant: TenantId) -> EngineResult<u64> {
        let assignment = self.levels.assignment(tenant).await?;
        let resolved = self.settings(Some(tenant)).await?;
        Ok(resolved
            .get(&assignment.level)
            .copied()
            .unwrap_or_default()
            .quota_mb)
    }

    /// Whether uploads are capped for the tenant at all.
    pub async fn enforces_quota(&self, tenant: TenantId) -> EngineResult<bool> {
        Ok(self.space_allowed(tenant).await? > 0)
    }
}

#[async_trait]
impl PolicyModule for QuotaManager {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    async fn reconcile(
        &self,
        new_catalog: &LevelCatalog,
        _old_catalog: &LevelCatalog,
    ) -> EngineResult<()> {
        let dropped =
            settings::reconcile_global::<QuotaRule>(self.store.as_ref(), Self::SLUG, new_catalog)
                .await?;
        if dropped > 0 {
            debug!(module = Self::SLUG, dropped, "dropped orphaned level settings");
        }
        Ok(())
    }

    // Pull-based module: the default no-op transition handler applies.
}
