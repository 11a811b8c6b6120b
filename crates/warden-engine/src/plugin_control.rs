//! Plugin access policy
//!
//! Per level, three plugin lists: `available` (the tenant may activate
//! these), `always_active` (forced on and kept on), and `auto_activate`
//! (switched on once per transition, but the tenant may turn them off
//! again). On every level transition the module reconciles the tenant's
//! actually-active plugins against those lists, inside the tenant's own
//! host context.

use crate::error::EngineResult;
use crate::hosts::{PluginHost, TenantScope};
use crate::policy::{PolicyContext, PolicyModule};
use crate::service::LevelService;
use crate::settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;
use warden_levels::{LevelAssignment, LevelCatalog};
use warden_store::{SettingsStore, TenantId};

/// Per-level plugin lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRules {
    /// Plugins the tenant may activate
    #[serde(default)]
    pub available: Vec<String>,

    /// Plugins forced on; never deactivated while the level holds
    #[serde(default)]
    pub always_active: Vec<String>,

    /// Plugins switched on when the tenant enters the level
    #[serde(default)]
    pub auto_activate: Vec<String>,
}

impl PluginRules {
    /// Set the available list.
    pub fn with_available(mut self, plugins: &[&str]) -> Self {
        self.available = plugins.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Set the always-active list.
    pub fn with_always_active(mut self, plugins: &[&str]) -> Self {
        self.always_active = plugins.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Set the auto-activate list.
    pub fn with_auto_activate(mut self, plugins: &[&str]) -> Self {
        self.auto_activate = plugins.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Plugins that must be switched on: `always_active` ∪ `auto_activate`.
    pub fn forced(&self) -> BTreeSet<String> {
        self.always_active
            .iter()
            .chain(&self.auto_activate)
            .cloned()
            .collect()
    }

    /// Plugins that may stay active: `available` ∪ `always_active`.
    pub fn allowed(&self) -> BTreeSet<String> {
        self.available
            .iter()
            .chain(&self.always_active)
            .cloned()
            .collect()
    }
}

/// Plugin access policy module.
pub struct PluginControl {
    store: Arc<dyn SettingsStore>,
    levels: Arc<LevelService>,
    host: Arc<dyn PluginHost>,
}

impl PluginControl {
    /// Module slug; also the settings key prefix.
    pub const SLUG: &'static str = "plugin_control";

    /// Build from a policy context.
    pub fn new(ctx: &PolicyContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            levels: Arc::clone(&ctx.levels),
            host: Arc::clone(&ctx.plugin_host),
        }
    }

    /// Resolved per-level rules for a tenant: override-aware, gap-filled
    /// against the current catalog.
    pub async fn settings(
        &self,
        tenant: Option<TenantId>,
    ) -> EngineResult<BTreeMap<String, PluginRules>> {
        let stored =
            settings::load::<PluginRules>(self.store.as_ref(), Self::SLUG, tenant).await?;
        let catalog = self.levels.catalog().await?;
        Ok(stored.resolved(&catalog))
    }

    /// Rules for the tenant's current level.
    pub async fn rules_for(&self, tenant: TenantId) -> EngineResult<PluginRules> {
        let assignment = self.levels.assignment(tenant).await?;
        self.rules_for_level(tenant, &assignment.level).await
    }

    /// Plugins the tenant may currently have active.
    pub async fn allowed_plugins(&self, tenant: TenantId) -> EngineResult<BTreeSet<String>> {
        Ok(self.rules_for(tenant).await?.allowed())
    }

    async fn rules_for_level(&self, tenant: TenantId, level: &str) -> EngineResult<PluginRules> {
        let mut resolved = self.settings(Some(tenant)).await?;
        Ok(resolved.remove(level).unwrap_or_default())
    }
}

#[async_trait]
impl PolicyModule for PluginControl {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    async fn reconcile(
        &self,
        new_catalog: &LevelCatalog,
        _old_catalog: &LevelCatalog,
    ) -> EngineResult<()> {
        let dropped =
            settings::reconcile_global::<PluginRules>(self.store.as_ref(), Self::SLUG, new_catalog)
                .await?;
        if dropped > 0 {
            debug!(module = Self::SLUG, dropped, "dropped orphaned level settings");
        }
        Ok(())
    }

    async fn apply_level_change(
        &self,
        tenant: TenantId,
        assignment: &LevelAssignment,
    ) -> EngineResult<()> {
        let rules = self.rules_for_level(tenant, &assignment.level).await?;
        let forced = rules.forced();
        let allowed = rules.allowed();

        let _scope = TenantScope::enter(self.host.as_ref(), tenant);

        // Both sets are computed from the active list as it was before any
        // mutation; a freshly auto-activated plugin is never deactivated in
        // the same pass.
        let active: BTreeSet<String> = self.host.active_plugins()?.into_iter().collect();
        let to_activate: Vec<String> = forced.difference(&active).cloned().collect();
        let to_deactivate: Vec<String> = active.difference(&allowed).cloned().collect();

        if !to_activate.is_empty() {
            self.host.activate(&to_activate)?;
        }
        if !to_deactivate.is_empty() {
            self.host.deactivate(&to_deactivate)?;
        }

        debug!(
            %tenant,
            level = %assignment.level,
            activated = to_activate.len(),
            deactivated = to_deactivate.len(),
            "applied plugin policy"
        );
        Ok(())
    }
}
