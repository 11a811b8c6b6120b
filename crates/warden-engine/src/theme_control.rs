//! Theme access policy
//!
//! Per level, two theme lists: `available` (the tenant may activate these)
//! and `visible` (browsable in the theme picker but not activatable, as
//! upsell material). On a level transition the module pushes the combined
//! allowed set to the theme host; it never force-switches the active theme.

use crate::error::EngineResult;
use crate::hosts::ThemeHost;
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

/// Per-level theme lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRules {
    /// Themes the tenant may activate
    #[serde(default)]
    pub available: Vec<String>,

    /// Themes shown in the picker without being activatable
    #[serde(default)]
    pub visible: Vec<String>,
}

impl ThemeRules {
    /// Set the available list.
    pub fn with_available(mut self, themes: &[&str]) -> Self {
        self.available = themes.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Set the visible list.
    pub fn with_visible(mut self, themes: &[&str]) -> Self {
        self.visible = themes.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Themes the tenant may see: `available` ∪ `visible`.
    pub fn allowed(&self) -> BTreeSet<String> {
        self.available.iter().chain(&self.visible).cloned().collect()
    }

    /// Themes the tenant may activate: `available` only.
    pub fn activatable(&self) -> BTreeSet<String> {
        self.available.iter().cloned().collect()
    }
}

/// Theme access policy module.
pub struct ThemeControl {
    store: Arc<dyn SettingsStore>,
    levels: Arc<LevelService>,
    host: Arc<dyn ThemeHost>,
}

impl ThemeControl {
    /// Module slug; also the settings key prefix.
    pub const SLUG: &'static str = "theme_control";

    /// Build from a policy context.
    pub fn new(ctx: &PolicyContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            levels: Arc::clone(&ctx.levels),
            host: Arc::clone(&ctx.theme_host),
        }
    }

    /// Resolved per-level rules for a tenant.
    pub async fn settings(
        &self,
        tenant: Option<TenantId>,
    ) -> EngineResult<BTreeMap<String, ThemeRules>> {
        let stored = settings::load::<ThemeRules>(self.store.as_ref(), Self::SLUG, tenant).await?;
        let catalog = self.levels.catalog().await?;
        Ok(stored.resolved(&catalog))
    }

    /// Themes visible to the tenant at its current level.
    pub async fn allowed_themes(&self, tenant: TenantId) -> EngineResult<BTreeSet<String>> {
        Ok(self.rules_for(tenant).await?.allowed())
    }

    /// Themes the tenant may activate at its current level.
    pub async fn activatable_themes(&self, tenant: TenantId) -> EngineResult<BTreeSet<String>> {
        Ok(self.rules_for(tenant).await?.activatable())
    }

    async fn rules_for(&self, tenant: TenantId) -> EngineResult<ThemeRules> {
        let assignment = self.levels.assignment(tenant).await?;
        let mut resolved = self.settings(Some(tenant)).await?;
        Ok(resolved.remove(&assignment.level).unwrap_or_default())
    }
}

#[async_trait]
impl PolicyModule for ThemeControl {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    async fn reconcile(
        &self,
        new_catalog: &LevelCatalog,
        _old_catalog: &LevelCatalog,
    ) -> EngineResult<()> {
        let dropped =
            settings::reconcile_global::<ThemeRules>(self.store.as_ref(), Self::SLUG, new_catalog)
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
        let mut resolved = self.settings(Some(tenant)).await?;
        let rules = resolved.remove(&assignment.level).unwrap_or_default();
        let allowed = rules.allowed();

        debug!(%tenant, level = %assignment.level, themes = allowed.len(), "pushed allowed theme set");
        self.host.set_allowed(tenant, allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::{MemoryPluginHost, MemoryThemeHost};
    use crate::settings::ModuleSettings;
    use warden_events::EventBus;
    use warden_levels::AssignmentChange;
    use warden_store::MemoryStore;

    struct Harness {
        store: MemoryStore,
        module: ThemeControl,
        host: Arc<MemoryThemeHost>,
        levels: Arc<LevelService>,
    }

    async fn harness() -> Harness {
        let store = MemoryStore::new();
        let bus = Arc::new(EventBus::new());
        let levels = Arc::new(LevelService::new(Arc::new(store.clone()), bus));
        let host = Arc::new(MemoryThemeHost::new());
        let ctx = PolicyContext {
            store: Arc::new(store.clone()),
            levels: Arc::clone(&levels),
            plugin_host: Arc::new(MemoryPluginHost::new(TenantId(1))),
            theme_host: host.clone(),
        };
        Harness {
            store,
            module: ThemeControl::new(&ctx),
            host,
            levels,
        }
    }

    async fn seed_rules(store: &MemoryStore) {
        let mut stored = ModuleSettings::new();
        stored.insert(
            "basic",
            ThemeRules::default()
                .with_available(&["twenty-one"])
                .with_visible(&["aurora"]),
        );
        stored.insert(
            "premium",
            ThemeRules::default().with_available(&["twenty-one", "aurora"]),
        );
        settings::save_global(store, ThemeControl::SLUG, &stored)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transition_pushes_allowed_set() {
        let h = harness().await;
        seed_rules(&h.store).await;
        let tenant = TenantId(6);

        let assignment = LevelAssignment {
            level: "basic".to_string(),
            ..LevelAssignment::default()
        };
        h.module
            .apply_level_change(tenant, &assignment)
            .await
            .unwrap();

        let allowed = h.host.allowed_for(tenant);
        assert!(allowed.contains("twenty-one"));
        assert!(allowed.contains("aurora"));
    }

    #[tokio::test]
    async fn test_visible_is_not_activatable() {
        let h = harness().await;
        seed_rules(&h.store).await;
        let tenant = TenantId(6);
        h.levels
            .update_assignment(tenant, &AssignmentChange::new("basic"), None)
            .await
            .unwrap();

        let allowed = h.module.allowed_themes(tenant).await.unwrap();
        let activatable = h.module.activatable_themes(tenant).await.unwrap();

        assert!(allowed.contains("aurora"));
        assert!(!activatable.contains("aurora"));
        assert!(activatable.contains("twenty-one"));
    }

    #[tokio::test]
    async fn test_unassigned_tenant_gets_gap_filled_rules() {
        let h = harness().await;
        let mut stored = ModuleSettings::new();
        stored.insert(
            "unassigned",
            ThemeRules::default().with_available(&["starter-theme"]),
        );
        settings::save_global(&h.store, ThemeControl::SLUG, &stored)
            .await
            .unwrap();

        // Never-assigned tenant resolves through the unassigned payload
        let allowed = h.module.allowed_themes(TenantId(99)).await.unwrap();
        assert!(allowed.contains("starter-theme"));
    }

    #[tokio::test]
    async fn test_reconcile_drops_orphaned_level() {
        let h = harness().await;
        let mut stored = ModuleSettings::new();
        stored.insert("gold", ThemeRules::default().with_available(&["lux"]));
        stored.insert("basic", ThemeRules::default());
        settings::save_global(&h.store, ThemeControl::SLUG, &stored)
            .await
            .unwrap();

        let catalog = h.levels.catalog().await.unwrap();
        h.module.reconcile(&catalog, &catalog).await.unwrap();

        let stored = settings::load::<ThemeRules>(&h.store, ThemeControl::SLUG, None)
            .await
            .unwrap();
        assert!(stored.get("gold").is_none());
        assert!(stored.get("basic").is_some());
    }
}
