//! Policy module contract
//!
//! A policy module maps levels to one concrete restriction (plugins,
//! themes, quota, messaging). Modules keep their own per-level settings
//! records and stay consistent with the catalog through the two callbacks
//! here, driven by the event subscriber in [`crate::subscriber`].

use crate::error::EngineResult;
use crate::hosts::{PluginHost, ThemeHost};
use crate::service::LevelService;
use async_trait::async_trait;
use std::sync::Arc;
use warden_levels::{LevelAssignment, LevelCatalog};
use warden_store::{SettingsStore, TenantId};

/// Everything a policy module needs, injected at construction.
#[derive(Clone)]
pub struct PolicyContext {
    /// Settings persistence
    pub store: Arc<dyn SettingsStore>,

    /// Catalog and assignment reads
    pub levels: Arc<LevelService>,

    /// Plugin management surface
    pub plugin_host: Arc<dyn PluginHost>,

    /// Theme gating surface
    pub theme_host: Arc<dyn ThemeHost>,
}

impl std::fmt::Debug for PolicyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyContext").finish_non_exhaustive()
    }
}

/// Contract every policy module implements.
#[async_trait]
pub trait PolicyModule: Send + Sync {
    /// Stable identifier; doubles as the settings key prefix.
    fn slug(&self) -> &'static str;

    /// Align persisted settings with a replaced catalog.
    ///
    /// Called after every catalog edit with both catalogs. Implementations
    /// drop orphaned slugs from their global record; newly added slugs need
    /// no action (gap-filling covers them on read).
    async fn reconcile(
        &self,
        new_catalog: &LevelCatalog,
        old_catalog: &LevelCatalog,
    ) -> EngineResult<()>;

    /// Apply this module's consequence of a level transition.
    ///
    /// Called on every assignment write with the persisted record, including
    /// writes that changed nothing. Modules without a transition consequence
    /// keep the default no-op.
    async fn apply_level_change(
        &self,
        tenant: TenantId,
        assignment: &LevelAssignment,
    ) -> EngineResult<()> {
        let _ = (tenant, assignment);
        Ok(())
    }
}
