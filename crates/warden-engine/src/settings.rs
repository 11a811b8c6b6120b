//! Per-module level settings
//!
//! Every policy module stores one record per scope: a global record under
//! `<module>_options` and an optional per-tenant override under
//! `<module>_settings`. The record is a `site_override` flag plus a
//! slug-keyed map of module-specific payloads, flattened so the stored JSON
//! reads `{"site_override": false, "basic": {...}, "premium": {...}}`.
//!
//! Two rules keep these records consistent with a catalog that admins edit
//! freely:
//!
//! - **Gap-filling**: slugs present in the catalog but missing from the
//!   record inherit a copy of the `unassigned` payload at read time (payload
//!   default when even that is absent). New levels need no write to become
//!   usable.
//! - **Reconciliation**: when the catalog is replaced, slugs that no longer
//!   exist are dropped from the persisted global record. Per-tenant
//!   overrides are pruned lazily on read instead, because the store exposes
//!   no key enumeration.

use crate::error::EngineResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warden_levels::LevelCatalog;
use warden_store::{Scope, SettingsStore, TenantId};

/// Storage key for a module's global settings record.
pub fn options_key(module: &str) -> String {
    format!("{module}_options")
}

/// Storage key for a module's per-tenant override record.
pub fn override_key(module: &str) -> String {
    format!("{module}_settings")
}

/// A module's settings record: the override flag plus one payload per level
/// slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSettings<P> {
    /// Whether a tenant record replaces the global one; meta-key, never
    /// treated as a level slug
    #[serde(default)]
    pub site_override: bool,

    /// Payloads keyed by level slug
    #[serde(flatten)]
    pub per_level: BTreeMap<String, P>,
}

impl<P> ModuleSettings<P> {
    /// Create an empty record with `site_override` off.
    pub fn new() -> Self {
        Self {
            site_override: false,
            per_level: BTreeMap::new(),
        }
    }

    /// Store a payload for a slug.
    pub fn insert(&mut self, slug: impl Into<String>, payload: P) {
        self.per_level.insert(slug.into(), payload);
    }

    /// The stored payload for a slug, if any. No gap-filling.
    pub fn get(&self, slug: &str) -> Option<&P> {
        self.per_level.get(slug)
    }

    /// Drop entries whose slug is neither in the catalog nor `unassigned`.
    ///
    /// Returns how many entries were removed. `site_override` is a struct
    /// field, not a map entry, so it survives by construction.
    pub fn retain_known(&mut self, catalog: &LevelCatalog) -> usize {
        let before = self.per_level.len();
        self.per_level.retain(|slug, _| catalog.is_known(slug));
        before - self.per_level.len()
    }
}

impl<P: Clone + Default> ModuleSettings<P> {
    /// Resolve the record against a catalog: one payload for every slug in
    /// catalog ∪ {`unassigned`}.
    ///
    /// Missing slugs inherit a clone of the `unassigned` payload; when even
    /// that is absent the payload default is used. Stored slugs no longer in
    /// the catalog are not returned (read-side prune).
    pub fn resolved(&self, catalog: &LevelCatalog) -> BTreeMap<String, P> {
        let fallback = self
            .per_level
            .get(warden_levels::UNASSIGNED)
            .cloned()
            .unwrap_or_default();

        catalog
            .with_zero_level()
            .slugs()
            .map(|slug| {
                let payload = self
                    .per_level
                    .get(slug)
                    .cloned()
                    .unwrap_or_else(|| fallback.clone());
                (slug.to_string(), payload)
            })
            .collect()
    }
}

impl<P> Default for ModuleSettings<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the settings record that applies to the given tenant.
///
/// A tenant override is honored only when it exists and carries
/// `site_override: true`; everything else falls through to the global
/// record, and an empty record when nothing is stored at all.
pub async fn load<P: DeserializeOwned>(
    store: &dyn SettingsStore,
    module: &str,
    tenant: Option<TenantId>,
) -> EngineResult<ModuleSettings<P>> {
    if let Some(tenant) = tenant {
        if let Some(value) = store.get(Scope::Tenant(tenant), &override_key(module)).await? {
            let settings: ModuleSettings<P> = serde_json::from_value(value)?;
            if settings.site_override {
                return Ok(settings);
            }
        }
    }

    match store.get(Scope::Global, &options_key(module)).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(ModuleSettings::new()),
    }
}

/// Persist a module's global settings record.
pub async fn save_global<P: Serialize>(
    store: &dyn SettingsStore,
    module: &str,
    settings: &ModuleSettings<P>,
) -> EngineResult<()> {
    store
        .set(Scope::Global, &options_key(module), serde_json::to_value(settings)?)
        .await?;
    Ok(())
}

/// Persist a module's per-tenant override record.
pub async fn save_override<P: Serialize>(
    store: &dyn SettingsStore,
    module: &str,
    tenant: TenantId,
    settings: &ModuleSettings<P>,
) -> EngineResult<()> {
    store
        .set(
            Scope::Tenant(tenant),
            &override_key(module),
            serde_json::to_value(settings)?,
        )
        .await?;
    Ok(())
}

/// Reconcile a module's persisted global record against a new catalog.
///
/// Drops orphaned slugs and writes the record back only when something was
/// dropped. Returns the number of dropped entries. Newly added slugs are
/// not materialized; gap-filling covers them.
pub async fn reconcile_global<P>(
    store: &dyn SettingsStore,
    module: &str,
    catalog: &LevelCatalog,
) -> EngineResult<usize>
where
    P: Serialize + DeserializeOwned,
{
    let key = options_key(module);
    let Some(value) = store.get(Scope::Global, &key).await? else {
        return Ok(0);
    };

    let mut settings: ModuleSettings<P> = serde_json::from_value(value)?;
    let dropped = settings.retain_known(catalog);
    if dropped > 0 {
        store
            .set(Scope::Global, &key, serde_json::to_value(&settings)?)
            .await?;
    }
    Ok(dropped)
}
