//! Module registry
//!
//! The registry is the one place that knows which policy modules exist and
//! which of them are switched on. Modules are resolved through an explicit
//! factory table built at startup: no ambient lookup, no name-based class
//! resolution. The active set is a plain slug list in the global store;
//! when no list is stored yet, every registered module is active.

use crate::error::{EngineError, EngineResult};
use crate::message::LevelMessage;
use crate::plugin_control::PluginControl;
use crate::policy::{PolicyContext, PolicyModule};
use crate::quota::QuotaManager;
use crate::theme_control::ThemeControl;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use warden_events::{Event, EventBus, EventPayload};
use warden_store::{Scope, SettingsStore};

/// Global storage key for the active module list.
pub const ACTIVE_MODULES_KEY: &str = "active_modules";

/// Activation state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    /// Registered and active
    Enabled,
    /// Registered but switched off
    Disabled,
    /// Active slug with no registered module behind it
    Error,
}

impl ModuleStatus {
    /// String form, as carried on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Enabled => "enabled",
            ModuleStatus::Disabled => "disabled",
            ModuleStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Presentation record for one module, as listed by the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module slug
    pub slug: String,

    /// Display name
    pub name: String,

    /// Display description
    pub description: String,

    /// Thumbnail asset path
    pub thumb: String,

    /// Activation state
    pub status: ModuleStatus,

    /// Admin menu identifier
    pub menu_slug: String,

    /// Settings page path
    pub settings_url: String,
}

/// Constructor entry for one module.
#[derive(Debug, Clone)]
pub struct ModuleFactory {
    /// Module slug
    pub slug: &'static str,

    /// Display name
    pub name: &'static str,

    /// Display description
    pub description: &'static str,

    /// Instance constructor
    pub build: fn(&PolicyContext) -> Arc<dyn PolicyModule>,
}

impl ModuleFactory {
    fn info(&self, status: ModuleStatus) -> ModuleInfo {
        let menu_slug = format!("warden_{}", self.slug);
        ModuleInfo {
            slug: self.slug.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            thumb: format!("/assets/modules/{}/thumbnail.svg", self.slug),
            status,
            settings_url: format!("/admin/modules/{}", self.slug),
            menu_slug,
        }
    }
}

/// The four built-in module factories, in their canonical order.
///
/// The order matters: it is the order instances are built in and therefore
/// the order their subscribers run in.
pub fn builtin_modules() -> Vec<ModuleFactory> {
    vec![
        ModuleFactory {
            slug: PluginControl::SLUG,
            name: "Plugin Control",
            description: "Manage which plugins to restrict or grant access to for given levels.",
            build: |ctx| Arc::new(PluginControl::new(ctx)),
        },
        ModuleFactory {
            slug: ThemeControl::SLUG,
            name: "Theme Control",
            description: "Manage which themes to restrict or grant access to for given levels.",
            build: |ctx| Arc::new(ThemeControl::new(ctx)),
        },
        ModuleFactory {
            slug: QuotaManager::SLUG,
            name: "Quota Manager",
            description: "Set the upload quota for each site level.",
            build: |ctx| Arc::new(QuotaManager::new(ctx)),
        },
        ModuleFactory {
            slug: LevelMessage::SLUG,
            name: "Level Message",
            description: "Display a message for specific site levels.",
            build: |ctx| Arc::new(LevelMessage::new(ctx)),
        },
    ]
}

/// Registry of known modules and their activation state.
pub struct ModuleRegistry {
    store: Arc<dyn SettingsStore>,
    bus: Arc<EventBus>,
    factories: Vec<ModuleFactory>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("factories", &self.factories.len())
            .finish_non_exhaustive()
    }
}

impl ModuleRegistry {
    /// Create a registry seeded with the built-in factories.
    pub fn new(store: Arc<dyn SettingsStore>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            factories: builtin_modules(),
        }
    }

    /// Append a factory. Call before building instances.
    pub fn register_factory(&mut self, factory: ModuleFactory) {
        self.factories.push(factory);
    }

    /// The registered factories, in build order.
    pub fn factories(&self) -> &[ModuleFactory] {
        &self.factories
    }

    fn factory(&self, slug: &str) -> Option<&ModuleFactory> {
        self.factories.iter().find(|factory| factory.slug == slug)
    }

    /// Slugs of the currently active modules.
    ///
    /// When no list has been stored yet, every registered module counts as
    /// active.
    pub async fn active_modules(&self) -> EngineResult<Vec<String>> {
        match self.store.get(Scope::Global, ACTIVE_MODULES_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(self
                .factories
                .iter()
                .map(|factory| factory.slug.to_string())
                .collect()),
        }
    }

    /// Whether a module is currently active.
    pub async fn is_active(&self, slug: &str) -> EngineResult<bool> {
        Ok(self.active_modules().await?.iter().any(|m| m == slug))
    }

    /// Activation state of a module.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ModuleNotFound`] for a slug that is neither
    /// registered nor present in the active list.
    pub async fn status(&self, slug: &str) -> EngineResult<ModuleStatus> {
        let active = self.is_active(slug).await?;
        match (self.factory(slug).is_some(), active) {
            (true, true) => Ok(ModuleStatus::Enabled),
            (true, false) => Ok(ModuleStatus::Disabled),
            (false, true) => Ok(ModuleStatus::Error),
            (false, false) => Err(EngineError::ModuleNotFound(slug.to_string())),
        }
    }

    /// Flip a module's activation state.
    ///
    /// Persists the new active list, emits `module_toggled`, and returns
    /// the refreshed module info. A stale active slug (one with no
    /// registered factory) may still be toggled off; this is the cleanup
    /// path for modules removed from the build.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ModuleNotFound`] for a slug that is neither
    /// registered nor active.
    pub async fn toggle(&self, slug: &str) -> EngineResult<ModuleInfo> {
        let mut active = self.active_modules().await?;
        let position = active.iter().position(|m| m == slug);

        if self.factory(slug).is_none() && position.is_none() {
            return Err(EngineError::ModuleNotFound(slug.to_string()));
        }

        let enabled = match position {
            Some(position) => {
                active.remove(position);
                false
            }
            None => {
                active.push(slug.to_string());
                true
            }
        };

        self.store
            .set(
                Scope::Global,
                ACTIVE_MODULES_KEY,
                serde_json::to_value(&active)?,
            )
            .await?;
        info!(module = slug, enabled, "module toggled");

        self.bus
            .publish(Event::new(EventPayload::ModuleToggled {
                module: slug.to_string(),
                enabled,
            }))
            .await;

        let status = if enabled {
            ModuleStatus::Enabled
        } else {
            ModuleStatus::Disabled
        };
        Ok(match self.factory(slug) {
            Some(factory) => factory.info(status),
            None => stale_info(slug, status),
        })
    }

    /// Presentation records for every registered module, plus an error
    /// entry for each active slug with no factory behind it.
    pub async fn list(&self) -> EngineResult<Vec<ModuleInfo>> {
        let active = self.active_modules().await?;
        let mut infos: Vec<ModuleInfo> = self
            .factories
            .iter()
            .map(|factory| {
                let status = if active.iter().any(|m| m == factory.slug) {
                    ModuleStatus::Enabled
                } else {
                    ModuleStatus::Disabled
                };
                factory.info(status)
            })
            .collect();

        for slug in &active {
            if self.factory(slug).is_none() {
                infos.push(stale_info(slug, ModuleStatus::Error));
            }
        }

        Ok(infos)
    }

    /// Build instances of the active modules, in factory order.
    ///
    /// Active slugs with no factory are skipped with a warning; they stay
    /// visible as error entries in [`ModuleRegistry::list`].
    pub async fn build_active(
        &self,
        ctx: &PolicyContext,
    ) -> EngineResult<Vec<Arc<dyn PolicyModule>>> {
        let active = self.active_modules().await?;

        for slug in &active {
            if self.factory(slug).is_none() {
                warn!(module = slug.as_str(), "active module has no registered factory");
            }
        }

        Ok(self
            .factories
            .iter()
            .filter(|factory| active.iter().any(|m| m == factory.slug))
            .map(|factory| (factory.build)(ctx))
            .collect())
    }
}

fn stale_info(slug: &str, status: ModuleStatus) -> ModuleInfo {
    ModuleInfo {
        slug: slug.to_string(),
        name: slug.to_string(),
        description: "No module is registered under this identifier.".to_string(),
        thumb: String::new(),
        status,
        menu_slug: String::new(),
        settings_url: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::{MemoryPluginHost, MemoryThemeHost};
    use crate::service::LevelService;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use warden_events::{EventHandler, EventKind, HandlerError};
    use warden_store::MemoryStore;

    struct ToggleRecorder {
        log: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl EventHandler for ToggleRecorder {
        fn name(&self) -> &str {
            "toggle-recorder"
        }

        fn interests(&self) -> &'static [EventKind] {
            &[EventKind::ModuleToggled]
        }

        async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
            if let EventPayload::ModuleToggled { module, enabled } = &event.payload {
                self.log.lock().unwrap().push((module.clone(), *enabled));
            }
            Ok(())
        }
    }

    struct Harness {
        store: MemoryStore,
        registry: ModuleRegistry,
        recorder: Arc<ToggleRecorder>,
        ctx: PolicyContext,
    }

    async fn harness() -> Harness {
        let store = MemoryStore::new();
        let bus = Arc::new(EventBus::new());
        let recorder = Arc::new(ToggleRecorder {
            log: Mutex::new(Vec::new()),
        });
        bus.register(recorder.clone()).await;

        let levels = Arc::new(LevelService::new(Arc::new(store.clone()), bus.clone()));
        let ctx = PolicyContext {
            store: Arc::new(store.clone()),
            levels,
            plugin_host: Arc::new(MemoryPluginHost::new(warden_store::TenantId(1))),
            theme_host: Arc::new(MemoryThemeHost::new()),
        };
        Harness {
            registry: ModuleRegistry::new(Arc::new(store.clone()), bus),
            store,
            recorder,
            ctx,
        }
    }

    #[tokio::test]
    async fn test_all_builtins_active_by_default() {
        let h = harness().await;
        let active = h.registry.active_modules().await.unwrap();
        assert_eq!(
            active,
            ["plugin_control", "theme_control", "quota_manager", "level_message"]
        );
        assert_eq!(
            h.registry.status("quota_manager").await.unwrap(),
            ModuleStatus::Enabled
        );
    }

    #[tokio::test]
    async fn test_toggle_flips_and_emits() {
        let h = harness().await;

        let info = h.registry.toggle("quota_manager").await.unwrap();
        assert_eq!(info.status, ModuleStatus::Disabled);
        assert!(!h.registry.is_active("quota_manager").await.unwrap());

        let info = h.registry.toggle("quota_manager").await.unwrap();
        assert_eq!(info.status, ModuleStatus::Enabled);

        let log = h.recorder.log.lock().unwrap().clone();
        assert_eq!(
            log,
            [
                ("quota_manager".to_string(), false),
                ("quota_manager".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_unknown_module() {
        let h = harness().await;
        let err = h.registry.toggle("crystal_ball").await.unwrap_err();
        assert!(matches!(err, EngineError::ModuleNotFound(_)));
        assert!(h.recorder.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_active_slug_listed_and_removable() {
        let h = harness().await;
        h.store
            .set(
                Scope::Global,
                ACTIVE_MODULES_KEY,
                json!(["plugin_control", "ghost_module"]),
            )
            .await
            .unwrap();

        let list = h.registry.list().await.unwrap();
        let ghost = list.iter().find(|m| m.slug == "ghost_module").unwrap();
        assert_eq!(ghost.status, ModuleStatus::Error);
        assert_eq!(
            h.registry.status("ghost_module").await.unwrap(),
            ModuleStatus::Error
        );

        // Stale entries can be toggled off to clean them up
        let info = h.registry.toggle("ghost_module").await.unwrap();
        assert_eq!(info.status, ModuleStatus::Disabled);
        assert!(!h.registry.is_active("ghost_module").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_reports_metadata() {
        let h = harness().await;
        let list = h.registry.list().await.unwrap();
        assert_eq!(list.len(), 4);

        let plugin = &list[0];
        assert_eq!(plugin.slug, "plugin_control");
        assert_eq!(plugin.name, "Plugin Control");
        assert_eq!(plugin.menu_slug, "warden_plugin_control");
        assert!(plugin.thumb.ends_with("thumbnail.svg"));
    }

    #[tokio::test]
    async fn test_build_active_respects_toggles_and_order() {
        let h = harness().await;
        h.registry.toggle("theme_control").await.unwrap();

        let modules = h.registry.build_active(&h.ctx).await.unwrap();
        let slugs: Vec<&str> = modules.iter().map(|m| m.slug()).collect();
        assert_eq!(slugs, ["plugin_control", "quota_manager", "level_message"]);
    }

    #[tokio::test]
    async fn test_third_party_factory_registration() {
        let mut h = harness().await;
        h.registry.register_factory(ModuleFactory {
            slug: "badge_case",
            name: "Badge Case",
            description: "Show achievement badges per level.",
            build: |ctx| Arc::new(QuotaManager::new(ctx)),
        });

        // No stored list: the new factory is active by default too
        let active = h.registry.active_modules().await.unwrap();
        assert!(active.iter().any(|m| m == "badge_case"));
        assert_eq!(h.registry.list().await.unwrap().len(), 5);
    }
}
