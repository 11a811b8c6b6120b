//! # Warden Engine
//!
//! This crate ties the level catalog, per-tenant assignments, and the
//! policy modules together into one entitlement engine for a multi-tenant
//! network.
//!
//! ## Overview
//!
//! The warden-engine crate handles:
//! - **Levels**: Catalog edits and per-tenant assignment writes, with
//!   expiry and stale-reference repair enforced on every read
//! - **Events**: Catalog and assignment changes published on the bus,
//!   with policy modules subscribed through [`PolicySubscriber`]
//! - **Modules**: The registry of policy modules, their activation
//!   state, and the factory table that builds active instances
//! - **Settings**: The shared per-level settings shape all modules
//!   persist, with global records and per-tenant overrides
//! - **Hosts**: The plugin and theme surfaces modules act on, plus
//!   in-memory implementations for tests
//!
//! ## Built-in Modules
//!
//! - `plugin_control`: forces and restricts plugin activation per level
//! - `theme_control`: gates which themes a tenant may see and activate
//! - `quota_manager`: maps levels to an upload quota in megabytes
//! - `level_message`: renders level-specific notices around content
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_engine::{
//!     register_policies, LevelService, MemoryPluginHost, MemoryThemeHost,
//!     ModuleRegistry, PolicyContext,
//! };
//! use warden_events::EventBus;
//! use warden_levels::AssignmentChange;
//! use warden_store::{MemoryStore, TenantId};
//!
//! async fn setup() -> warden_engine::EngineResult<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let bus = Arc::new(EventBus::new());
//!     let levels = Arc::new(LevelService::new(store.clone(), bus.clone()));
//!
//!     let ctx = PolicyContext {
//!         store: store.clone(),
//!         levels: levels.clone(),
//!         plugin_host: Arc::new(MemoryPluginHost::new(TenantId(1))),
//!         theme_host: Arc::new(MemoryThemeHost::new()),
//!     };
//!     let registry = ModuleRegistry::new(store, bus.clone());
//!     let modules = registry.build_active(&ctx).await?;
//!     register_policies(&bus, &modules).await;
//!
//!     let update = levels
//!         .update_assignment(TenantId(7), &AssignmentChange::new("premium"), None)
//!         .await?;
//!     println!("tenant 7 is now {}", update.assignment.level);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hosts;
pub mod message;
pub mod plugin_control;
pub mod policy;
pub mod quota;
pub mod registry;
pub mod service;
pub mod settings;
pub mod subscriber;
pub mod theme_control;

// Re-export main types
pub use error::{EngineError, EngineResult};
pub use policy::{PolicyContext, PolicyModule};
pub use service::{
    AssignmentUpdate, CatalogUpdate, LevelService, LEVELS_KEY, LEVEL_DETAILS_KEY,
};
pub use subscriber::{register_policies, PolicySubscriber};

// Re-export the module registry
pub use registry::{
    builtin_modules, ModuleFactory, ModuleInfo, ModuleRegistry, ModuleStatus,
    ACTIVE_MODULES_KEY,
};

// Re-export host surfaces
pub use hosts::{
    MemoryPluginHost, MemoryThemeHost, PluginHost, TenantScope, ThemeHost,
};

// Re-export the settings shape
pub use settings::{options_key, override_key, ModuleSettings};

// Re-export the built-in modules and their rule records
pub use message::{LevelMessage, MessageRule};
pub use plugin_control::{PluginControl, PluginRules};
pub use quota::{QuotaManager, QuotaRule};
pub use theme_control::{ThemeControl, ThemeRules};
