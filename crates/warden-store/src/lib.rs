//! # Warden Store
//!
//! This crate provides the settings persistence contract for the Warden
//! platform: a scoped key/value store of JSON records shared by the level
//! catalog, per-tenant level assignments, and the policy modules.
//!
//! ## Overview
//!
//! The warden-store crate handles:
//! - **Scoping**: every record is either network-global or owned by one tenant
//! - **Storage contract**: the async [`SettingsStore`] trait backends implement
//! - **Reference backend**: [`MemoryStore`] for tests and single-process use
//!
//! The contract is deliberately small: `get`, `set`, `delete`. There is no
//! enumeration of keys or tenants, so callers that need cleanup across tenant
//! records must do it lazily when a record is next read.
//!
//! ## Record layout
//!
//! The platform stores its state under a fixed set of keys:
//!
//! | scope  | key                  | record                               |
//! |--------|----------------------|--------------------------------------|
//! | global | `levels`             | the level catalog                    |
//! | global | `active_modules`     | enabled policy-module slugs          |
//! | global | `<module>_options`   | per-level settings of one module     |
//! | tenant | `level_details`      | the tenant's level assignment        |
//! | tenant | `<module>_settings`  | per-tenant override of one module    |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_store::{MemoryStore, Scope, SettingsStore, TenantId};
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!
//!     // Global record
//!     store
//!         .set(Scope::Global, "levels", serde_json::json!([]))
//!         .await
//!         .unwrap();
//!
//!     // Tenant record
//!     let tenant = TenantId(7);
//!     store
//!         .set(Scope::Tenant(tenant), "level_details", serde_json::json!({}))
//!         .await
//!         .unwrap();
//!
//!     assert!(store.get(Scope::Global, "levels").await.unwrap().is_some());
//! }
//! ```

pub mod store;

// Re-export main types
pub use store::{MemoryStore, Scope, SettingsStore, StoreError, StoreResult, TenantId};
