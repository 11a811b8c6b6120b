//! # Warden API
//!
//! This crate provides the transport-agnostic JSON admin surface for the
//! Warden platform: typed handlers for the level catalog, per-tenant
//! assignments, and module toggles, plus a path/method dispatcher an
//! embedding HTTP server can delegate to.
//!
//! ## Overview
//!
//! The warden-api crate handles:
//! - **Routing**: `ApiRequest { method, path, body, context }` dispatched
//!   to six admin operations, rendered as `ApiResponse { status, body }`
//! - **Authorization**: a per-route capability table checked against the
//!   caller's [`RequestContext`]; authentication itself stays with the
//!   embedding transport
//! - **Tenant resolution**: ids resolved through the async
//!   [`TenantDirectory`] trait
//! - **Error taxonomy**: validation 400, permission 403, not-found 404,
//!   internal 500, each with a stable `{code, message}` body
//!
//! ## Routes
//!
//! - `GET /levels`: ordered level catalog
//! - `POST /levels`: full-replace the catalog from ordered drafts
//! - `GET /levels/{tenantId}`: tenant metadata plus its current assignment
//! - `POST /levels/{tenantId}`: write the tenant's assignment
//! - `GET /extensions`: module info list
//! - `POST /extensions`: toggle one module
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_api::{AdminApi, ApiRequest, MemoryTenantDirectory, RequestContext, TenantInfo};
//! use warden_engine::{LevelService, ModuleRegistry};
//! use warden_events::EventBus;
//! use warden_store::MemoryStore;
//!
//! async fn serve() {
//!     let store = Arc::new(MemoryStore::new());
//!     let bus = Arc::new(EventBus::new());
//!     let levels = Arc::new(LevelService::new(store.clone(), bus.clone()));
//!     let registry = Arc::new(ModuleRegistry::new(store, bus));
//!
//!     let tenants = MemoryTenantDirectory::new();
//!     tenants
//!         .insert(TenantInfo::new(7u64, "Acme Shop", "acme.example.com"))
//!         .await;
//!
//!     let api = AdminApi::new(levels, registry, Arc::new(tenants));
//!     let response = api
//!         .handle_request(ApiRequest::get("/levels/7", RequestContext::admin()))
//!         .await;
//!     println!("{} {}", response.status, response.body);
//! }
//! ```

pub mod api;
pub mod tenants;
pub mod types;

// Re-export main types
pub use api::{
    AdminApi, ApiError, ApiResult, RequestContext, RouteCapabilities, CAP_MANAGE_NETWORK,
};
pub use tenants::{MemoryTenantDirectory, TenantDirectory, TenantInfo};
pub use types::{
    parse_expiry_date, ApiRequest, ApiResponse, AssignLevelRequest, CatalogResponse, ErrorBody,
    TenantLevelResponse, ToggleModuleRequest, ToggleModuleResponse,
};
