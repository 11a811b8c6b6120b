//! Admin API service
//!
//! One service struct exposes the six admin operations as typed methods,
//! plus a path/method dispatcher over them for transports that hand in raw
//! requests. Every route checks a capability from the route table before
//! touching the engine; filling [`RequestContext`] from authentication is
//! the embedding transport's job.

use crate::tenants::{TenantDirectory, TenantInfo};
use crate::types::{
    ApiRequest, ApiResponse, AssignLevelRequest, CatalogResponse, TenantLevelResponse,
    ToggleModuleRequest, ToggleModuleResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use warden_engine::{EngineError, LevelService, ModuleInfo, ModuleRegistry};
use warden_levels::{Level, LevelDraft, LevelError};
use warden_store::TenantId;

/// Admin API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The addressed route, tenant, or module does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller lacks the route's capability
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Store or serialization failure behind the surface
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for admin API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status the error renders as.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Permission(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Permission(_) => "permission_error",
            ApiError::NotFound(_) => "not_found_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Level(level) => level.into(),
            EngineError::ModuleNotFound(slug) => ApiError::NotFound(format!("module {slug}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<LevelError> for ApiError {
    fn from(err: LevelError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// The administrative capability every route requires by default.
pub const CAP_MANAGE_NETWORK: &str = "manage_network";

/// Caller identity for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Capabilities granted to the caller
    pub capabilities: Vec<String>,
}

impl RequestContext {
    /// Create a context with no capabilities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a context carrying the administrative capability.
    pub fn admin() -> Self {
        Self::with_capabilities(&[CAP_MANAGE_NETWORK])
    }

    /// Create a context with the given capabilities.
    pub fn with_capabilities(capabilities: &[&str]) -> Self {
        Self {
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Check if the caller holds a specific capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(&capability.to_string())
    }
}

/// Capability required per route.
///
/// The default table guards every route, reads included, with
/// [`CAP_MANAGE_NETWORK`].
#[derive(Debug, Clone)]
pub struct RouteCapabilities {
    /// `GET /levels`
    pub list_levels: String,

    /// `POST /levels`
    pub replace_levels: String,

    /// `GET /levels/{tenantId}`
    pub read_tenant_level: String,

    /// `POST /levels/{tenantId}`
    pub assign_tenant_level: String,

    /// `GET /extensions`
    pub list_modules: String,

    /// `POST /extensions`
    pub toggle_module: String,
}

impl Default for RouteCapabilities {
    fn default() -> Self {
        let cap = CAP_MANAGE_NETWORK.to_string();
        Self {
            list_levels: cap.clone(),
            replace_levels: cap.clone(),
            read_tenant_level: cap.clone(),
            assign_tenant_level: cap.clone(),
            list_modules: cap.clone(),
            toggle_module: cap,
        }
    }
}

/// The admin surface over the entitlement engine.
pub struct AdminApi {
    levels: Arc<LevelService>,
    registry: Arc<ModuleRegistry>,
    tenants: Arc<dyn TenantDirectory>,
    routes: RouteCapabilities,
}

impl std::fmt::Debug for AdminApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminApi")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl AdminApi {
    /// Create the surface with the default route capabilities.
    pub fn new(
        levels: Arc<LevelService>,
        registry: Arc<ModuleRegistry>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            levels,
            registry,
            tenants,
            routes: RouteCapabilities::default(),
        }
    }

    /// Replace the per-route capability table.
    pub fn with_routes(mut self, routes: RouteCapabilities) -> Self {
        self.routes = routes;
        self
    }

    fn authorize(&self, context: &RequestContext, capability: &str) -> ApiResult<()> {
        if context.has_capability(capability) {
            Ok(())
        } else {
            Err(ApiError::Permission(format!(
                "Missing capability: {capability}"
            )))
        }
    }

    async fn resolve_tenant(&self, tenant: TenantId) -> ApiResult<TenantInfo> {
        self.tenants
            .lookup(tenant)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant}")))
    }

    /// `GET /levels`: the ordered catalog, without the zero level.
    pub async fn list_levels(&self, context: &RequestContext) -> ApiResult<Vec<Level>> {
        self.authorize(context, &self.routes.list_levels)?;
        Ok(self.levels.catalog().await?.levels().to_vec())
    }

    /// `POST /levels`: full-replace the catalog from ordered drafts.
    pub async fn replace_levels(
        &self,
        drafts: &[LevelDraft],
        context: &RequestContext,
    ) -> ApiResult<CatalogResponse> {
        self.authorize(context, &self.routes.replace_levels)?;
        let update = self.levels.replace_catalog(drafts).await?;
        Ok(CatalogResponse {
            levels: update.catalog.levels().to_vec(),
            warnings: update.warnings,
        })
    }

    /// `GET /levels/{tenantId}`: tenant metadata plus the current record.
    ///
    /// The read goes through enforcement, so a lapsed or stale record is
    /// repaired before it is returned.
    pub async fn tenant_level(
        &self,
        tenant: TenantId,
        context: &RequestContext,
    ) -> ApiResult<TenantLevelResponse> {
        self.authorize(context, &self.routes.read_tenant_level)?;
        let info = self.resolve_tenant(tenant).await?;
        let assignment = self.levels.assignment(tenant).await?;
        Ok(TenantLevelResponse {
            tenant: info,
            assignment,
            warnings: Vec::new(),
        })
    }

    /// `POST /levels/{tenantId}`: write the tenant's assignment.
    pub async fn assign_level(
        &self,
        tenant: TenantId,
        request: &AssignLevelRequest,
        context: &RequestContext,
    ) -> ApiResult<TenantLevelResponse> {
        self.authorize(context, &self.routes.assign_tenant_level)?;
        let info = self.resolve_tenant(tenant).await?;
        let change = request.to_change()?;
        let update = self
            .levels
            .update_assignment(tenant, &change, request.reason.clone())
            .await?;
        Ok(TenantLevelResponse {
            tenant: info,
            assignment: update.assignment,
            warnings: update.warnings,
        })
    }

    /// `GET /extensions`: info for every known module.
    pub async fn list_modules(&self, context: &RequestContext) -> ApiResult<Vec<ModuleInfo>> {
        self.authorize(context, &self.routes.list_modules)?;
        Ok(self.registry.list().await?)
    }

    /// `POST /extensions`: flip one module's activation state.
    pub async fn toggle_module(
        &self,
        slug: &str,
        context: &RequestContext,
    ) -> ApiResult<ToggleModuleResponse> {
        self.authorize(context, &self.routes.toggle_module)?;
        let module = self.registry.toggle(slug).await?;
        Ok(ToggleModuleResponse {
            status: module.status,
            module,
        })
    }

    /// Route a request to its handler and render the response.
    pub async fn handle_request(&self, request: ApiRequest) -> ApiResponse {
        debug!(method = %request.method, path = %request.path, "admin request");
        match self.route(request).await {
            Ok(response) => response,
            Err(error) => ApiResponse::from_error(&error),
        }
    }

    async fn route(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let path = request.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let context = &request.context;

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["levels"]) => respond(&self.list_levels(context).await?),
            ("POST", ["levels"]) => {
                let drafts: Vec<LevelDraft> = parse_body(request.body.as_ref())?;
                respond(&self.replace_levels(&drafts, context).await?)
            }
            ("GET", ["levels", id]) => {
                let tenant = parse_tenant(id)?;
                respond(&self.tenant_level(tenant, context).await?)
            }
            ("POST", ["levels", id]) => {
                let tenant = parse_tenant(id)?;
                let body: AssignLevelRequest = parse_body(request.body.as_ref())?;
                respond(&self.assign_level(tenant, &body, context).await?)
            }
            ("GET", ["extensions"]) => respond(&self.list_modules(context).await?),
            ("POST", ["extensions"]) => {
                let body: ToggleModuleRequest = parse_body(request.body.as_ref())?;
                respond(&self.toggle_module(&body.module, context).await?)
            }
            _ => Err(ApiError::NotFound(format!(
                "No route for {} /{}",
                request.method, path
            ))),
        }
    }
}

// Tenant path segments must be numeric; anything else is an unmatched route.
fn parse_tenant(segment: &str) -> ApiResult<TenantId> {
    segment
        .parse::<u64>()
        .map(TenantId)
        .map_err(|_| ApiError::NotFound(format!("No route for /levels/{segment}")))
}

fn parse_body<T: DeserializeOwned>(body: Option<&serde_json::Value>) -> ApiResult<T> {
    let body = body.ok_or_else(|| ApiError::Validation("Missing request body".to_string()))?;
    serde_json::from_value(body.clone())
        .map_err(|err| ApiError::Validation(format!("Malformed request body: {err}")))
}

fn respond<T: Serialize>(payload: &T) -> ApiResult<ApiResponse> {
    Ok(ApiResponse {
        status: 200,
        body: serde_json::to_value(payload).map_err(|err| ApiError::Internal(err.to_string()))?,
    })
}
