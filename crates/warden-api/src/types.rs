//! Admin API wire types
//!
//! Request and response bodies for the JSON admin surface. The surface is
//! transport-agnostic: an embedding server maps its own request type onto
//! [`ApiRequest`], hands it to the dispatcher, and writes the resulting
//! [`ApiResponse`] back out.

use crate::api::{ApiError, ApiResult, RequestContext};
use crate::tenants::TenantInfo;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use warden_engine::{ModuleInfo, ModuleStatus};
use warden_events::HandlerFailure;
use warden_levels::{AssignmentChange, Level, LevelAssignment, UNASSIGNED};

/// A routed admin request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method, uppercase
    pub method: String,

    /// Path below the mount point, e.g. `/levels/7`
    pub path: String,

    /// Parsed JSON body, when the transport received one
    pub body: Option<serde_json::Value>,

    /// Caller identity, as established by the transport
    pub context: RequestContext,
}

impl ApiRequest {
    /// Build a GET request.
    pub fn get(path: impl Into<String>, context: RequestContext) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            body: None,
            context,
        }
    }

    /// Build a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value, context: RequestContext) -> Self {
        Self {
            method: "POST".to_string(),
            path: path.into(),
            body: Some(body),
            context,
        }
    }
}

/// A rendered admin response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,

    /// JSON body
    pub body: serde_json::Value,
}

impl ApiResponse {
    /// Render an error as its status and `{code, message}` body.
    pub fn from_error(error: &ApiError) -> Self {
        Self {
            status: error.status_code(),
            body: serde_json::json!({
                "code": error.error_code(),
                "message": error.to_string(),
            }),
        }
    }
}

/// Error body carried on every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub code: String,

    /// Human-readable description
    pub message: String,
}

fn default_revert() -> String {
    UNASSIGNED.to_string()
}

/// Body of `POST /levels/{tenantId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignLevelRequest {
    /// Level slug to assign
    pub level: String,

    /// Fallback slug on expiry
    #[serde(default = "default_revert")]
    pub revert_level: String,

    /// Whether the assignment is scheduled to expire
    #[serde(default)]
    pub can_expire: bool,

    /// Expiry date as `YYYY-MM-DD`; required iff `can_expire`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,

    /// Free-text reason recorded on the transition event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AssignLevelRequest {
    /// Build a non-expiring request for a level.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            revert_level: default_revert(),
            can_expire: false,
            expiry_date: None,
            reason: None,
        }
    }

    /// Set the fallback level on expiry.
    pub fn with_revert_level(mut self, revert_level: impl Into<String>) -> Self {
        self.revert_level = revert_level.into();
        self
    }

    /// Schedule expiry on the given `YYYY-MM-DD` date.
    pub fn with_expiry_date(mut self, date: impl Into<String>) -> Self {
        self.can_expire = true;
        self.expiry_date = Some(date.into());
        self
    }

    /// Attach a transition reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Convert into the domain change, parsing the expiry date.
    ///
    /// A submitted date is ignored unless `can_expire` is set.
    pub fn to_change(&self) -> ApiResult<AssignmentChange> {
        let mut change =
            AssignmentChange::new(&self.level).with_revert_level(&self.revert_level);
        if self.can_expire {
            let date = self.expiry_date.as_deref().ok_or_else(|| {
                ApiError::Validation(
                    "expiry_date is required when can_expire is set".to_string(),
                )
            })?;
            change = change.with_expiry(parse_expiry_date(date)?);
        }
        Ok(change)
    }
}

/// Parse a `YYYY-MM-DD` date into a unix timestamp at midnight UTC.
pub fn parse_expiry_date(date: &str) -> ApiResult<i64> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("Invalid expiry date: {date}")))?;
    let midnight = parsed
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::Validation(format!("Invalid expiry date: {date}")))?;
    Ok(midnight.and_utc().timestamp())
}

/// Response of `POST /levels`.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    /// Ordered catalog, without the synthetic zero level
    pub levels: Vec<Level>,

    /// Subscriber failures captured while applying the edit
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<HandlerFailure>,
}

/// Response of `GET /levels/{tenantId}` and `POST /levels/{tenantId}`.
#[derive(Debug, Clone, Serialize)]
pub struct TenantLevelResponse {
    /// Tenant metadata from the directory
    pub tenant: TenantInfo,

    /// The tenant's normalized assignment record
    pub assignment: LevelAssignment,

    /// Subscriber failures captured while applying the change
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<HandlerFailure>,
}

/// Body of `POST /extensions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleModuleRequest {
    /// Slug of the module to toggle
    pub module: String,
}

/// Response of `POST /extensions`.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleModuleResponse {
    /// Activation state after the toggle
    pub status: ModuleStatus,

    /// Refreshed module info
    pub module: ModuleInfo,
}
