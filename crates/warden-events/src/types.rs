//! Event types for level-transition signalling
//!
//! This module defines the typed events the platform publishes when the
//! catalog, a tenant assignment, or the module toggle state changes. The
//! payload enum is closed on purpose: subscribers match on variants instead
//! of parsing string-keyed payloads, so a payload change is a compile error
//! in every consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_levels::{LevelAssignment, LevelCatalog};
use warden_store::TenantId;

/// Event envelope.
///
/// Wraps a typed payload with the metadata used for audit trails and log
/// correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Timestamp when the event was created
    pub timestamp: DateTime<Utc>,

    /// Typed payload
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event around a payload.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// The kind of the wrapped payload.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Typed event payloads.
///
/// Serialized with an internal `type` tag, so the wire form carries the
/// event name alongside its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// The level catalog was replaced
    LevelCatalogUpdated {
        /// Catalog after the edit
        new_catalog: LevelCatalog,
        /// Catalog before the edit
        old_catalog: LevelCatalog,
    },

    /// A tenant's assignment record was written
    ///
    /// Emitted on every write, including writes that change nothing;
    /// subscribers re-apply consequences on each one.
    SiteLevelUpdated {
        /// Tenant whose record was written
        tenant: TenantId,
        /// The record as persisted
        assignment: LevelAssignment,
        /// Audit annotation supplied by the writer
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A tenant's assignment expired and reverted
    ///
    /// Always followed by a `SiteLevelUpdated` carrying the reverted record.
    SiteLevelExpired {
        /// Tenant whose assignment expired
        tenant: TenantId,
        /// The record after the revert
        assignment: LevelAssignment,
    },

    /// A policy module was enabled or disabled
    ModuleToggled {
        /// Module slug
        module: String,
        /// New state
        enabled: bool,
    },
}

impl EventPayload {
    /// The kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::LevelCatalogUpdated { .. } => EventKind::LevelCatalogUpdated,
            EventPayload::SiteLevelUpdated { .. } => EventKind::SiteLevelUpdated,
            EventPayload::SiteLevelExpired { .. } => EventKind::SiteLevelExpired,
            EventPayload::ModuleToggled { .. } => EventKind::ModuleToggled,
        }
    }
}

/// Event kind discriminant, used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Catalog replaced
    LevelCatalogUpdated,
    /// Tenant assignment written
    SiteLevelUpdated,
    /// Tenant assignment expired
    SiteLevelExpired,
    /// Module enabled or disabled
    ModuleToggled,
}

impl EventKind {
    /// Every kind, in a stable order.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::LevelCatalogUpdated,
            EventKind::SiteLevelUpdated,
            EventKind::SiteLevelExpired,
            EventKind::ModuleToggled,
        ]
    }

    /// Get string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LevelCatalogUpdated => "level_catalog_updated",
            EventKind::SiteLevelUpdated => "site_level_updated",
            EventKind::SiteLevelExpired => "site_level_expired",
            EventKind::ModuleToggled => "module_toggled",
        }
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "level_catalog_updated" => Some(EventKind::LevelCatalogUpdated),
            "site_level_updated" => Some(EventKind::SiteLevelUpdated),
            "site_level_expired" => Some(EventKind::SiteLevelExpired),
            "module_toggled" => Some(EventKind::ModuleToggled),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
