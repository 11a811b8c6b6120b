//! # Warden Levels
//!
//! This crate provides the membership-level domain model for the Warden
//! platform: the ordered level catalog, slug normalization, and the
//! per-tenant assignment record with its lazy expiry rules.
//!
//! ## Overview
//!
//! The warden-levels crate handles:
//! - **Slugs**: deterministic, idempotent normalization of level names, plus
//!   collision disambiguation ([`slug`])
//! - **Catalog**: the ordered, slug-unique list of levels with built-in
//!   defaults and the synthetic `unassigned` zero level ([`catalog`])
//! - **Assignments**: the single current-state record each tenant carries,
//!   including day-granularity expiry evaluation ([`assignment`])
//!
//! Everything here is pure data and validation; persistence and event
//! emission live in `warden-engine`.
//!
//! ## Usage
//!
//! ```
//! use warden_levels::{AssignmentChange, LevelCatalog, LevelDraft};
//!
//! // Rebuild the catalog from submitted rows
//! let catalog = LevelCatalog::from_drafts(&[
//!     LevelDraft::new("Basic"),
//!     LevelDraft::new("Premium").with_subscription_ref("prod_premium"),
//! ])
//! .unwrap();
//!
//! // Validate an assignment change against it
//! let change = AssignmentChange::new("premium").with_revert_level("basic");
//! assert!(change.validate(&catalog).is_ok());
//! ```

pub mod assignment;
pub mod catalog;
pub mod error;
pub mod slug;

// Re-export main types
pub use assignment::{
    start_of_day, AssignmentChange, LevelAssignment, REASON_STALE_REFERENCE, REASON_TIME_ELAPSED,
};
pub use catalog::{Level, LevelCatalog, LevelDraft};
pub use error::{LevelError, LevelResult};
pub use slug::{is_reserved, make_slug, UNASSIGNED};
