//! # Warden Events
//!
//! This crate provides the typed in-process event bus for the Warden
//! platform, carrying level-transition signals between the level service,
//! the policy modules, and any embedding application.
//!
//! ## Overview
//!
//! The warden-events crate handles:
//! - **Event types**: a closed, strongly-typed payload enum (catalog
//!   replaced, tenant assignment written, assignment expired, module toggled)
//! - **Dispatch**: sequential, registration-order delivery with per-handler
//!   failure capture
//! - **Subscriptions**: handlers state their interests explicitly; there is
//!   no topic string matching
//!
//! Dispatch is deliberately synchronous: level-transition consequences
//! (plugin swaps, theme gating) must complete before the operation that
//! caused them returns, and their failures must be attributable to it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use warden_events::{Event, EventBus, EventHandler, EventKind, HandlerError};
//!
//! struct AuditLog;
//!
//! #[async_trait]
//! impl EventHandler for AuditLog {
//!     fn name(&self) -> &str {
//!         "audit_log"
//!     }
//!
//!     fn interests(&self) -> &'static [EventKind] {
//!         EventKind::all()
//!     }
//!
//!     async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
//!         println!("{} {}", event.timestamp, event.kind());
//!         Ok(())
//!     }
//! }
//!
//! async fn wire(bus: &EventBus) {
//!     bus.register(Arc::new(AuditLog)).await;
//! }
//! ```

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{EventBus, EventHandler, HandlerError, HandlerFailure};
pub use types::{Event, EventKind, EventPayload};
