//! Event bus implementation
//!
//! The bus is in-process and synchronous: `publish` awaits every interested
//! handler, one at a time, in the order they were registered. A failing
//! handler never stops dispatch; failures are logged, collected, and handed
//! back to the publisher, which decides whether to surface them.

use crate::types::{Event, EventKind};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Error type handlers may return.
///
/// Boxed so subscribers from any crate can propagate their own error types
/// through the bus without coupling it to them.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used to attribute failures in logs and warning lists.
    fn name(&self) -> &str;

    /// The event kinds this handler subscribes to.
    fn interests(&self) -> &'static [EventKind];

    /// Handle an event.
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

/// A handler failure captured during dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerFailure {
    /// Name of the handler that failed
    pub handler: String,

    /// Kind of the event being handled
    pub event: EventKind,

    /// Rendered error message
    pub message: String,
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed on {}: {}", self.handler, self.event, self.message)
    }
}

/// In-process event bus with registration-order dispatch.
pub struct EventBus {
    /// Registered handlers, in registration order
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    ///
    /// Handlers run in registration order; register consequence-critical
    /// subscribers before observational ones.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Publish an event to every interested handler.
    ///
    /// Handlers are awaited sequentially in registration order. Errors are
    /// logged and collected; the returned list is empty when every handler
    /// succeeded.
    pub async fn publish(&self, event: Event) -> Vec<HandlerFailure> {
        let kind = event.kind();

        // Snapshot outside the dispatch loop so a handler can publish
        // follow-up events without holding the lock.
        let handlers: Vec<Arc<dyn EventHandler>> =
            self.handlers.read().await.iter().cloned().collect();

        debug!(event = %kind, handlers = handlers.len(), "publishing event");

        let mut failures = Vec::new();
        for handler in handlers {
            if !handler.interests().contains(&kind) {
                continue;
            }
            if let Err(err) = handler.handle(&event).await {
                warn!(
                    handler = handler.name(),
                    event = %kind,
                    error = %err,
                    "event handler failed"
                );
                failures.push(HandlerFailure {
                    handler: handler.name().to_string(),
                    event: kind,
                    message: err.to_string(),
                });
            }
        }

        failures
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
