//! Event subscription for policy modules
//!
//! `PolicySubscriber` adapts one [`PolicyModule`] to the bus: catalog
//! events drive reconciliation, assignment events drive consequences. One
//! subscriber per module, registered explicitly in a fixed order; nothing
//! self-registers.

use crate::policy::PolicyModule;
use async_trait::async_trait;
use std::sync::Arc;
use warden_events::{Event, EventBus, EventHandler, EventKind, EventPayload, HandlerError};

/// Bus adapter around a policy module.
pub struct PolicySubscriber {
    module: Arc<dyn PolicyModule>,
}

impl PolicySubscriber {
    /// Wrap a module for registration.
    pub fn new(module: Arc<dyn PolicyModule>) -> Self {
        Self { module }
    }
}

impl std::fmt::Debug for PolicySubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySubscriber")
            .field("module", &self.module.slug())
            .finish()
    }
}

#[async_trait]
impl EventHandler for PolicySubscriber {
    fn name(&self) -> &str {
        self.module.slug()
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::LevelCatalogUpdated,
            EventKind::SiteLevelUpdated,
            EventKind::SiteLevelExpired,
        ]
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        match &event.payload {
            EventPayload::LevelCatalogUpdated {
                new_catalog,
                old_catalog,
            } => {
                self.module.reconcile(new_catalog, old_catalog).await?;
            }
            EventPayload::SiteLevelUpdated {
                tenant, assignment, ..
            } => {
                self.module.apply_level_change(*tenant, assignment).await?;
            }
            // The expired event always travels with an update carrying the
            // same record; consequences run once, on the update.
            EventPayload::SiteLevelExpired { .. } => {}
            EventPayload::ModuleToggled { .. } => {}
        }
        Ok(())
    }
}

/// Register one subscriber per module, in slice order.
///
/// Order matters: subscribers run in registration order, so the caller
/// controls which module's consequences land first.
pub async fn register_policies(bus: &EventBus, modules: &[Arc<dyn PolicyModule>]) {
    for module in modules {
        bus.register(Arc::new(PolicySubscriber::new(Arc::clone(module))))
            .await;
    }
}
