//! Level service
//!
//! `LevelService` owns the two records everything else hangs off: the
//! global level catalog and the per-tenant assignment. Every mutation goes
//! through it so the matching event always fires, and every assignment read
//! goes through it so expiry and stale references are enforced lazily,
//! without a background scheduler.

use crate::error::EngineResult;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_events::{Event, EventBus, EventPayload, HandlerFailure};
use warden_levels::{
    AssignmentChange, LevelAssignment, LevelCatalog, LevelDraft, REASON_STALE_REFERENCE,
    REASON_TIME_ELAPSED, UNASSIGNED,
};
use warden_store::{Scope, SettingsStore, TenantId};

/// Global storage key for the level catalog.
pub const LEVELS_KEY: &str = "levels";

/// Per-tenant storage key for the assignment record.
pub const LEVEL_DETAILS_KEY: &str = "level_details";

/// Result of a catalog replacement.
#[derive(Debug, Clone)]
pub struct CatalogUpdate {
    /// The catalog as persisted
    pub catalog: LevelCatalog,

    /// Non-fatal subscriber failures collected while reconciling
    pub warnings: Vec<HandlerFailure>,
}

/// Result of an assignment update.
#[derive(Debug, Clone)]
pub struct AssignmentUpdate {
    /// The record as persisted
    pub assignment: LevelAssignment,

    /// Non-fatal subscriber failures collected while applying consequences
    pub warnings: Vec<HandlerFailure>,
}

/// Catalog and assignment lifecycle, with event emission.
pub struct LevelService {
    store: Arc<dyn SettingsStore>,
    bus: Arc<EventBus>,
}

impl std::fmt::Debug for LevelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelService").finish_non_exhaustive()
    }
}

impl LevelService {
    /// Create a service over a store and a bus.
    pub fn new(store: Arc<dyn SettingsStore>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// The current catalog.
    ///
    /// Falls back to the built-in defaults when nothing is stored, and also
    /// when the stored catalog is empty (an empty edit persists, but reads
    /// see the defaults again). Never fails on an empty store. Callers that
    /// need the synthetic zero level compose with
    /// [`LevelCatalog::with_zero_level`].
    pub async fn catalog(&self) -> EngineResult<LevelCatalog> {
        match self.store.get(Scope::Global, LEVELS_KEY).await? {
            Some(value) => {
                let catalog: LevelCatalog = serde_json::from_value(value)?;
                if catalog.is_empty() {
                    Ok(LevelCatalog::defaults())
                } else {
                    Ok(catalog)
                }
            }
            None => Ok(LevelCatalog::defaults()),
        }
    }

    /// Replace the whole catalog from submitted drafts.
    ///
    /// Validates the drafts, persists the rebuilt catalog, and emits
    /// `level_catalog_updated` carrying both the new and the previous
    /// catalog. Subscriber failures do not fail the edit; they come back as
    /// warnings.
    ///
    /// Removing levels still referenced by tenants is allowed; affected
    /// tenants are healed on their next [`LevelService::assignment`] read.
    pub async fn replace_catalog(&self, drafts: &[LevelDraft]) -> EngineResult<CatalogUpdate> {
        let old_catalog = self.catalog().await?;
        let catalog = LevelCatalog::from_drafts(drafts)?;

        self.store
            .set(Scope::Global, LEVELS_KEY, serde_json::to_value(&catalog)?)
            .await?;
        debug!(levels = catalog.len(), "level catalog replaced");

        let warnings = self
            .bus
            .publish(Event::new(EventPayload::LevelCatalogUpdated {
                new_catalog: catalog.clone(),
                old_catalog,
            }))
            .await;

        Ok(CatalogUpdate { catalog, warnings })
    }

    /// A tenant's assignment, with lazy enforcement.
    ///
    /// This is a read with side effects, in two steps:
    ///
    /// 1. **Expiry**: a scheduled expiry whose date lies before today
    ///    (midnight UTC) reverts the record, persists it, and emits
    ///    `site_level_expired` followed by `site_level_updated` with reason
    ///    `TIME_ELAPSED`.
    /// 2. **Stale repair**: a level slug no longer in the catalog falls
    ///    back to the revert level (or `unassigned` when that is gone too),
    ///    recording the dangling slug as `previous_level`, then persists
    ///    and emits `site_level_updated` with reason `STALE_REFERENCE`.
    ///
    /// Tenants never read before get the default all-`unassigned` record.
    pub async fn assignment(&self, tenant: TenantId) -> EngineResult<LevelAssignment> {
        let mut assignment = self.load_assignment(tenant).await?;

        if assignment.is_expired_at(Utc::now()) {
            assignment.expire();
            self.persist_assignment(tenant, &assignment).await?;
            debug!(%tenant, level = %assignment.level, "assignment expired, reverted");

            self.bus
                .publish(Event::new(EventPayload::SiteLevelExpired {
                    tenant,
                    assignment: assignment.clone(),
                }))
                .await;
            self.bus
                .publish(Event::new(EventPayload::SiteLevelUpdated {
                    tenant,
                    assignment: assignment.clone(),
                    reason: Some(REASON_TIME_ELAPSED.to_string()),
                }))
                .await;
        }

        let catalog = self.catalog().await?;
        if !catalog.is_known(&assignment.level) {
            let fallback = if catalog.is_known(&assignment.revert_level) {
                assignment.revert_level.clone()
            } else {
                UNASSIGNED.to_string()
            };
            let dangling = std::mem::replace(&mut assignment.level, fallback);
            assignment.previous_level = dangling.clone();
            if !catalog.is_known(&assignment.revert_level) {
                assignment.revert_level = UNASSIGNED.to_string();
            }

            self.persist_assignment(tenant, &assignment).await?;
            warn!(%tenant, stale = %dangling, level = %assignment.level, "healed stale level reference");

            self.bus
                .publish(Event::new(EventPayload::SiteLevelUpdated {
                    tenant,
                    assignment: assignment.clone(),
                    reason: Some(REASON_STALE_REFERENCE.to_string()),
                }))
                .await;
        }

        Ok(assignment)
    }

    /// Apply an admin change to a tenant's assignment.
    ///
    /// Validates the change against the current catalog, carries the
    /// pre-update level into `previous_level`, persists, and emits
    /// `site_level_updated` unconditionally, also when the record did not
    /// change, so subscribers can re-apply consequences.
    pub async fn update_assignment(
        &self,
        tenant: TenantId,
        change: &AssignmentChange,
        reason: Option<String>,
    ) -> EngineResult<AssignmentUpdate> {
        let catalog = self.catalog().await?;
        change.validate(&catalog)?;

        // Enforced read: expiry and stale repair run before the change
        // lands, so previous_level reflects what the tenant actually had.
        let current = self.assignment(tenant).await?;
        let assignment = change.apply_to(&current);

        self.persist_assignment(tenant, &assignment).await?;
        debug!(%tenant, level = %assignment.level, previous = %assignment.previous_level, "assignment updated");

        let warnings = self
            .bus
            .publish(Event::new(EventPayload::SiteLevelUpdated {
                tenant,
                assignment: assignment.clone(),
                reason,
            }))
            .await;

        Ok(AssignmentUpdate {
            assignment,
            warnings,
        })
    }

    async fn load_assignment(&self, tenant: TenantId) -> EngineResult<LevelAssignment> {
        match self.store.get(Scope::Tenant(tenant), LEVEL_DETAILS_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(LevelAssignment::default()),
        }
    }

    async fn persist_assignment(
        &self,
        tenant: TenantId,
        assignment: &LevelAssignment,
    ) -> EngineResult<()> {
        self.store
            .set(
                Scope::Tenant(tenant),
                LEVEL_DETAILS_KEY,
                serde_json::to_value(assignment)?,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use warden_events::{EventHandler, EventKind, HandlerError};
    use warden_levels::LevelError;
    use warden_store::MemoryStore;

    /// Records every level event as "kind" or "kind:reason".
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                log: Mutex::new(Vec::new()),
            })
        }

        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn interests(&self) -> &'static [EventKind] {
            &[
                EventKind::LevelCatalogUpdated,
                EventKind::SiteLevelUpdated,
                EventKind::SiteLevelExpired,
            ]
        }

        async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
            let entry = match &event.payload {
                EventPayload::SiteLevelUpdated {
                    reason: Some(reason),
                    ..
                } => format!("{}:{}", event.kind(), reason),
                _ => event.kind().to_string(),
            };
            self.log.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct Exploder;

    #[async_trait]
    impl EventHandler for Exploder {
        fn name(&self) -> &str {
            "exploder"
        }

        fn interests(&self) -> &'static [EventKind] {
            &[EventKind::LevelCatalogUpdated]
        }

        async fn handle(&self, _event: &Event) -> Result<(), HandlerError> {
            Err("boom".into())
        }
    }

    async fn service() -> (LevelService, MemoryStore, Arc<Recorder>) {
        let store = MemoryStore::new();
        let bus = Arc::new(EventBus::new());
        let recorder = Recorder::new();
        bus.register(recorder.clone()).await;
        let service = LevelService::new(Arc::new(store.clone()), bus);
        (service, store, recorder)
    }

    fn yesterday() -> i64 {
        warden_levels::start_of_day(Utc::now()) - 86_400
    }

    fn tomorrow() -> i64 {
        warden_levels::start_of_day(Utc::now()) + 86_400
    }

    async fn seed_assignment(store: &MemoryStore, tenant: TenantId, assignment: &LevelAssignment) {
        store
            .set(
                Scope::Tenant(tenant),
                LEVEL_DETAILS_KEY,
                serde_json::to_value(assignment).unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_catalog_defaults_on_empty_store() {
        let (service, _store, _recorder) = service().await;
        let catalog = service.catalog().await.unwrap();
        assert_eq!(catalog.slugs().collect::<Vec<_>>(), ["basic", "premium"]);
    }

    #[tokio::test]
    async fn test_empty_catalog_reads_back_as_defaults() {
        let (service, store, _recorder) = service().await;

        let update = service.replace_catalog(&[]).await.unwrap();
        assert!(update.catalog.is_empty());

        // The empty edit is persisted, but reads see the defaults again
        let stored = store.get(Scope::Global, LEVELS_KEY).await.unwrap();
        assert_eq!(stored, Some(serde_json::json!([])));
        assert_eq!(service.catalog().await.unwrap(), LevelCatalog::defaults());
    }

    #[tokio::test]
    async fn test_replace_catalog_round_trip() {
        let (service, _store, recorder) = service().await;

        let update = service
            .replace_catalog(&[
                LevelDraft::new("Starter"),
                LevelDraft::new("Pro").with_subscription_ref("prod_pro"),
            ])
            .await
            .unwrap();

        assert!(update.warnings.is_empty());
        assert_eq!(update.catalog.slugs().collect::<Vec<_>>(), ["starter", "pro"]);

        let stored = service.catalog().await.unwrap();
        assert_eq!(stored, update.catalog);
        assert_eq!(recorder.entries(), ["level_catalog_updated"]);
    }

    #[tokio::test]
    async fn test_replace_catalog_rejects_bad_drafts() {
        let (service, store, recorder) = service().await;

        let err = service
            .replace_catalog(&[LevelDraft::new("Basic"), LevelDraft::new("  ")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Level(LevelError::BlankName { position: 1 })
        ));

        // Nothing persisted, nothing emitted
        assert!(store.get(Scope::Global, LEVELS_KEY).await.unwrap().is_none());
        assert!(recorder.entries().is_empty());
    }

    #[tokio::test]
    async fn test_replace_catalog_surfaces_subscriber_warnings() {
        let store = MemoryStore::new();
        let bus = Arc::new(EventBus::new());
        bus.register(Arc::new(Exploder)).await;
        let service = LevelService::new(Arc::new(store), bus);

        let update = service
            .replace_catalog(&[LevelDraft::new("Basic")])
            .await
            .unwrap();

        assert_eq!(update.warnings.len(), 1);
        assert_eq!(update.warnings[0].handler, "exploder");
        assert_eq!(update.catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_assignment_default_for_unknown_tenant() {
        let (service, store, recorder) = service().await;

        let assignment = service.assignment(TenantId(12)).await.unwrap();
        assert_eq!(assignment, LevelAssignment::default());

        // A plain default read persists nothing and emits nothing
        assert!(store
            .get(Scope::Tenant(TenantId(12)), LEVEL_DETAILS_KEY)
            .await
            .unwrap()
            .is_none());
        assert!(recorder.entries().is_empty());
    }

    #[tokio::test]
    async fn test_assignment_expires_on_read() {
        let (service, store, recorder) = service().await;
        let tenant = TenantId(3);
        seed_assignment(
            &store,
            tenant,
            &LevelAssignment {
                level: "premium".to_string(),
                previous_level: UNASSIGNED.to_string(),
                revert_level: "basic".to_string(),
                can_expire: true,
                expiry_date: Some(yesterday()),
            },
        )
        .await;

        let assignment = service.assignment(tenant).await.unwrap();
        assert_eq!(assignment.level, "basic");
        assert_eq!(assignment.previous_level, "premium");
        assert!(!assignment.can_expire);
        assert!(assignment.expiry_date.is_none());

        // Reverted record was persisted
        let stored = service.assignment(tenant).await.unwrap();
        assert_eq!(stored, assignment);

        // Exactly one expired + one updated, in that order, on the first read
        assert_eq!(
            recorder.entries(),
            ["site_level_expired", "site_level_updated:TIME_ELAPSED"]
        );
    }

    #[tokio::test]
    async fn test_assignment_future_expiry_untouched() {
        let (service, store, recorder) = service().await;
        let tenant = TenantId(3);
        let seeded = LevelAssignment {
            level: "premium".to_string(),
            previous_level: UNASSIGNED.to_string(),
            revert_level: "basic".to_string(),
            can_expire: true,
            expiry_date: Some(tomorrow()),
        };
        seed_assignment(&store, tenant, &seeded).await;

        let assignment = service.assignment(tenant).await.unwrap();
        assert_eq!(assignment, seeded);
        assert!(recorder.entries().is_empty());
    }

    #[tokio::test]
    async fn test_assignment_heals_stale_reference() {
        let (service, store, recorder) = service().await;
        let tenant = TenantId(9);
        // "gold" is not in the default catalog
        seed_assignment(
            &store,
            tenant,
            &LevelAssignment {
                level: "gold".to_string(),
                previous_level: UNASSIGNED.to_string(),
                revert_level: "basic".to_string(),
                can_expire: false,
                expiry_date: None,
            },
        )
        .await;

        let assignment = service.assignment(tenant).await.unwrap();
        assert_eq!(assignment.level, "basic");
        assert_eq!(assignment.previous_level, "gold");
        assert_eq!(
            recorder.entries(),
            ["site_level_updated:STALE_REFERENCE"]
        );

        // Healed once; the next read is quiet
        let again = service.assignment(tenant).await.unwrap();
        assert_eq!(again, assignment);
        assert_eq!(recorder.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_assignment_stale_revert_falls_back_to_unassigned() {
        let (service, store, _recorder) = service().await;
        let tenant = TenantId(9);
        seed_assignment(
            &store,
            tenant,
            &LevelAssignment {
                level: "gold".to_string(),
                previous_level: UNASSIGNED.to_string(),
                revert_level: "silver".to_string(),
                can_expire: false,
                expiry_date: None,
            },
        )
        .await;

        let assignment = service.assignment(tenant).await.unwrap();
        assert_eq!(assignment.level, UNASSIGNED);
        assert_eq!(assignment.previous_level, "gold");
        assert_eq!(assignment.revert_level, UNASSIGNED);
    }

    #[tokio::test]
    async fn test_update_assignment_persists_and_emits() {
        let (service, _store, recorder) = service().await;
        let tenant = TenantId(5);

        let update = service
            .update_assignment(
                tenant,
                &AssignmentChange::new("premium").with_revert_level("basic"),
                Some("SUBSCRIPTION_STARTED".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(update.assignment.level, "premium");
        assert_eq!(update.assignment.previous_level, UNASSIGNED);
        assert_eq!(update.assignment.revert_level, "basic");
        assert!(update.warnings.is_empty());
        assert_eq!(
            recorder.entries(),
            ["site_level_updated:SUBSCRIPTION_STARTED"]
        );

        let stored = service.assignment(tenant).await.unwrap();
        assert_eq!(stored, update.assignment);
    }

    #[tokio::test]
    async fn test_update_assignment_always_emits() {
        let (service, _store, recorder) = service().await;
        let tenant = TenantId(5);
        let change = AssignmentChange::new("basic");

        service.update_assignment(tenant, &change, None).await.unwrap();
        service.update_assignment(tenant, &change, None).await.unwrap();

        assert_eq!(
            recorder.entries(),
            ["site_level_updated", "site_level_updated"]
        );
    }

    #[tokio::test]
    async fn test_update_assignment_captures_previous_level() {
        let (service, _store, _recorder) = service().await;
        let tenant = TenantId(5);

        service
            .update_assignment(tenant, &AssignmentChange::new("basic"), None)
            .await
            .unwrap();
        let update = service
            .update_assignment(tenant, &AssignmentChange::new("premium"), None)
            .await
            .unwrap();

        assert_eq!(update.assignment.previous_level, "basic");
    }

    #[tokio::test]
    async fn test_update_assignment_validates_slugs_and_expiry() {
        let (service, _store, recorder) = service().await;
        let tenant = TenantId(5);

        let unknown = service
            .update_assignment(tenant, &AssignmentChange::new("gold"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            unknown,
            crate::error::EngineError::Level(LevelError::UnknownLevel { .. })
        ));

        let mut missing_date = AssignmentChange::new("premium");
        missing_date.can_expire = true;
        let err = service
            .update_assignment(tenant, &missing_date, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Level(LevelError::MissingExpiryDate)
        ));

        assert!(recorder.entries().is_empty());
    }

    #[tokio::test]
    async fn test_update_after_catalog_shrink_heals_first() {
        let (service, store, recorder) = service().await;
        let tenant = TenantId(2);

        // Tenant sits on a level that then disappears from the catalog
        seed_assignment(
            &store,
            tenant,
            &LevelAssignment {
                level: "premium".to_string(),
                previous_level: UNASSIGNED.to_string(),
                revert_level: UNASSIGNED.to_string(),
                can_expire: false,
                expiry_date: None,
            },
        )
        .await;
        service
            .replace_catalog(&[LevelDraft::new("Basic")])
            .await
            .unwrap();

        let update = service
            .update_assignment(tenant, &AssignmentChange::new("basic"), None)
            .await
            .unwrap();

        // The stale heal ran inside the enforced read, so previous_level is
        // the healed value, not the dangling slug
        assert_eq!(update.assignment.level, "basic");
        assert_eq!(update.assignment.previous_level, UNASSIGNED);
        assert_eq!(
            recorder.entries(),
            [
                "level_catalog_updated",
                "site_level_updated:STALE_REFERENCE",
                "site_level_updated"
            ]
        );
    }
}
