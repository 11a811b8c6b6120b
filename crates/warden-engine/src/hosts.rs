//! Host collaborator traits
//!
//! Plugin activation and theme gating happen inside the hosting platform,
//! not in this crate. These traits are the narrow seams the policy modules
//! drive; the `Memory*` implementations back tests and single-process
//! embedding.
//!
//! The trait methods are synchronous on purpose: [`TenantScope`] restores
//! the previous context from `Drop`, which cannot await.

use crate::error::EngineResult;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use warden_store::TenantId;

/// Plugin management surface of the hosting platform.
///
/// The host tracks a "current tenant" context; `active_plugins`,
/// `activate`, and `deactivate` all act on that context. Callers switch
/// context with [`TenantScope`] rather than calling `switch_to` directly.
pub trait PluginHost: Send + Sync {
    /// The tenant the host is currently operating as.
    fn current_tenant(&self) -> TenantId;

    /// Switch the host context to another tenant.
    fn switch_to(&self, tenant: TenantId);

    /// Plugins active for the current context.
    fn active_plugins(&self) -> EngineResult<Vec<String>>;

    /// Activate plugins in the current context. Already-active entries are
    /// no-ops.
    fn activate(&self, plugins: &[String]) -> EngineResult<()>;

    /// Deactivate plugins in the current context. Already-inactive entries
    /// are no-ops.
    fn deactivate(&self, plugins: &[String]) -> EngineResult<()>;
}

/// Theme gating surface of the hosting platform.
pub trait ThemeHost: Send + Sync {
    /// Replace the set of themes a tenant is allowed to see.
    fn set_allowed(&self, tenant: TenantId, themes: BTreeSet<String>) -> EngineResult<()>;
}

/// Scoped tenant context over a [`PluginHost`].
///
/// Entering switches the host to the target tenant; the previous tenant is
/// restored when the guard drops, on every exit path. Bind the guard to a
/// named variable (`let _scope = ...`); binding to `_` drops it
/// immediately.
pub struct TenantScope<'a> {
    host: &'a dyn PluginHost,
    previous: TenantId,
}

impl<'a> TenantScope<'a> {
    /// Switch the host to `tenant`, remembering the current context.
    pub fn enter(host: &'a dyn PluginHost, tenant: TenantId) -> Self {
        let previous = host.current_tenant();
        host.switch_to(tenant);
        Self { host, previous }
    }
}

impl Drop for TenantScope<'_> {
    fn drop(&mut self) {
        self.host.switch_to(self.previous);
    }
}

impl std::fmt::Debug for TenantScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantScope")
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct PluginHostState {
    current: TenantId,
    active: HashMap<TenantId, BTreeSet<String>>,
}

/// In-memory plugin host.
#[derive(Debug)]
pub struct MemoryPluginHost {
    state: RwLock<PluginHostState>,
}

impl MemoryPluginHost {
    /// Create a host whose initial context is `control_tenant`.
    pub fn new(control_tenant: TenantId) -> Self {
        Self {
            state: RwLock::new(PluginHostState {
                current: control_tenant,
                active: HashMap::new(),
            }),
        }
    }

    /// Seed the active plugin set for a tenant, regardless of context.
    pub fn set_active(&self, tenant: TenantId, plugins: &[&str]) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .active
            .insert(tenant, plugins.iter().map(|p| p.to_string()).collect());
    }

    /// The active plugin set for a tenant, regardless of context. Sorted.
    pub fn active_for(&self, tenant: TenantId) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .active
            .get(&tenant)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl PluginHost for MemoryPluginHost {
    fn current_tenant(&self) -> TenantId {
        self.state.read().unwrap_or_else(|e| e.into_inner()).current
    }

    fn switch_to(&self, tenant: TenantId) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).current = tenant;
    }

    fn active_plugins(&self) -> EngineResult<Vec<String>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .active
            .get(&state.current)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn activate(&self, plugins: &[String]) -> EngineResult<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let current = state.current;
        let active = state.active.entry(current).or_default();
        active.extend(plugins.iter().cloned());
        Ok(())
    }

    fn deactivate(&self, plugins: &[String]) -> EngineResult<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let current = state.current;
        if let Some(active) = state.active.get_mut(&current) {
            for plugin in plugins {
                active.remove(plugin);
            }
        }
        Ok(())
    }
}

/// In-memory theme host. Records the last allowed set pushed per tenant.
#[derive(Debug, Default)]
pub struct MemoryThemeHost {
    allowed: RwLock<HashMap<TenantId, BTreeSet<String>>>,
}

impl MemoryThemeHost {
    /// Create a host with no recorded sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last allowed set pushed for a tenant.
    pub fn allowed_for(&self, tenant: TenantId) -> BTreeSet<String> {
        self.allowed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tenant)
            .cloned()
            .unwrap_or_default()
    }
}

impl ThemeHost for MemoryThemeHost {
    fn set_allowed(&self, tenant: TenantId, themes: BTreeSet<String>) -> EngineResult<()> {
        self.allowed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tenant, themes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_memory_plugin_host_context() {
        let host = MemoryPluginHost::new(TenantId(1));
        assert_eq!(host.current_tenant(), TenantId(1));

        host.switch_to(TenantId(9));
        assert_eq!(host.current_tenant(), TenantId(9));
    }

    #[test]
    fn test_activate_and_deactivate_follow_context() {
        let host = MemoryPluginHost::new(TenantId(1));
        host.switch_to(TenantId(5));
        host.activate(&["a".to_string(), "b".to_string()]).unwrap();
        host.deactivate(&["a".to_string(), "missing".to_string()])
            .unwrap();

        assert_eq!(host.active_for(TenantId(5)), ["b"]);
        assert!(host.active_for(TenantId(1)).is_empty());
        assert_eq!(host.active_plugins().unwrap(), ["b"]);
    }

    #[test]
    fn test_scope_restores_on_drop() {
        let host = MemoryPluginHost::new(TenantId(1));
        {
            let _scope = TenantScope::enter(&host, TenantId(42));
            assert_eq!(host.current_tenant(), TenantId(42));
        }
        assert_eq!(host.current_tenant(), TenantId(1));
    }

    #[test]
    fn test_scope_restores_on_early_return() {
        fn failing(host: &dyn PluginHost) -> EngineResult<()> {
            let _scope = TenantScope::enter(host, TenantId(42));
            Err(EngineError::Host("refused".to_string()))
        }

        let host = MemoryPluginHost::new(TenantId(1));
        assert!(failing(&host).is_err());
        assert_eq!(host.current_tenant(), TenantId(1));
    }

    #[test]
    fn test_nested_scopes_unwind_in_order() {
        let host = MemoryPluginHost::new(TenantId(1));
        {
            let _outer = TenantScope::enter(&host, TenantId(2));
            {
                let _inner = TenantScope::enter(&host, TenantId(3));
                assert_eq!(host.current_tenant(), TenantId(3));
            }
            assert_eq!(host.current_tenant(), TenantId(2));
        }
        assert_eq!(host.current_tenant(), TenantId(1));
    }

    #[test]
    fn test_memory_theme_host_records_last_set() {
        let host = MemoryThemeHost::new();
        host.set_allowed(TenantId(3), ["dark".to_string()].into())
            .unwrap();
        host.set_allowed(
            TenantId(3),
            ["light".to_string(), "dark".to_string()].into(),
        )
        .unwrap();

        let allowed = host.allowed_for(TenantId(3));
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains("light"));
        assert!(host.allowed_for(TenantId(4)).is_empty());
    }
}
