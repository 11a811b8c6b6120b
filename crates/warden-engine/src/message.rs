//! Level messaging policy
//!
//! Per level, one front-end message plus placement flags. Nothing happens
//! on a level transition; the renderer asks for the tenant's current rule
//! at content-render time, so the message always reflects the live level.

use crate::error::EngineResult;
use crate::policy::{PolicyContext, PolicyModule};
use crate::service::LevelService;
use crate::settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use warden_levels::LevelCatalog;
use warden_store::{SettingsStore, TenantId};

/// Per-level message and placement flags.
///
/// A rule with all flags off (or an empty message) renders nothing; that
/// is how a level's message is hidden.
///
/// # Examples
///
/// ```
/// use warden_engine::MessageRule;
///
/// let rule = MessageRule::new("Upgrade for more storage.").with_above_content();
/// assert_eq!(
///     rule.wrap("Hello."),
///     "Upgrade for more storage.\n\nHello."
/// );
/// assert!(rule.shortcode().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRule {
    /// Message text; empty renders nothing
    #[serde(default)]
    pub message: String,

    /// Show the message before the content body
    #[serde(default)]
    pub above_content: bool,

    /// Show the message after the content body
    #[serde(default)]
    pub below_content: bool,

    /// Also show on listing pages, not just single items
    #[serde(default)]
    pub in_archive: bool,

    /// Expose the message through the shortcode helper
    #[serde(default)]
    pub in_shortcode: bool,
}

impl MessageRule {
    /// Create a rule with a message and every placement off.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Show above the content body.
    pub fn with_above_content(mut self) -> Self {
        self.above_content = true;
        self
    }

    /// Show below the content body.
    pub fn with_below_content(mut self) -> Self {
        self.below_content = true;
        self
    }

    /// Also show on listing pages.
    pub fn with_archive(mut self) -> Self {
        self.in_archive = true;
        self
    }

    /// Expose through the shortcode helper.
    pub fn with_shortcode(mut self) -> Self {
        self.in_shortcode = true;
        self
    }

    /// Wrap a content body according to the placement flags.
    ///
    /// Prepends and/or appends the message, separated by a blank line.
    /// Returns the content unchanged when the message is empty or both
    /// placement flags are off.
    pub fn wrap(&self, content: &str) -> String {
        if self.message.is_empty() || !(self.above_content || self.below_content) {
            return content.to_string();
        }

        let mut out = String::with_capacity(content.len() + 2 * (self.message.len() + 2));
        if self.above_content {
            out.push_str(&self.message);
            out.push_str("\n\n");
        }
        out.push_str(content);
        if self.below_content {
            out.push_str("\n\n");
            out.push_str(&self.message);
        }
        out
    }

    /// The message for shortcode rendering, when enabled and non-empty.
    pub fn shortcode(&self) -> Option<&str> {
        (self.in_shortcode && !self.message.is_empty()).then_some(self.message.as_str())
    }
}

/// Level messaging policy module.
pub struct LevelMessage {
    store: Arc<dyn SettingsStore>,
    levels: Arc<LevelService>,
}

impl LevelMessage {
    /// Module slug; also the settings key prefix.
    pub const SLUG: &'static str = "level_message";

    /// Build from a policy context.
    pub fn new(ctx: &PolicyContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            levels: Arc::clone(&ctx.levels),
        }
    }

    /// Resolved per-level rules for a tenant.
    pub async fn settings(
        &self,
        tenant: Option<TenantId>,
    ) -> EngineResult<BTreeMap<String, MessageRule>> {
        let stored = settings::load::<MessageRule>(self.store.as_ref(), Self::SLUG, tenant).await?;
        let catalog = self.levels.catalog().await?;
        Ok(stored.resolved(&catalog))
    }

    /// The message rule for the tenant's current level.
    ///
    /// Resolved at render time on purpose; a transition needs no
    /// bookkeeping here.
    pub async fn message_for(&self, tenant: TenantId) -> EngineResult<MessageRule> {
        let assignment = self.levels.assignment(tenant).await?;
        let mut resolved = self.settings(Some(tenant)).await?;
        Ok(resolved.remove(&assignment.level).unwrap_or_default())
    }
}

#[async_trait]
impl PolicyModule for LevelMessage {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    async fn reconcile(
        &self,
        new_catalog: &LevelCatalog,
        _old_catalog: &LevelCatalog,
    ) -> EngineResult<()> {
        let dropped =
            settings::reconcile_global::<MessageRule>(self.store.as_ref(), Self::SLUG, new_catalog)
                .await?;
        if dropped > 0 {
            debug!(module = Self::SLUG, dropped, "dropped orphaned level settings");
        }
        Ok(())
    }

    // Render-time module: the default no-op transition handler applies.
}
