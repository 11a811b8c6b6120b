//! Level catalog
//!
//! The catalog is the network-wide, ordered list of membership levels. Order
//! is significant: it is the order levels were submitted in and the order
//! every surface lists them in. Slugs are unique within a catalog and derived
//! from the level names (see [`crate::slug`]).

use crate::error::{LevelError, LevelResult};
use crate::slug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single membership level.
///
/// # Examples
///
/// ```
/// use warden_levels::Level;
///
/// let level = Level::new("premium", "Premium")
///     .with_description("Full feature access")
///     .with_subscription_ref("prod_premium_monthly");
/// assert_eq!(level.slug, "premium");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Stable key derived from the name; unique within the catalog
    pub slug: String,

    /// Display name
    pub name: String,

    /// Display description (may be empty)
    #[serde(default)]
    pub description: String,

    /// Opaque reference to an external billing product, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_ref: Option<String>,
}

impl Level {
    /// Create a level with an explicit slug.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            subscription_ref: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the external billing reference.
    pub fn with_subscription_ref(mut self, subscription_ref: impl Into<String>) -> Self {
        self.subscription_ref = Some(subscription_ref.into());
        self
    }

    /// The synthetic zero level reported for tenants without an assignment.
    pub fn unassigned() -> Self {
        Level::new(slug::UNASSIGNED, "Unassigned")
            .with_description("Tenants without an assigned level")
    }

    /// Whether this is the synthetic zero level.
    pub fn is_unassigned(&self) -> bool {
        slug::is_reserved(&self.slug)
    }
}

/// Input row for a catalog rebuild.
///
/// Drafts carry no slug; slugs are computed during the rebuild so they stay
/// consistent with the names actually submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDraft {
    /// Display name (required, non-blank)
    pub name: String,

    /// Display description
    #[serde(default)]
    pub description: String,

    /// Opaque reference to an external billing product
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_ref: Option<String>,
}

impl LevelDraft {
    /// Create a draft with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            subscription_ref: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the external billing reference.
    pub fn with_subscription_ref(mut self, subscription_ref: impl Into<String>) -> Self {
        self.subscription_ref = Some(subscription_ref.into());
        self
    }
}

/// Ordered, slug-unique collection of levels.
///
/// Serializes as a plain JSON array, preserving order.
///
/// # Examples
///
/// ```
/// use warden_levels::{LevelCatalog, LevelDraft};
///
/// let catalog = LevelCatalog::from_drafts(&[
///     LevelDraft::new("Basic"),
///     LevelDraft::new("Premium Plus"),
/// ])
/// .unwrap();
///
/// assert_eq!(catalog.slugs().collect::<Vec<_>>(), ["basic", "premium_plus"]);
/// assert!(catalog.is_known("unassigned"));
/// assert!(!catalog.contains("unassigned"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelCatalog {
    levels: Vec<Level>,
}

impl LevelCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    /// The built-in catalog used when nothing has been stored yet.
    pub fn defaults() -> Self {
        Self {
            levels: vec![Level::new("basic", "Basic"), Level::new("premium", "Premium")],
        }
    }

    /// Build a catalog from explicit levels, validating slug integrity.
    ///
    /// # Errors
    ///
    /// Returns an error when a slug repeats or uses the reserved zero-level
    /// slug.
    pub fn from_levels(levels: Vec<Level>) -> LevelResult<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for level in &levels {
            if slug::is_reserved(&level.slug) {
                return Err(LevelError::ReservedSlug {
                    slug: level.slug.clone(),
                });
            }
            if !seen.insert(&level.slug) {
                return Err(LevelError::DuplicateSlug {
                    slug: level.slug.clone(),
                });
            }
        }
        Ok(Self { levels })
    }

    /// Rebuild the catalog from submitted drafts.
    ///
    /// Names are trimmed and must be non-blank and mutually distinct. Slugs
    /// are computed with [`slug::make_slug`]; when two different names
    /// normalize to the same slug (or to the reserved `unassigned`), later
    /// drafts get deterministic numeric suffixes in submission order.
    ///
    /// # Errors
    ///
    /// Returns an error for blank or duplicate names. Slug collisions are
    /// not errors; they are disambiguated.
    pub fn from_drafts(drafts: &[LevelDraft]) -> LevelResult<Self> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        let mut levels = Vec::with_capacity(drafts.len());

        for (position, draft) in drafts.iter().enumerate() {
            let name = draft.name.trim();
            if name.is_empty() {
                return Err(LevelError::BlankName { position });
            }
            if !seen_names.insert(name.to_string()) {
                return Err(LevelError::DuplicateName {
                    name: name.to_string(),
                });
            }

            let base = slug::make_slug(name);
            let chosen = if slug::is_reserved(&base) || taken.contains(&base) {
                slug::disambiguate(&base, &taken)
            } else {
                base
            };
            taken.insert(chosen.clone());

            levels.push(Level {
                slug: chosen,
                name: name.to_string(),
                description: draft.description.trim().to_string(),
                subscription_ref: draft.subscription_ref.clone(),
            });
        }

        Ok(Self { levels })
    }

    /// Look up a level by slug.
    pub fn get(&self, slug: &str) -> Option<&Level> {
        self.levels.iter().find(|level| level.slug == slug)
    }

    /// Whether a slug is stored in the catalog.
    ///
    /// The synthetic `unassigned` level is never stored; see
    /// [`LevelCatalog::is_known`].
    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    /// Whether a slug is valid to assign: stored, or the synthetic zero
    /// level.
    pub fn is_known(&self, candidate: &str) -> bool {
        slug::is_reserved(candidate) || self.contains(candidate)
    }

    /// Position of a slug in catalog order.
    pub fn position(&self, slug: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.slug == slug)
    }

    /// Number of stored levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the catalog stores no levels.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterate over levels in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    /// The stored levels, in order.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Iterate over slugs in catalog order.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(|level| level.slug.as_str())
    }

    /// A copy of the catalog with the synthetic zero level prepended.
    ///
    /// This is the read-time injection used wherever `unassigned` must show
    /// up as a real row (settings editors, gap-filling). The returned
    /// catalog is a view for display and iteration; it is never persisted.
    pub fn with_zero_level(&self) -> LevelCatalog {
        let mut levels = Vec::with_capacity(self.levels.len() + 1);
        levels.push(Level::unassigned());
        levels.extend(self.levels.iter().cloned());
        LevelCatalog { levels }
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_catalog() {
        let catalog = LevelCatalog::defaults();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.slugs().collect::<Vec<_>>(), ["basic", "premium"]);
        assert_eq!(catalog.get("basic").unwrap().name, "Basic");
    }

    #[test]
    fn test_from_drafts_preserves_order() {
        let catalog = LevelCatalog::from_drafts(&[
            LevelDraft::new("Gold"),
            LevelDraft::new("Silver"),
            LevelDraft::new("Bronze"),
        ])
        .unwrap();

        assert_eq!(
            catalog.slugs().collect::<Vec<_>>(),
            ["gold", "silver", "bronze"]
        );
        assert_eq!(catalog.position("silver"), Some(1));
    }

    #[test]
    fn test_from_drafts_trims_and_slugs() {
        let catalog = LevelCatalog::from_drafts(&[
            LevelDraft::new("  Premium Plus  ").with_description(" Everything. ")
        ])
        .unwrap();

        let level = catalog.get("premium_plus").unwrap();
        assert_eq!(level.name, "Premium Plus");
        assert_eq!(level.description, "Everything.");
    }

    #[test]
    fn test_from_drafts_blank_name_rejected() {
        let err = LevelCatalog::from_drafts(&[
            LevelDraft::new("Basic"),
            LevelDraft::new("   "),
        ])
        .unwrap_err();

        assert!(matches!(err, LevelError::BlankName { position: 1 }));
    }

    #[test]
    fn test_from_drafts_duplicate_name_rejected() {
        let err = LevelCatalog::from_drafts(&[
            LevelDraft::new("Basic"),
            LevelDraft::new("Basic"),
        ])
        .unwrap_err();

        assert!(matches!(err, LevelError::DuplicateName { .. }));
    }

    #[test]
    fn test_from_drafts_colliding_slugs_get_suffixes() {
        // Different names, same normalization
        let catalog = LevelCatalog::from_drafts(&[
            LevelDraft::new("My Level"),
            LevelDraft::new("My-Level"),
            LevelDraft::new("my level"),
        ])
        .unwrap();

        assert_eq!(
            catalog.slugs().collect::<Vec<_>>(),
            ["my_level", "my_level_2", "my_level_3"]
        );
    }

    #[test]
    fn test_from_drafts_reserved_slug_disambiguated() {
        let catalog = LevelCatalog::from_drafts(&[LevelDraft::new("Unassigned")]).unwrap();
        assert_eq!(catalog.slugs().collect::<Vec<_>>(), ["unassigned_2"]);
    }

    #[test]
    fn test_from_levels_rejects_duplicates_and_reserved() {
        let dup = LevelCatalog::from_levels(vec![
            Level::new("basic", "Basic"),
            Level::new("basic", "Basic Again"),
        ]);
        assert!(matches!(dup, Err(LevelError::DuplicateSlug { .. })));

        let reserved =
            LevelCatalog::from_levels(vec![Level::new("unassigned", "Sneaky")]);
        assert!(matches!(reserved, Err(LevelError::ReservedSlug { .. })));
    }

    #[test]
    fn test_with_zero_level() {
        let catalog = LevelCatalog::defaults();
        let zeroed = catalog.with_zero_level();

        assert_eq!(zeroed.len(), 3);
        assert_eq!(
            zeroed.slugs().collect::<Vec<_>>(),
            ["unassigned", "basic", "premium"]
        );
        // The base catalog is untouched
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_serde_round_trip_preserves_order() {
        let catalog = LevelCatalog::from_drafts(&[
            LevelDraft::new("Gold").with_subscription_ref("prod_gold"),
            LevelDraft::new("Silver"),
        ])
        .unwrap();

        let json = serde_json::to_string(&catalog).unwrap();
        let back: LevelCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);

        // Transparent representation: a plain array
        assert!(json.starts_with('['));
    }
}
