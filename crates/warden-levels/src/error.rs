//! Level domain error types

use thiserror::Error;

/// Errors raised by catalog and assignment validation.
#[derive(Debug, Error)]
pub enum LevelError {
    /// A catalog draft had an empty or whitespace-only name
    #[error("Level draft at position {position} has a blank name")]
    BlankName { position: usize },

    /// Two catalog drafts carried the same name
    #[error("Duplicate level name: {name}")]
    DuplicateName { name: String },

    /// A hand-built catalog repeated a slug
    #[error("Duplicate level slug: {slug}")]
    DuplicateSlug { slug: String },

    /// A hand-built catalog used the reserved zero-level slug
    #[error("Slug '{slug}' is reserved and cannot be stored")]
    ReservedSlug { slug: String },

    /// An assignment referenced a level that is not in the catalog
    #[error("Unknown level: {slug}")]
    UnknownLevel { slug: String },

    /// An assignment referenced a revert level that is not in the catalog
    #[error("Unknown revert level: {slug}")]
    UnknownRevertLevel { slug: String },

    /// An assignment was marked expirable without an expiry date
    #[error("An assignment that can expire requires an expiry date")]
    MissingExpiryDate,
}

/// Result type for level domain operations.
pub type LevelResult<T> = Result<T, LevelError>;
