//! Engine error types

use thiserror::Error;
use warden_levels::LevelError;
use warden_store::StoreError;

/// Errors produced by the level service, policy modules, and registry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Level or assignment validation failed
    #[error(transparent)]
    Level(#[from] LevelError),

    /// The settings store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored record did not match its expected shape
    #[error("Malformed stored record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No policy module is registered under the given slug
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// A host collaborator refused an operation
    #[error("Host operation failed: {0}")]
    Host(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
