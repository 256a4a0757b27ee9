//! Error types for mission catalog operations.

use crate::mission::MissionId;
use thiserror::Error;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Operation referenced an id that is not in the catalog
    #[error("Mission not found: {id}")]
    InvalidReference { id: MissionId },

    /// Mission fields failed validation
    #[error("Invalid mission: {0}")]
    InvalidMission(String),

    /// Every mission id up to `u32::MAX` is taken
    #[error("No mission ids left to allocate")]
    IdsExhausted,

    /// Reorder target is past the end of the catalog
    #[error("Index {index} out of range for catalog of {len} missions")]
    IndexOutOfRange { index: usize, len: usize },

    /// Chosen mission file is not below the dogfight missions root
    #[error("Missions must be placed within '{root}' directory")]
    OutsideMissionsRoot { root: String },

    /// Stored document was written by a newer schema
    #[error("Unsupported catalog schema version {found} (max {supported})")]
    UnsupportedSchema { found: u64, supported: u32 },

    /// Stored document could not be migrated to the current schema
    #[error("Catalog migration to version {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
