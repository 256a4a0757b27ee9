//! Persistent mission catalog for the minic commander.
//!
//! The catalog is the ordered list of missions the server rotates through,
//! plus the currently selected one. [`CatalogStore`] persists it as a
//! versioned JSON document and upgrades older layouts on load.

pub mod catalog;
pub mod error;
pub mod layout;
pub mod mission;
pub mod store;

pub use catalog::MissionCatalog;
pub use error::{CatalogError, CatalogResult};
pub use layout::{MissionLayout, DOGFIGHT_SUBPATH};
pub use mission::{Mission, MissionDraft, MissionId, MissionUpdate};
pub use store::{CatalogDocument, CatalogStore, CATALOG_SCHEMA_VERSION};
