//! Mission value types.

use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable catalog identifier of a mission. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub u32);

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A playable mission of the rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    /// Path below the dogfight missions root; unset until a file is chosen.
    #[serde(default)]
    pub relative_path: Option<String>,
    pub duration_minutes: u32,
}

impl Mission {
    /// Playback length in seconds.
    pub fn duration_secs(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    pub(crate) fn validate(&self) -> CatalogResult<()> {
        if self.id.0 == 0 {
            return Err(CatalogError::InvalidMission(
                "mission id must be positive".to_string(),
            ));
        }
        validate_name(&self.name)?;
        validate_duration(self.duration_minutes)?;
        if let Some(path) = &self.relative_path {
            validate_path(path)?;
        }
        Ok(())
    }
}

/// Fields of a mission that is about to be added; the catalog assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionDraft {
    pub name: String,
    #[serde(default)]
    pub relative_path: Option<String>,
    pub duration_minutes: u32,
}

impl MissionDraft {
    pub fn new(name: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
            duration_minutes,
        }
    }

    pub fn with_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }
}

/// Partial edit of a mission; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    /// `Some(None)` clears the file.
    #[serde(default)]
    pub relative_path: Option<Option<String>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl MissionUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn file(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: Some(Some(relative_path.into())),
            ..Self::default()
        }
    }

    pub fn duration(minutes: u32) -> Self {
        Self {
            duration_minutes: Some(minutes),
            ..Self::default()
        }
    }

    /// Whether the edit changes what a live playback of the mission looks like.
    pub fn affects_playback(&self) -> bool {
        self.relative_path.is_some() || self.duration_minutes.is_some()
    }
}

pub(crate) fn validate_name(name: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidMission(
            "mission name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_duration(minutes: u32) -> CatalogResult<()> {
    if minutes == 0 {
        return Err(CatalogError::InvalidMission(
            "mission duration must be at least one minute".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_path(path: &str) -> CatalogResult<()> {
    if path.trim().is_empty() {
        return Err(CatalogError::InvalidMission(
            "mission file path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
