//! Ordered mission catalog with a current selection.
//!
//! Order is significant: it is the rotation order. `current_id` is either
//! `None` or the id of exactly one entry, and every mutation preserves that.

use crate::error::{CatalogError, CatalogResult};
use crate::mission::{
    validate_duration, validate_name, validate_path, Mission, MissionDraft, MissionId,
    MissionUpdate,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct MissionCatalog {
    missions: Vec<Mission>,
    current_id: Option<MissionId>,
    /// Next id to hand out; seeded lazily from the largest id in use.
    /// Wider than an id so the counter can step past `u32::MAX`.
    next_id: Option<u64>,
}

impl MissionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from stored parts, dropping entries that break the
    /// catalog invariants.
    pub fn from_parts(missions: Vec<Mission>, current_id: Option<MissionId>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(missions.len());

        for mission in missions {
            if let Err(e) = mission.validate() {
                warn!(mission_id = %mission.id, error = %e, "Dropping invalid stored mission");
                continue;
            }
            if !seen.insert(mission.id) {
                warn!(mission_id = %mission.id, "Dropping stored mission with duplicate id");
                continue;
            }
            kept.push(mission);
        }

        let current_id = match current_id {
            Some(id) if seen.contains(&id) => Some(id),
            Some(id) => {
                warn!(mission_id = %id, "Stored current mission does not exist, clearing selection");
                None
            }
            None => None,
        };

        Self {
            missions: kept,
            current_id,
            next_id: None,
        }
    }

    /// Missions in rotation order.
    pub fn list(&self) -> &[Mission] {
        &self.missions
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    pub fn get(&self, id: MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id == id)
    }

    /// Allocates a fresh id: one past the largest id in use on first call,
    /// strictly increasing afterwards, never reused within the process run.
    pub fn generate_id(&mut self) -> CatalogResult<MissionId> {
        let max_existing = self.missions.iter().map(|m| m.id.0).max().unwrap_or(0);
        let next = self.next_id.unwrap_or(0).max(u64::from(max_existing) + 1);
        let id = u32::try_from(next).map_err(|_| CatalogError::IdsExhausted)?;
        self.next_id = Some(next + 1);
        Ok(MissionId(id))
    }

    /// Appends a new mission at the end of the rotation.
    pub fn add(&mut self, draft: MissionDraft) -> CatalogResult<MissionId> {
        validate_name(&draft.name)?;
        validate_duration(draft.duration_minutes)?;
        if let Some(path) = &draft.relative_path {
            validate_path(path)?;
        }

        let id = self.generate_id()?;
        info!(mission_id = %id, name = %draft.name, "Mission added to catalog");
        self.missions.push(Mission {
            id,
            name: draft.name,
            relative_path: draft.relative_path,
            duration_minutes: draft.duration_minutes,
        });
        Ok(id)
    }

    /// Removes a mission; removing the current one clears the selection.
    pub fn remove(&mut self, id: MissionId) -> CatalogResult<Mission> {
        let index = self.index_of(id).ok_or(CatalogError::InvalidReference { id })?;
        let removed = self.missions.remove(index);
        if self.current_id == Some(id) {
            debug!(mission_id = %id, "Removed mission was current, clearing selection");
            self.current_id = None;
        }
        info!(mission_id = %id, "Mission removed from catalog");
        Ok(removed)
    }

    /// Moves a mission to `new_index` in the rotation.
    pub fn reorder(&mut self, id: MissionId, new_index: usize) -> CatalogResult<()> {
        let index = self.index_of(id).ok_or(CatalogError::InvalidReference { id })?;
        if new_index >= self.missions.len() {
            return Err(CatalogError::IndexOutOfRange {
                index: new_index,
                len: self.missions.len(),
            });
        }
        let mission = self.missions.remove(index);
        self.missions.insert(new_index, mission);
        debug!(mission_id = %id, from = index, to = new_index, "Mission moved");
        Ok(())
    }

    /// Applies a partial edit. Validation happens before anything changes.
    pub fn update(&mut self, id: MissionId, update: MissionUpdate) -> CatalogResult<&Mission> {
        let index = self.index_of(id).ok_or(CatalogError::InvalidReference { id })?;

        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(Some(path)) = &update.relative_path {
            validate_path(path)?;
        }
        if let Some(minutes) = update.duration_minutes {
            validate_duration(minutes)?;
        }

        let mission = &mut self.missions[index];
        if let Some(name) = update.name {
            mission.name = name;
        }
        if let Some(path) = update.relative_path {
            mission.relative_path = path;
        }
        if let Some(minutes) = update.duration_minutes {
            mission.duration_minutes = minutes;
        }
        debug!(mission_id = %id, "Mission updated");
        Ok(&self.missions[index])
    }

    pub fn current_id(&self) -> Option<MissionId> {
        self.current_id
    }

    pub fn current(&self) -> Option<&Mission> {
        self.current_id.and_then(|id| self.get(id))
    }

    /// Selects a mission, or clears the selection with `None`.
    pub fn set_current(&mut self, id: Option<MissionId>) -> CatalogResult<()> {
        if let Some(id) = id {
            if self.index_of(id).is_none() {
                return Err(CatalogError::InvalidReference { id });
            }
        }
        self.current_id = id;
        Ok(())
    }

    pub fn index_of(&self, id: MissionId) -> Option<usize> {
        self.missions.iter().position(|m| m.id == id)
    }

    pub fn id_at_index(&self, index: usize) -> Option<MissionId> {
        self.missions.get(index).map(|m| m.id)
    }

    /// Mission that follows `after` in the rotation, wrapping around.
    ///
    /// Falls back to the first entry when `after` is no longer in the
    /// catalog, and to `None` when the catalog is empty.
    pub fn next_in_rotation(&self, after: MissionId) -> Option<MissionId> {
        if self.missions.is_empty() {
            return None;
        }
        let next_index = self
            .index_of(after)
            .map(|index| (index + 1) % self.missions.len())
            .unwrap_or(0);
        self.id_at_index(next_index)
    }
}
