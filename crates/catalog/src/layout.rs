//! Where mission files live on the game server.
//!
//! Dogfight missions are stored below `<missions_dir>/Net/dogfight`. The
//! catalog keeps paths relative to that root; the console expects them
//! relative to `missions_dir`, i.e. prefixed with `Net/dogfight`.

use crate::error::{CatalogError, CatalogResult};
use std::path::{Component, Path, PathBuf};

/// Console-relative prefix of every dogfight mission.
pub const DOGFIGHT_SUBPATH: &str = "Net/dogfight";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionLayout {
    root: PathBuf,
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

impl MissionLayout {
    pub fn new(missions_dir: impl Into<PathBuf>) -> Self {
        let mut root = missions_dir.into();
        root.extend(DOGFIGHT_SUBPATH.split('/'));
        Self { root }
    }

    /// Absolute dogfight missions root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path handed to the console's load command.
    pub fn load_path(relative_path: &str) -> String {
        let relative = relative_path.trim_start_matches(is_separator).replace('\\', "/");
        format!("{}/{}", DOGFIGHT_SUBPATH, relative)
    }

    pub fn absolute_path(&self, relative_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(relative_path.split(is_separator).filter(|part| !part.is_empty()));
        path
    }

    /// Resolves a chosen mission file to the path stored in the catalog.
    pub fn relative_path(&self, absolute_path: &Path) -> CatalogResult<String> {
        let outside = || CatalogError::OutsideMissionsRoot {
            root: self.root.display().to_string(),
        };
        let rest = absolute_path.strip_prefix(&self.root).map_err(|_| outside())?;

        let mut parts = Vec::new();
        for component in rest.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                _ => return Err(outside()),
            }
        }
        if parts.is_empty() {
            return Err(outside());
        }
        Ok(parts.join("/"))
    }
}
