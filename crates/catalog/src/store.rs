//! JSON persistence of the mission catalog.
//!
//! The store is a single JSON document:
//!
//! ```json
//! { "schema_version": 3, "missions": [{ "id": 1, "name": "...", "relative_path": "...", "duration_minutes": 30 }], "current_id": 1 }
//! ```
//!
//! Older documents are upgraded by an ordered chain of pure migrations, each
//! tagged with the schema version it produces. Only migrations newer than the
//! stored version run.

use crate::catalog::MissionCatalog;
use crate::error::{CatalogError, CatalogResult};
use crate::layout::DOGFIGHT_SUBPATH;
use crate::mission::{Mission, MissionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CATALOG_SCHEMA_VERSION: u32 = 3;

/// On-disk shape of the current schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub schema_version: u32,
    #[serde(default)]
    pub missions: Vec<Mission>,
    #[serde(default)]
    pub current_id: Option<MissionId>,
}

impl From<&MissionCatalog> for CatalogDocument {
    fn from(catalog: &MissionCatalog) -> Self {
        Self {
            schema_version: CATALOG_SCHEMA_VERSION,
            missions: catalog.list().to_vec(),
            current_id: catalog.current_id(),
        }
    }
}

type MigrationFn = fn(Value) -> Result<Value, String>;

/// One step of the upgrade chain.
struct Migration {
    version: u32,
    name: &'static str,
    apply: MigrationFn,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "strip_dogfight_prefix",
        apply: strip_dogfight_prefix,
    },
    Migration {
        version: 2,
        name: "rename_file_name",
        apply: rename_file_name,
    },
    Migration {
        version: 3,
        name: "normalise_layout",
        apply: normalise_layout,
    },
];

/// Schema version of a stored document.
///
/// Documents written before `schema_version` existed carry the application
/// version tuple under `version`: `[0, 1, 8]` matches schema 1 and anything
/// from `[0, 1, 9]` on matches schema 2. No version at all means schema 0.
pub fn stored_schema_version(doc: &Value) -> u64 {
    if let Some(version) = doc.get("schema_version").and_then(Value::as_u64) {
        return version;
    }

    let app_version: Vec<u64> = doc
        .get("version")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default();

    match app_version.as_slice() {
        [] => 0,
        v if v < &[0, 1, 9][..] => 1,
        _ => 2,
    }
}

/// Runs every migration newer than the stored version.
///
/// Returns the upgraded document and whether anything ran.
pub fn migrate(doc: Value) -> CatalogResult<(Value, bool)> {
    let found = stored_schema_version(&doc);
    if found > u64::from(CATALOG_SCHEMA_VERSION) {
        return Err(CatalogError::UnsupportedSchema {
            found,
            supported: CATALOG_SCHEMA_VERSION,
        });
    }

    let mut doc = doc;
    let mut migrated = false;
    for migration in MIGRATIONS.iter().filter(|m| u64::from(m.version) > found) {
        doc = (migration.apply)(doc).map_err(|reason| CatalogError::Migration {
            version: migration.version,
            reason,
        })?;
        info!(
            version = migration.version,
            migration = migration.name,
            "Catalog document migrated"
        );
        migrated = true;
    }

    if let Value::Object(map) = &mut doc {
        map.remove("version");
        map.insert(
            "schema_version".to_string(),
            Value::from(CATALOG_SCHEMA_VERSION),
        );
    }
    Ok((doc, migrated))
}

/// Mission entries of either the nested legacy layout or the flat one.
fn mission_entries(doc: &mut Value) -> Option<&mut Vec<Value>> {
    let missions = doc.get_mut("missions")?;
    if missions.is_object() {
        return missions.get_mut("list").and_then(Value::as_array_mut);
    }
    missions.as_array_mut()
}

fn expect_object(doc: &Value) -> Result<(), String> {
    if doc.is_object() {
        Ok(())
    } else {
        Err("document is not a JSON object".to_string())
    }
}

/// v1: mission files were stored with a leading `Net/dogfight` prefix.
fn strip_dogfight_prefix(mut doc: Value) -> Result<Value, String> {
    expect_object(&doc)?;
    let Some(entries) = mission_entries(&mut doc) else {
        return Ok(doc);
    };

    for entry in entries.iter_mut() {
        let Some(file_name) = entry.get("file_name").and_then(Value::as_str) else {
            continue;
        };
        let mut stripped = file_name.trim_start_matches(['/', '\\']).replace('\\', "/");
        if let Some(rest) = stripped.strip_prefix(&format!("{}/", DOGFIGHT_SUBPATH)) {
            stripped = rest.trim_start_matches('/').to_string();
        }
        entry["file_name"] = Value::String(stripped);
    }
    Ok(doc)
}

/// v2: `file_name` became `relative_path`.
fn rename_file_name(mut doc: Value) -> Result<Value, String> {
    expect_object(&doc)?;
    let Some(entries) = mission_entries(&mut doc) else {
        return Ok(doc);
    };

    for entry in entries.iter_mut() {
        if let Value::Object(fields) = entry {
            if let Some(file_name) = fields.remove("file_name") {
                fields.insert("relative_path".to_string(), file_name);
            }
        }
    }
    Ok(doc)
}

/// v3: flat `missions` array of objects with `duration_minutes`, top-level
/// `current_id`. Accepts tuple-encoded entries `[id, name, path, duration]`.
fn normalise_layout(doc: Value) -> Result<Value, String> {
    let Value::Object(mut root) = doc else {
        return Err("document is not a JSON object".to_string());
    };

    let (entries, nested_current) = match root.remove("missions") {
        None | Some(Value::Null) => (Vec::new(), None),
        Some(Value::Array(entries)) => (entries, None),
        Some(Value::Object(mut nested)) => {
            let entries = match nested.remove("list") {
                Some(Value::Array(entries)) => entries,
                None | Some(Value::Null) => Vec::new(),
                Some(_) => return Err("missions.list is not an array".to_string()),
            };
            (entries, nested.remove("current_id"))
        }
        Some(_) => return Err("missions is neither an array nor an object".to_string()),
    };

    let missions = entries
        .into_iter()
        .map(normalise_entry)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(current) = nested_current {
        root.entry("current_id".to_string()).or_insert(current);
    }
    root.insert("missions".to_string(), Value::Array(missions));
    Ok(Value::Object(root))
}

fn normalise_entry(entry: Value) -> Result<Value, String> {
    match entry {
        Value::Array(parts) => {
            let [id, name, path, duration]: [Value; 4] = parts
                .try_into()
                .map_err(|_| "tuple mission must have four fields".to_string())?;
            let mut fields = Map::new();
            fields.insert("id".to_string(), id);
            fields.insert("name".to_string(), name);
            fields.insert("relative_path".to_string(), path);
            fields.insert("duration_minutes".to_string(), duration);
            Ok(Value::Object(fields))
        }
        Value::Object(mut fields) => {
            if let Some(duration) = fields.remove("duration") {
                fields.entry("duration_minutes".to_string()).or_insert(duration);
            }
            Ok(Value::Object(fields))
        }
        _ => Err("mission entry is neither an array nor an object".to_string()),
    }
}

/// File-backed catalog persistence.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog.
    ///
    /// A missing or unreadable-as-JSON store yields an empty catalog. Real I/O
    /// failures and documents from a newer schema are returned as errors.
    pub fn load(&self) -> CatalogResult<MissionCatalog> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No catalog store yet, starting empty");
                return Ok(MissionCatalog::new());
            }
            Err(e) => return Err(e.into()),
        };

        // Bytes that are not UTF-8 fail here too, as a corrupt store
        let raw: Value = match serde_json::from_slice(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Catalog store is corrupt, starting empty");
                return Ok(MissionCatalog::new());
            }
        };

        let (upgraded, migrated) = match migrate(raw) {
            Ok(result) => result,
            Err(e @ CatalogError::UnsupportedSchema { .. }) => return Err(e),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Catalog store could not be migrated, starting empty");
                return Ok(MissionCatalog::new());
            }
        };

        let doc: CatalogDocument = match serde_json::from_value(upgraded) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Catalog store is corrupt, starting empty");
                return Ok(MissionCatalog::new());
            }
        };

        let catalog = MissionCatalog::from_parts(doc.missions, doc.current_id);
        debug!(
            path = %self.path.display(),
            missions = catalog.len(),
            current_id = ?catalog.current_id(),
            "Catalog loaded"
        );

        if migrated {
            if let Err(e) = self.save(&catalog) {
                warn!(path = %self.path.display(), error = %e, "Failed to write migrated catalog");
            }
        }
        Ok(catalog)
    }

    /// Writes the full catalog and selection, replacing the previous file.
    pub fn save(&self, catalog: &MissionCatalog) -> CatalogResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(&CatalogDocument::from(catalog))?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, &self.path)?;

        debug!(path = %self.path.display(), missions = catalog.len(), "Catalog persisted");
        Ok(())
    }
}
