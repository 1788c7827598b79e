//! Durable project metadata store, persisted as `projects.json`.
//!
//! The whole mapping is written in one atomic replace (temp file, fsync,
//! rename) so a concurrent reader never observes a half-written file. A file
//! that exists but cannot be parsed is surfaced as `CorruptStore`, never
//! silently reset.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::project::ProjectRecord;
use crate::errors::{RegistryError, Result};

/// File name of the store under the base directory.
pub const STORE_FILE: &str = "projects.json";

/// The full mapping of project records, keyed by name.
///
/// `BTreeMap` keeps both iteration order and the persisted JSON deterministic.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    path: PathBuf,
    records: BTreeMap<String, ProjectRecord>,
}

impl ProjectStore {
    /// Load the store from `base_dir`, or start empty if the file is absent.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(STORE_FILE);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no project store yet, starting empty");
                return Ok(Self {
                    path,
                    records: BTreeMap::new(),
                });
            }
            Err(err) => return Err(RegistryError::io("read project store", &path, err)),
        };

        let records = serde_json::from_str(&content).map_err(|err| {
            RegistryError::CorruptStore {
                path: path.clone(),
                detail: err.to_string(),
            }
        })?;

        Ok(Self { path, records })
    }

    /// Save the store using atomic file operations.
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.records).map_err(|err| {
            RegistryError::Encode {
                path: self.path.clone(),
                detail: err.to_string(),
            }
        })?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .map_err(|err| RegistryError::io("create temp store file", &temp_path, err))?;

        file.write_all(content.as_bytes())
            .map_err(|err| RegistryError::io("write project store", &temp_path, err))?;

        file.sync_all()
            .map_err(|err| RegistryError::io("sync project store", &temp_path, err))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|err| RegistryError::io("replace project store", &self.path, err))?;

        debug!(path = %self.path.display(), "saved project store");
        Ok(())
    }

    /// Path of the persisted store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a project record by name.
    pub fn get(&self, name: &str) -> Option<&ProjectRecord> {
        self.records.get(name)
    }

    /// Check if a project with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// All records, in name order.
    pub fn all(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.records.values()
    }

    /// All project names, in name order.
    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Insert or replace a record under its own name.
    pub fn insert(&mut self, record: ProjectRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Remove a record by name, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<ProjectRecord> {
        self.records.remove(name)
    }

    /// Number of registered projects.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
