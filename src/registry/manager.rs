//! Structural operations on projects: create, activate, copy, rename, delete.
//!
//! Every structural operation acquires the per-name lock(s), reloads the
//! store under the lock, mutates the filesystem and the store together, and
//! saves. Operations are all-or-nothing: a failure partway through triggers
//! compensating cleanup of whatever partial state was created, then the
//! original error propagates.
//!
//! Read-only queries (`exists`, `list`, `get`, `active`) take no lock and may
//! observe transiently stale state while a concurrent mutation is in flight.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::dataset::ProjectDataset;
use super::project::{dir_slug, validate_name, Metadata, ProjectRecord};
use super::store::ProjectStore;
use crate::config::Config;
use crate::errors::{RegistryError, Result};
use crate::lock::{LockGuard, LockManager};

/// Orchestrates the metadata store and the filesystem behind per-name locks.
pub struct ProjectRegistry {
    config: Config,
    locks: LockManager,
}

impl ProjectRegistry {
    /// Open the registry over the configured base directory.
    pub fn open(config: Config) -> Self {
        let locks = LockManager::new(config.base_dir());
        Self { config, locks }
    }

    /// Open with an explicit lock manager (shorter timeouts in tests).
    pub fn with_lock_manager(config: Config, locks: LockManager) -> Self {
        Self { config, locks }
    }

    /// The configuration this registry was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn base_dir(&self) -> &Path {
        self.config.base_dir()
    }

    fn data_dir_for(&self, name: &str) -> PathBuf {
        self.base_dir().join(dir_slug(name))
    }

    /// Acquire locks for a two-name operation in a deterministic order, so
    /// concurrent copy/rename pairs cannot deadlock.
    fn acquire_pair(&self, a: &str, b: &str) -> Result<(LockGuard, LockGuard)> {
        if a <= b {
            let first = self.locks.acquire(a)?;
            let second = self.locks.acquire(b)?;
            Ok((first, second))
        } else {
            let second = self.locks.acquire(b)?;
            let first = self.locks.acquire(a)?;
            Ok((first, second))
        }
    }

    /// Create a new project with the given metadata.
    ///
    /// Directory creation and record insertion are committed together or not
    /// at all: if the store cannot be saved, the fresh directory is removed
    /// again before the error propagates.
    pub fn create(&self, name: &str, metadata: Metadata) -> Result<ProjectRecord> {
        validate_name(name)?;
        let _lock = self.locks.acquire(name)?;

        let mut store = ProjectStore::load(self.base_dir())?;
        if store.contains(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }

        let data_dir = self.data_dir_for(name);
        fs::create_dir_all(&data_dir)
            .map_err(|err| RegistryError::io("create project directory", &data_dir, err))?;

        let record = ProjectRecord::new(name, &data_dir, metadata);
        store.insert(record.clone());
        if let Err(err) = store.save() {
            if let Err(cleanup) = fs::remove_dir_all(&data_dir) {
                warn!(project = name, error = %cleanup, "failed to roll back project directory");
            }
            return Err(err);
        }

        info!(project = name, path = %data_dir.display(), "created project");
        Ok(record)
    }

    /// Make `name` the active project and return a fresh handle to it.
    ///
    /// Selection is advisory: no lock is taken, last writer wins.
    pub fn activate(&self, name: &str) -> Result<ProjectDataset> {
        let store = ProjectStore::load(self.base_dir())?;
        let record = store
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        self.config.set_active(name)?;
        info!(project = name, "activated project");
        Ok(ProjectDataset::from_record(record))
    }

    /// Clear the active-project selection.
    pub fn deactivate(&self) -> Result<()> {
        self.config.clear_active()?;
        debug!("cleared active project");
        Ok(())
    }

    /// Handle to the currently active project, if one is selected and still
    /// present in the store. A dangling selection reads as `None`.
    pub fn active(&self) -> Result<Option<ProjectDataset>> {
        let Some(name) = self.config.active()? else {
            return Ok(None);
        };
        let store = ProjectStore::load(self.base_dir())?;
        Ok(store
            .get(&name)
            .cloned()
            .map(ProjectDataset::from_record))
    }

    /// Duplicate `source` into a new project `dest`, data directory included.
    ///
    /// All-or-nothing from the caller's perspective: a failed copy removes
    /// the partial destination tree before the error propagates.
    pub fn copy(&self, source: &str, dest: &str) -> Result<ProjectRecord> {
        validate_name(dest)?;
        if source == dest {
            return Err(RegistryError::AlreadyExists(dest.to_string()));
        }
        let (_source_lock, _dest_lock) = self.acquire_pair(source, dest)?;

        let mut store = ProjectStore::load(self.base_dir())?;
        let source_record = store
            .get(source)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(source.to_string()))?;
        if store.contains(dest) {
            return Err(RegistryError::AlreadyExists(dest.to_string()));
        }

        let dest_dir = self.data_dir_for(dest);
        if let Err(err) = copy_tree(&source_record.data_dir, &dest_dir) {
            remove_partial(dest, &dest_dir);
            return Err(err);
        }

        let record = ProjectRecord::new(dest, &dest_dir, source_record.metadata.clone());
        store.insert(record.clone());
        if let Err(err) = store.save() {
            remove_partial(dest, &dest_dir);
            return Err(err);
        }

        info!(source, dest, "copied project");
        Ok(record)
    }

    /// Rename `old` to `new`, moving the data directory.
    ///
    /// The store is re-saved only after the filesystem move succeeds; a
    /// failed save moves the directory back. If `old` was the active project
    /// the selection follows the rename.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        if old == new {
            return Err(RegistryError::AlreadyExists(new.to_string()));
        }
        let (_old_lock, _new_lock) = self.acquire_pair(old, new)?;

        let mut store = ProjectStore::load(self.base_dir())?;
        let record = store
            .get(old)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(old.to_string()))?;
        if store.contains(new) {
            return Err(RegistryError::AlreadyExists(new.to_string()));
        }

        let old_dir = record.data_dir.clone();
        let new_dir = self.data_dir_for(new);
        fs::rename(&old_dir, &new_dir)
            .map_err(|err| RegistryError::io("move project directory", &old_dir, err))?;

        let mut renamed = record;
        renamed.name = new.to_string();
        renamed.data_dir = new_dir.clone();
        store.remove(old);
        store.insert(renamed);
        if let Err(err) = store.save() {
            if let Err(undo) = fs::rename(&new_dir, &old_dir) {
                warn!(project = old, error = %undo, "failed to move project directory back");
            }
            return Err(err);
        }

        if self.config.active()?.as_deref() == Some(old) {
            self.config.set_active(new)?;
        }

        info!(from = old, to = new, "renamed project");
        Ok(())
    }

    /// Delete a project: data directory tree and metadata record together.
    ///
    /// The active project cannot be deleted; deactivate first. With
    /// `require_empty`, a data directory that still has entries fails with
    /// `NotEmpty` and nothing is deleted.
    pub fn delete(&self, name: &str, require_empty: bool) -> Result<()> {
        let _lock = self.locks.acquire(name)?;

        let mut store = ProjectStore::load(self.base_dir())?;
        let record = store
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        if self.config.active()?.as_deref() == Some(name) {
            return Err(RegistryError::ProjectActive(name.to_string()));
        }

        if require_empty && dir_has_entries(&record.data_dir)? {
            return Err(RegistryError::NotEmpty {
                name: name.to_string(),
                path: record.data_dir,
            });
        }

        match fs::remove_dir_all(&record.data_dir) {
            Ok(()) => {}
            // Already gone externally: the record is still ours to remove
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(RegistryError::io(
                    "remove project directory",
                    &record.data_dir,
                    err,
                ))
            }
        }

        store.remove(name);
        store.save()?;

        info!(project = name, "deleted project");
        Ok(())
    }

    /// Edit a project's metadata mapping in place, under its lock.
    pub fn update_metadata<F>(&self, name: &str, f: F) -> Result<ProjectRecord>
    where
        F: FnOnce(&mut Metadata),
    {
        let _lock = self.locks.acquire(name)?;

        let mut store = ProjectStore::load(self.base_dir())?;
        let mut record = store
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        f(&mut record.metadata);
        store.insert(record.clone());
        store.save()?;

        debug!(project = name, "updated project metadata");
        Ok(record)
    }

    /// Check if a project with the given name exists.
    ///
    /// Takes no lock; may race benignly with a concurrent structural
    /// mutation.
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(ProjectStore::load(self.base_dir())?.contains(name))
    }

    /// All project names, sorted. Takes no lock.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(ProjectStore::load(self.base_dir())?.names())
    }

    /// Snapshot of one project's record. Takes no lock.
    pub fn get(&self, name: &str) -> Result<Option<ProjectRecord>> {
        Ok(ProjectStore::load(self.base_dir())?.get(name).cloned())
    }
}

fn remove_partial(name: &str, dir: &Path) {
    if dir.exists() {
        if let Err(err) = fs::remove_dir_all(dir) {
            warn!(project = name, error = %err, "failed to remove partial copy");
        }
    }
}

/// Recursively copy `src` into `dest`.
///
/// Directories are visited before their contents, so parents always exist by
/// the time their files are copied. Symlinked files are copied as the files
/// they point to.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry =
            entry.map_err(|err| RegistryError::io("walk project directory", src, err.into()))?;
        let rel = entry.path().strip_prefix(src).map_err(|err| {
            RegistryError::io(
                "resolve copied path",
                entry.path(),
                std::io::Error::new(std::io::ErrorKind::Other, err),
            )
        })?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| RegistryError::io("create copied directory", &target, err))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|err| RegistryError::io("copy project file", &target, err))?;
        }
    }
    Ok(())
}

fn dir_has_entries(path: &Path) -> Result<bool> {
    let mut entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        // Externally removed directory counts as empty
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(RegistryError::io("read project directory", path, err)),
    };
    match entries.next() {
        Some(Ok(_)) => Ok(true),
        Some(Err(err)) => Err(RegistryError::io("read project directory", path, err)),
        None => Ok(false),
    }
}
