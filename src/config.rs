//! Process-wide configuration: base data directory and active-project marker.
//!
//! The base directory is resolved once, from the `ATELIER_BASE_DIR`
//! environment variable if set, otherwise the platform user-data location
//! (e.g. `~/.local/share/atelier` on Linux). Everything the registry persists
//! lives underneath it.
//!
//! The active-project selection is advisory, not structural: it is written
//! with plain last-writer-wins semantics and no locking.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{RegistryError, Result};

/// Environment variable overriding the base data directory.
pub const BASE_DIR_ENV: &str = "ATELIER_BASE_DIR";

const ACTIVE_FILE: &str = "active.toml";
const APP_QUALIFIER: &str = "io";
const APP_ORGANIZATION: &str = "atelier";
const APP_NAME: &str = "atelier";

/// Persisted form of the active-project selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ActiveMarker {
    project: Option<String>,
}

/// Resolved process-wide settings.
///
/// Hosts hold one of these (or a [`crate::ProjectRegistry`] built from it)
/// and place their own domain files underneath the data directories it
/// resolves.
#[derive(Debug, Clone)]
pub struct Config {
    base_dir: PathBuf,
}

impl Config {
    /// Resolve the base directory from the environment, creating it if absent.
    pub fn from_env() -> Result<Self> {
        let base_dir = match env::var_os(BASE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    RegistryError::io(
                        "resolve base directory",
                        PathBuf::new(),
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "could not determine a home directory",
                        ),
                    )
                })?,
        };
        Self::with_base_dir(base_dir)
    }

    /// Use an explicit base directory, creating it if absent.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .map_err(|err| RegistryError::io("create base directory", &base_dir, err))?;
        debug!(path = %base_dir.display(), "resolved base directory");
        Ok(Self { base_dir })
    }

    /// The directory all registry state lives under.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn active_path(&self) -> PathBuf {
        self.base_dir.join(ACTIVE_FILE)
    }

    /// Name of the currently selected project, if any.
    pub fn active(&self) -> Result<Option<String>> {
        let path = self.active_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(RegistryError::io("read active marker", &path, err)),
        };
        let marker: ActiveMarker =
            toml::from_str(&content).map_err(|err| RegistryError::CorruptStore {
                path,
                detail: err.to_string(),
            })?;
        Ok(marker.project)
    }

    /// Persist `name` as the active project.
    ///
    /// Existence of the name is validated by the registry, which owns the
    /// metadata store; this layer only records the selection.
    pub fn set_active(&self, name: &str) -> Result<()> {
        let path = self.active_path();
        let marker = ActiveMarker {
            project: Some(name.to_string()),
        };
        let content = toml::to_string(&marker).map_err(|err| RegistryError::Encode {
            path: path.clone(),
            detail: err.to_string(),
        })?;
        fs::write(&path, content)
            .map_err(|err| RegistryError::io("write active marker", &path, err))?;
        debug!(project = name, "recorded active project");
        Ok(())
    }

    /// Clear the active-project selection. A missing marker is not an error.
    pub fn clear_active(&self) -> Result<()> {
        let path = self.active_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(RegistryError::io("remove active marker", &path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_with_base_dir_creates_directory() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("nested").join("data");

        let config = Config::with_base_dir(&base).unwrap();
        assert!(base.is_dir());
        assert_eq!(config.base_dir(), base);
    }

    #[test]
    fn test_active_round_trip() {
        let dir = tempdir().unwrap();
        let config = Config::with_base_dir(dir.path()).unwrap();

        assert_eq!(config.active().unwrap(), None);

        config.set_active("alpha").unwrap();
        assert_eq!(config.active().unwrap(), Some("alpha".to_string()));

        // Last writer wins
        config.set_active("beta").unwrap();
        assert_eq!(config.active().unwrap(), Some("beta".to_string()));

        config.clear_active().unwrap();
        assert_eq!(config.active().unwrap(), None);
    }

    #[test]
    fn test_clear_active_without_marker_is_ok() {
        let dir = tempdir().unwrap();
        let config = Config::with_base_dir(dir.path()).unwrap();
        config.clear_active().unwrap();
    }

    #[test]
    fn test_corrupt_marker_is_surfaced() {
        let dir = tempdir().unwrap();
        let config = Config::with_base_dir(dir.path()).unwrap();

        fs::write(dir.path().join(ACTIVE_FILE), "not [valid toml").unwrap();

        let err = config.active().unwrap_err();
        assert!(matches!(err, RegistryError::CorruptStore { .. }));
    }

    #[test]
    fn test_selection_survives_reopen() {
        let dir = tempdir().unwrap();

        let config = Config::with_base_dir(dir.path()).unwrap();
        config.set_active("alpha").unwrap();
        drop(config);

        let reopened = Config::with_base_dir(dir.path()).unwrap();
        assert_eq!(reopened.active().unwrap(), Some("alpha".to_string()));
    }
}
