//! Error types for registry operations.
//!
//! Every failure names the project and the operation that was attempted, so
//! callers (and log readers) can tell which workspace a problem belongs to.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors surfaced by the project registry and its collaborators.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The named project is not present in the metadata store.
    #[error("project '{0}' not found")]
    NotFound(String),

    /// A project with this name is already registered.
    #[error("project '{0}' already exists")]
    AlreadyExists(String),

    /// The project is the currently active one; it must be deactivated before
    /// it can be deleted.
    #[error("project '{0}' is the active project; deactivate it first")]
    ProjectActive(String),

    /// `delete` was asked to only remove an empty project, but the data
    /// directory still has entries.
    #[error("project '{name}' data directory {path:?} is not empty")]
    NotEmpty { name: String, path: PathBuf },

    /// The name is empty, a path component like `.` or `..`, or contains
    /// path separators or control characters.
    #[error("invalid project name '{0}'")]
    InvalidName(String),

    /// A persisted file exists but cannot be parsed. Never auto-repaired;
    /// the caller decides whether to rebuild or abort.
    #[error("store file {path:?} is corrupt: {detail}")]
    CorruptStore { path: PathBuf, detail: String },

    /// A value could not be serialized for persistence.
    #[error("failed to encode {path:?}: {detail}")]
    Encode { path: PathBuf, detail: String },

    /// An underlying filesystem operation failed.
    #[error("{op} failed for {path:?}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The per-project lock could not be acquired within the bounded wait.
    /// No state has been mutated.
    #[error("timed out waiting for the lock on project '{0}'")]
    LockTimeout(String),
}

impl RegistryError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_project() {
        let err = RegistryError::NotFound("alpha".to_string());
        assert!(err.to_string().contains("alpha"));

        let err = RegistryError::ProjectActive("beta".to_string());
        assert!(err.to_string().contains("beta"));

        let err = RegistryError::LockTimeout("gamma".to_string());
        assert!(err.to_string().contains("gamma"));
    }

    #[test]
    fn test_io_error_carries_operation_and_path() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = RegistryError::io("create project directory", "/tmp/p", inner);
        let text = err.to_string();
        assert!(text.contains("create project directory"));
        assert!(text.contains("/tmp/p"));
    }
}
