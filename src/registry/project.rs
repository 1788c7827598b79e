//! Project records and the metadata value model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::errors::{RegistryError, Result};

/// Freeform per-project metadata mapping.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A metadata value.
///
/// A closed union rather than an open `any` type, so the persisted form stays
/// deterministic. Nested mappings use `BTreeMap` for the same reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Map(BTreeMap<String, MetadataValue>),
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Metadata about a registered project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Unique, case-sensitive project name
    pub name: String,
    /// Absolute path to the project's data directory
    pub data_dir: PathBuf,
    /// When the project was created
    pub created_at: DateTime<Utc>,
    /// Host-defined bookkeeping; the registry never interprets it
    #[serde(default)]
    pub metadata: Metadata,
}

impl ProjectRecord {
    /// Create a record stamped with the current time.
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
            created_at: Utc::now(),
            metadata,
        }
    }

    /// Check if the data directory exists on disk.
    pub fn data_dir_exists(&self) -> bool {
        self.data_dir.exists()
    }

    /// Get a display-friendly representation of the data directory path.
    pub fn display_path(&self) -> String {
        self.data_dir.display().to_string()
    }
}

/// Validate a project name.
///
/// Names are case-sensitive and must be non-empty, must not be the `.` or
/// `..` path components, and must not contain path separators or control
/// characters.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Compute the on-disk directory slug for a project name.
///
/// `{sanitized-name}-{hash8}` where the hash covers the raw name, so two
/// names that sanitize identically ("My Project" / "my project") still get
/// distinct directories. The slug is computed once at creation and recorded
/// in the store; it is never re-derived for an existing record.
pub fn dir_slug(name: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    let hash = hasher.finish();

    format!("{}-{:08x}", sanitize_name(name), hash as u32)
}

/// Sanitize a project name for use in file paths.
///
/// Converts to lowercase and replaces non-alphanumeric characters (except
/// hyphens and underscores) with hyphens.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_record_new() {
        let record = ProjectRecord::new("test", "/tmp/test", Metadata::new());
        assert_eq!(record.name, "test");
        assert_eq!(record.data_dir, Path::new("/tmp/test"));
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_validate_name_accepts_ordinary_names() {
        validate_name("alpha").unwrap();
        validate_name("My Project").unwrap();
        validate_name("db_2024.v1").unwrap();
    }

    #[test]
    fn test_validate_name_rejects_bad_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("a\nb").is_err());
    }

    #[test]
    fn test_dir_slug_stability() {
        assert_eq!(dir_slug("alpha"), dir_slug("alpha"));
    }

    #[test]
    fn test_dir_slug_distinguishes_sanitization_collisions() {
        // Both sanitize to "my-project" but must not share a directory
        assert_ne!(dir_slug("My Project"), dir_slug("my project"));
    }

    #[test]
    fn test_dir_slug_format() {
        let slug = dir_slug("My Project");
        assert!(slug.starts_with("my-project-"));

        let hash = slug.rsplit('-').next().unwrap();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my-project"), "my-project");
        assert_eq!(sanitize_name("my_project"), "my_project");
        assert_eq!(sanitize_name("MyProject"), "myproject");
        assert_eq!(sanitize_name("my project"), "my-project");
        assert_eq!(sanitize_name("my.project"), "my-project");
    }

    #[test]
    fn test_metadata_value_round_trip() {
        let mut meta = Metadata::new();
        meta.insert("unit".to_string(), MetadataValue::from("kilogram"));
        meta.insert("runs".to_string(), MetadataValue::from(3_i64));
        meta.insert("calibrated".to_string(), MetadataValue::from(true));

        let mut nested = BTreeMap::new();
        nested.insert("scale".to_string(), MetadataValue::from(0.5));
        meta.insert("options".to_string(), MetadataValue::Map(nested));

        let json = serde_json::to_string(&meta).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }

    #[test]
    fn test_metadata_integer_is_not_read_back_as_float() {
        let json = r#"{"runs": 3}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.get("runs"), Some(&MetadataValue::Integer(3)));
    }
}
