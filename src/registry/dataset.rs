//! The active-project handle handed to host applications.

use chrono::{DateTime, Utc};
use std::path::Path;

use super::project::{Metadata, ProjectRecord};

/// Immutable snapshot of one project at the moment it was resolved.
///
/// A dataset does not refresh itself. After any structural mutation (a
/// rename, delete or copy of any project, including this one) a held handle
/// is stale and must be re-fetched through the registry before touching the
/// filesystem. That re-resolution is the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDataset {
    record: ProjectRecord,
}

impl ProjectDataset {
    pub(crate) fn from_record(record: ProjectRecord) -> Self {
        Self { record }
    }

    /// The project's name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Absolute path of the data directory. Hosts place their own domain
    /// files underneath it; the registry never interprets the contents.
    pub fn data_dir(&self) -> &Path {
        &self.record.data_dir
    }

    /// When the project was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    /// Host-defined bookkeeping attached to the project.
    pub fn metadata(&self) -> &Metadata {
        &self.record.metadata
    }

    /// The underlying record snapshot.
    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::project::MetadataValue;

    #[test]
    fn test_dataset_exposes_record_fields() {
        let mut metadata = Metadata::new();
        metadata.insert("unit".to_string(), MetadataValue::from("kilogram"));

        let record = ProjectRecord::new("alpha", "/tmp/alpha", metadata);
        let dataset = ProjectDataset::from_record(record.clone());

        assert_eq!(dataset.name(), "alpha");
        assert_eq!(dataset.data_dir(), Path::new("/tmp/alpha"));
        assert_eq!(dataset.created_at(), record.created_at);
        assert_eq!(
            dataset.metadata().get("unit"),
            Some(&MetadataValue::from("kilogram"))
        );
    }
}
