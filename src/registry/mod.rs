//! Project registry: named, isolated workspaces over a shared base directory.
//!
//! # Overview
//!
//! A project is a name, a data directory and a freeform metadata record. The
//! registry composes the durable metadata store ([`ProjectStore`]) with
//! filesystem operations to implement structural changes (create, copy,
//! rename, delete) safely under concurrent access, and tracks which project
//! is currently active.
//!
//! # Storage Layout
//!
//! Everything lives under the configured base directory:
//!
//! ```text
//! <base>/projects.json      the metadata store
//! <base>/active.toml        the active-project marker
//! <base>/.locks/            per-project lock files
//! <base>/<slug>/            one data directory per project
//! ```

mod dataset;
mod manager;
mod project;
mod store;

pub use dataset::ProjectDataset;
pub use manager::ProjectRegistry;
pub use project::{dir_slug, sanitize_name, validate_name, Metadata, MetadataValue, ProjectRecord};
pub use store::{ProjectStore, STORE_FILE};
