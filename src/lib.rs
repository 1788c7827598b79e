//! Named, isolated project workspaces with a shared on-disk registry.
//!
//! Each project owns a persistent data directory and a metadata record; one
//! project at a time is globally *active* and scopes the host application's
//! data operations. Structural changes (create, copy, rename, delete) are
//! safe under concurrent access from multiple threads and processes sharing
//! the same base directory.
//!
//! ```no_run
//! use atelier::{Config, Metadata, ProjectRegistry};
//!
//! # fn main() -> atelier::Result<()> {
//! let registry = ProjectRegistry::open(Config::from_env()?);
//! registry.create("forest model", Metadata::new())?;
//! let dataset = registry.activate("forest model")?;
//! println!("data lives in {}", dataset.data_dir().display());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod lock;
pub mod logging;
pub mod registry;

pub use config::Config;
pub use errors::{RegistryError, Result};
pub use registry::{Metadata, MetadataValue, ProjectDataset, ProjectRecord, ProjectRegistry};
