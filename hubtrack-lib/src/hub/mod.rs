//! Domain model for package repositories and the collaborators that serve them
//!
//! Trackers never talk to a concrete network client, git binary, or database.
//! Everything they need is expressed here as a trait:
//!
//! - [`RepositoryCloner`]: materializes a repository's contents locally
//! - [`RepositoryManager`]: reads and updates repository records
//! - [`PackageManager`]: registers and unregisters packages
//! - [`IndexLoader`]: loads a chart repository index
//! - [`ImageStore`]: stores package logos
//! - [`HttpGetter`]: the single network primitive for ad-hoc fetches
//!
//! The [`crate::infra`] module provides the implementations used by the CLI.

mod chart_index;
mod managers;
mod metadata;
mod package;
mod repository;

pub use chart_index::{ChartIndex, ChartVersion};
pub use managers::{ClonedRepository, HttpGetter, ImageStore, IndexLoader, LoadedIndex, PackageManager, RepositoryCloner, RepositoryManager};
pub use metadata::{IgnoreEntry, METADATA_FILE, Owner, RepositoryMetadata, load_metadata};
pub use package::{Package, PackageKey};
pub use repository::{Repository, RepositoryId, RepositoryKind};
