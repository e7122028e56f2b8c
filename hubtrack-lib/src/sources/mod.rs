//! Kind-specific package discovery.
//!
//! A [`PackageSource`] knows how to observe one kind of repository: how to
//! tell whether it changed since the last pass and how to enumerate the
//! package versions it currently publishes. Everything else about a tracking
//! pass is shared and lives in [`crate::tracker`].

mod catalog;
mod helm;

pub use catalog::{GitCatalogSource, PACKAGE_METADATA_FILE};
pub use helm::ChartIndexSource;

use crate::Result;
use crate::hub::{ClonedRepository, Package, Repository};
use crate::tracker::Services;
use async_trait::async_trait;

/// What a source currently publishes.
#[derive(Debug)]
pub struct SourceSnapshot {
    /// Where the repository's metadata file can be read from.
    pub metadata_location: String,

    pub packages: Vec<Package>,

    checkout: Option<ClonedRepository>,
}

impl SourceSnapshot {
    #[must_use]
    pub const fn new(metadata_location: String, packages: Vec<Package>) -> Self {
        Self {
            metadata_location,
            packages,
            checkout: None,
        }
    }

    /// Keeps a local checkout alive for as long as the snapshot is in use.
    #[must_use]
    pub fn with_checkout(mut self, checkout: ClonedRepository) -> Self {
        self.checkout = Some(checkout);
        self
    }
}

#[async_trait]
pub trait PackageSource: Send {
    /// A digest identifying the repository's current remote content.
    ///
    /// `None` means the source cannot tell, and the repository is always processed.
    async fn remote_digest(&mut self, svc: &Services, repository: &Repository) -> Result<Option<String>>;

    /// Enumerates the packages currently published.
    ///
    /// Problems with individual packages are recorded in the errors collector
    /// and the package is left out; only failures that make the whole
    /// repository unreadable are returned as errors.
    async fn load(&mut self, svc: &Services, repository: &Repository) -> Result<SourceSnapshot>;
}
