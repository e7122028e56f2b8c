use super::{ChartIndex, Package, PackageKey, Repository, RepositoryId, RepositoryMetadata};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Performs HTTP GET requests.
///
/// Implementations return an error for transport failures and for non-success
/// status codes, so callers only ever see responses worth reading.
#[async_trait]
pub trait HttpGetter: Send + Sync {
    async fn get(&self, url: &Url) -> Result<reqwest::Response>;
}

/// A repository's content materialized on the local filesystem.
///
/// Temporary clones are removed when this value is dropped.
#[derive(Debug)]
pub struct ClonedRepository {
    path: PathBuf,
    _dir: TempDir,
}

impl ClonedRepository {
    #[must_use]
    pub fn temporary(dir: TempDir) -> Self {
        Self {
            path: dir.path().to_path_buf(),
            _dir: dir,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
pub trait RepositoryCloner: Send + Sync {
    /// Makes the repository's content available locally.
    async fn clone_repository(&self, repository: &Repository) -> Result<ClonedRepository>;

    /// Returns the revision the repository's tracked branch currently points at.
    async fn head_revision(&self, repository: &Repository) -> Result<String>;
}

#[async_trait]
pub trait RepositoryManager: Send + Sync {
    async fn list(&self) -> Result<Vec<Repository>>;

    /// Fetches and parses the metadata found at a local path or URL.
    async fn get_metadata(&self, location: &str) -> Result<RepositoryMetadata>;

    /// Persists a repository's verified-publisher flag.
    ///
    /// Implementations must stop and return an error once `cancel` has fired.
    async fn set_verified_publisher(&self, cancel: &CancellationToken, id: RepositoryId, verified: bool) -> Result<()>;

    async fn update_digest(&self, id: RepositoryId, digest: &str) -> Result<()>;

    /// Records the outcome of the latest tracking pass; an empty slice means success.
    async fn set_last_tracking_results(&self, id: RepositoryId, errors: &[String]) -> Result<()>;
}

#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Returns the digest of every package version currently registered for a repository.
    async fn registered_packages(&self, repository_id: RepositoryId) -> Result<HashMap<PackageKey, String>>;

    async fn register(&self, package: Package) -> Result<()>;

    async fn unregister(&self, repository_id: RepositoryId, key: &PackageKey) -> Result<()>;
}

/// A chart index together with the digest of its raw bytes.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: ChartIndex,
    pub digest: String,
}

#[async_trait]
pub trait IndexLoader: Send + Sync {
    async fn load_index(&self, repository: &Repository) -> Result<LoadedIndex>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores image bytes, returning the identifier they can be retrieved by.
    async fn save_image(&self, data: Bytes) -> Result<String>;
}
