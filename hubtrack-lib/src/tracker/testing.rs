//! In-memory collaborators for unit tests.

use super::{ErrorsCollector, Services};
use crate::Result;
use crate::config::Config;
use crate::hub::{
    ClonedRepository, HttpGetter, IgnoreEntry, ImageStore, IndexLoader, LoadedIndex, Package, PackageKey, PackageManager, Repository,
    RepositoryCloner, RepositoryId, RepositoryManager, RepositoryMetadata,
};
use async_trait::async_trait;
use bytes::Bytes;
use core::sync::atomic::{AtomicUsize, Ordering};
use ohno::bail;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Default)]
pub struct FakeRepositoryManager {
    repositories: Mutex<BTreeMap<RepositoryId, Repository>>,
    metadata: Mutex<HashMap<String, RepositoryMetadata>>,
    results: Mutex<BTreeMap<RepositoryId, Vec<String>>>,
    verified_writes: AtomicUsize,
    fail_verified_writes: bool,
}

impl FakeRepositoryManager {
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self {
            repositories: Mutex::new(repositories.into_iter().map(|r| (r.id, r)).collect()),
            ..Self::default()
        }
    }

    pub fn failing_verified_writes(mut self) -> Self {
        self.fail_verified_writes = true;
        self
    }

    pub fn put_metadata(&self, location: &str, repository_id: Option<RepositoryId>) {
        let md = RepositoryMetadata {
            repository_id,
            ..RepositoryMetadata::default()
        };
        let _ = self.metadata.lock().unwrap().insert(location.to_string(), md);
    }

    pub fn put_metadata_with_ignore(&self, location: &str, repository_id: Option<RepositoryId>, name: &str, version: Option<&str>) {
        let md = RepositoryMetadata {
            repository_id,
            ignore: vec![IgnoreEntry {
                name: name.to_string(),
                version: version.map(str::to_string),
            }],
            ..RepositoryMetadata::default()
        };
        let _ = self.metadata.lock().unwrap().insert(location.to_string(), md);
    }

    pub fn verified_writes(&self) -> usize {
        self.verified_writes.load(Ordering::SeqCst)
    }

    pub fn verified_flag(&self, id: RepositoryId) -> Option<bool> {
        self.repositories.lock().unwrap().get(&id).map(|r| r.verified_publisher)
    }

    pub fn digest(&self, id: RepositoryId) -> Option<String> {
        self.repositories.lock().unwrap().get(&id).and_then(|r| r.digest.clone())
    }

    pub fn recorded_results(&self) -> usize {
        self.results.lock().unwrap().len()
    }
}

#[async_trait]
impl RepositoryManager for FakeRepositoryManager {
    async fn list(&self) -> Result<Vec<Repository>> {
        Ok(self.repositories.lock().unwrap().values().cloned().collect())
    }

    async fn get_metadata(&self, location: &str) -> Result<RepositoryMetadata> {
        match self.metadata.lock().unwrap().get(location) {
            Some(md) => Ok(md.clone()),
            None => bail!("metadata not found at '{location}'"),
        }
    }

    async fn set_verified_publisher(&self, cancel: &CancellationToken, id: RepositoryId, verified: bool) -> Result<()> {
        if cancel.is_cancelled() {
            bail!("cancelled");
        }
        if self.fail_verified_writes {
            bail!("simulated write failure");
        }
        let _ = self.verified_writes.fetch_add(1, Ordering::SeqCst);
        if let Some(r) = self.repositories.lock().unwrap().get_mut(&id) {
            r.verified_publisher = verified;
        }
        Ok(())
    }

    async fn update_digest(&self, id: RepositoryId, digest: &str) -> Result<()> {
        if let Some(r) = self.repositories.lock().unwrap().get_mut(&id) {
            r.digest = Some(digest.to_string());
        }
        Ok(())
    }

    async fn set_last_tracking_results(&self, id: RepositoryId, errors: &[String]) -> Result<()> {
        let _ = self.results.lock().unwrap().insert(id, errors.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakePackageManager {
    packages: Mutex<BTreeMap<(RepositoryId, PackageKey), Package>>,
    register_calls: AtomicUsize,
    failing_names: Mutex<Vec<String>>,
}

impl FakePackageManager {
    pub fn seed(&self, package: Package) {
        let _ = self.packages.lock().unwrap().insert((package.repository_id, package.key()), package);
    }

    pub fn fail_registration_of(&self, name: &str) {
        self.failing_names.lock().unwrap().push(name.to_string());
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn registered_names(&self, id: RepositoryId) -> Vec<String> {
        self.packages
            .lock()
            .unwrap()
            .keys()
            .filter(|(repo, _)| *repo == id)
            .map(|(_, key)| key.to_string())
            .collect()
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn registered_packages(&self, repository_id: RepositoryId) -> Result<HashMap<PackageKey, String>> {
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .filter(|((repo, _), _)| *repo == repository_id)
            .map(|((_, key), p)| (key.clone(), p.digest.clone()))
            .collect())
    }

    async fn register(&self, package: Package) -> Result<()> {
        let _ = self.register_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_names.lock().unwrap().contains(&package.name) {
            bail!("simulated registration failure");
        }
        self.seed(package);
        Ok(())
    }

    async fn unregister(&self, repository_id: RepositoryId, key: &PackageKey) -> Result<()> {
        let _ = self.packages.lock().unwrap().remove(&(repository_id, key.clone()));
        Ok(())
    }
}

/// Collaborators that refuse every request.
#[derive(Debug, Default)]
pub struct Offline;

#[async_trait]
impl HttpGetter for Offline {
    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        bail!("offline: refusing to fetch '{url}'")
    }
}

#[async_trait]
impl RepositoryCloner for Offline {
    async fn clone_repository(&self, repository: &Repository) -> Result<ClonedRepository> {
        bail!("offline: refusing to clone '{}'", repository.url)
    }

    async fn head_revision(&self, repository: &Repository) -> Result<String> {
        bail!("offline: refusing to query '{}'", repository.url)
    }
}

#[async_trait]
impl IndexLoader for Offline {
    async fn load_index(&self, repository: &Repository) -> Result<LoadedIndex> {
        bail!("offline: refusing to load index of '{}'", repository.url)
    }
}

#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: Mutex<Vec<Bytes>>,
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save_image(&self, data: Bytes) -> Result<String> {
        let mut images = self.images.lock().unwrap();
        images.push(data);
        Ok(format!("image-{}", images.len()))
    }
}

/// A set of fakes wired into [`Services`].
#[derive(Debug)]
pub struct Fixture {
    pub rm: Arc<FakeRepositoryManager>,
    pub pm: Arc<FakePackageManager>,
    pub errors: Arc<ErrorsCollector>,
    pub cancel: CancellationToken,
    pub config: Config,
}

impl Fixture {
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self {
            rm: Arc::new(FakeRepositoryManager::new(repositories)),
            pm: Arc::new(FakePackageManager::default()),
            errors: Arc::new(ErrorsCollector::new()),
            cancel: CancellationToken::new(),
            config: Config::default(),
        }
    }

    pub fn services(&self) -> Arc<Services> {
        Arc::new(Services::new(
            self.cancel.clone(),
            Arc::new(self.config.clone()),
            Arc::new(Offline),
            Arc::<FakeRepositoryManager>::clone(&self.rm),
            Arc::<FakePackageManager>::clone(&self.pm),
            Arc::new(Offline),
            Arc::new(MemoryImageStore::default()),
            Arc::clone(&self.errors),
            Arc::new(Offline),
        ))
    }
}

pub fn services_with(rm: Arc<FakeRepositoryManager>) -> Services {
    Services::new(
        CancellationToken::new(),
        Arc::new(Config::default()),
        Arc::new(Offline),
        rm,
        Arc::new(FakePackageManager::default()),
        Arc::new(Offline),
        Arc::new(MemoryImageStore::default()),
        Arc::new(ErrorsCollector::new()),
        Arc::new(Offline),
    )
}
