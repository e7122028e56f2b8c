//! A file-backed catalog of repositories and their registered packages.

use super::catalog_lock::{CatalogLockGuard, acquire_catalog_lock};
use crate::Result;
use crate::hub::{
    HttpGetter, Package, PackageKey, PackageManager, Repository, RepositoryId, RepositoryManager, RepositoryMetadata, load_metadata,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "     catalog";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    repositories: Vec<RepositoryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepositoryRecord {
    #[serde(flatten)]
    repository: Repository,

    /// Registered packages keyed by `name@version`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    packages: BTreeMap<String, Package>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_tracking_ts: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    last_tracking_errors: Vec<String>,
}

impl RepositoryRecord {
    const fn new(repository: Repository) -> Self {
        Self {
            repository,
            packages: BTreeMap::new(),
            last_tracking_ts: None,
            last_tracking_errors: Vec::new(),
        }
    }
}

/// Repository and package storage kept in a single JSON document.
///
/// All changes happen in memory; [`JsonCatalog::save`] writes them out.
/// A catalog opened from a file holds an exclusive lock on it for its
/// whole lifetime so concurrent runs cannot interleave their writes.
pub struct JsonCatalog {
    path: Option<PathBuf>,
    records: Mutex<BTreeMap<RepositoryId, RepositoryRecord>>,
    http: Arc<dyn HttpGetter>,
    _lock: Option<CatalogLockGuard>,
}

impl core::fmt::Debug for JsonCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JsonCatalog")
            .field("path", &self.path)
            .field("repositories", &self.lock().len())
            .field("http", &"<dyn HttpGetter>")
            .finish_non_exhaustive()
    }
}

impl JsonCatalog {
    /// A catalog that lives only in memory.
    #[must_use]
    pub fn in_memory(http: Arc<dyn HttpGetter>, repositories: Vec<Repository>) -> Self {
        Self {
            path: None,
            records: Mutex::new(repositories.into_iter().map(|r| (r.id, RepositoryRecord::new(r))).collect()),
            http,
            _lock: None,
        }
    }

    /// Opens the catalog stored at `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>, http: Arc<dyn HttpGetter>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).into_app_err_with(|| format!("unable to create directory '{}'", parent.display()))?;
        }

        let lock = acquire_catalog_lock(&path).await?;
        let doc = load_document(&path)?;

        let mut records = BTreeMap::new();
        for record in doc.repositories {
            if records.insert(record.repository.id, record).is_some() {
                bail!("catalog '{}' lists a repository identifier more than once", path.display());
            }
        }

        log::info!(target: LOG_TARGET, "Opened catalog '{}' with {} repositories", path.display(), records.len());

        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
            http,
            _lock: Some(lock),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RepositoryId, RepositoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_record<T>(&self, id: RepositoryId, f: impl FnOnce(&mut RepositoryRecord) -> T) -> Result<T> {
        let mut records = self.lock();
        match records.get_mut(&id) {
            Some(record) => Ok(f(record)),
            None => bail!("repository {id} is not in the catalog"),
        }
    }

    /// Writes the catalog back to its file. Does nothing for in-memory catalogs.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let doc = CatalogDocument {
            repositories: self.lock().values().cloned().collect(),
        };
        save_document(&doc, path)?;

        log::debug!(target: LOG_TARGET, "Saved catalog '{}'", path.display());
        Ok(())
    }

    /// Adds a repository, failing if one with the same name already exists.
    pub fn add_repository(&self, repository: Repository) -> Result<()> {
        let mut records = self.lock();
        if records.values().any(|r| r.repository.name == repository.name) {
            bail!("a repository named '{}' already exists", repository.name);
        }
        let _ = records.insert(repository.id, RepositoryRecord::new(repository));
        Ok(())
    }

    #[must_use]
    pub fn repository(&self, id: RepositoryId) -> Option<Repository> {
        self.lock().get(&id).map(|r| r.repository.clone())
    }

    #[must_use]
    pub fn packages(&self, id: RepositoryId) -> Vec<Package> {
        self.lock().get(&id).map(|r| r.packages.values().cloned().collect()).unwrap_or_default()
    }

    /// When the repository was last tracked and the errors that run reported.
    #[must_use]
    pub fn last_tracking(&self, id: RepositoryId) -> Option<(DateTime<Utc>, Vec<String>)> {
        let records = self.lock();
        let record = records.get(&id)?;
        record.last_tracking_ts.map(|ts| (ts, record.last_tracking_errors.clone()))
    }
}

fn load_document(path: &Path) -> Result<CatalogDocument> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!(target: LOG_TARGET, "No catalog at '{}', starting empty", path.display());
            return Ok(CatalogDocument::default());
        }
        Err(e) => return Err(e).into_app_err_with(|| format!("unable to open catalog '{}'", path.display())),
    };

    serde_json::from_reader(BufReader::new(file)).into_app_err_with(|| format!("unable to parse catalog '{}'", path.display()))
}

fn save_document(doc: &CatalogDocument, path: &Path) -> Result<()> {
    let mut tmp_name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let file = File::create(&tmp_path).into_app_err_with(|| format!("unable to create '{}'", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc).into_app_err_with(|| format!("unable to write '{}'", tmp_path.display()))?;
    writer
        .flush()
        .into_app_err_with(|| format!("unable to flush '{}'", tmp_path.display()))?;
    drop(writer);

    fs::rename(&tmp_path, path).into_app_err_with(|| format!("unable to replace catalog '{}'", path.display()))
}

#[async_trait]
impl RepositoryManager for JsonCatalog {
    async fn list(&self) -> Result<Vec<Repository>> {
        Ok(self.lock().values().map(|r| r.repository.clone()).collect())
    }

    async fn get_metadata(&self, location: &str) -> Result<RepositoryMetadata> {
        load_metadata(self.http.as_ref(), location).await
    }

    async fn set_verified_publisher(&self, cancel: &CancellationToken, id: RepositoryId, verified: bool) -> Result<()> {
        if cancel.is_cancelled() {
            bail!("cancelled before updating repository {id}");
        }
        self.with_record(id, |r| r.repository.verified_publisher = verified)
    }

    async fn update_digest(&self, id: RepositoryId, digest: &str) -> Result<()> {
        self.with_record(id, |r| r.repository.digest = Some(digest.to_string()))
    }

    async fn set_last_tracking_results(&self, id: RepositoryId, errors: &[String]) -> Result<()> {
        self.with_record(id, |r| {
            r.last_tracking_ts = Some(Utc::now());
            r.last_tracking_errors = errors.to_vec();
        })
    }
}

#[async_trait]
impl PackageManager for JsonCatalog {
    async fn registered_packages(&self, repository_id: RepositoryId) -> Result<HashMap<PackageKey, String>> {
        self.with_record(repository_id, |r| r.packages.values().map(|p| (p.key(), p.digest.clone())).collect())
    }

    async fn register(&self, package: Package) -> Result<()> {
        let key = package.key().to_string();
        self.with_record(package.repository_id, |r| {
            let _ = r.packages.insert(key, package);
        })
    }

    async fn unregister(&self, repository_id: RepositoryId, key: &PackageKey) -> Result<()> {
        self.with_record(repository_id, |r| r.packages.remove(&key.to_string()))?
            .map(|_| ())
            .into_app_err_with(|| format!("package '{key}' is not registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::RepositoryKind;
    use crate::infra::ReqwestGetter;
    use core::time::Duration;
    use semver::Version;
    use url::Url;

    fn http() -> Arc<dyn HttpGetter> {
        Arc::new(ReqwestGetter::new("hubtrack-test", Duration::from_secs(5)).unwrap())
    }

    fn repo(name: &str) -> Repository {
        Repository::new(name, RepositoryKind::Helm, Url::parse("https://charts.example.com/").unwrap())
    }

    #[tokio::test]
    async fn packages_can_be_registered_and_unregistered() {
        let r = repo("stable");
        let catalog = JsonCatalog::in_memory(http(), vec![r.clone()]);

        let package = Package::new(r.id, "nginx", Version::new(1, 0, 0), "d1");
        catalog.register(package.clone()).await.unwrap();

        let registered = catalog.registered_packages(r.id).await.unwrap();
        assert_eq!(registered.get(&package.key()).map(String::as_str), Some("d1"));

        catalog.unregister(r.id, &package.key()).await.unwrap();
        assert!(catalog.packages(r.id).is_empty());
        let _ = catalog.unregister(r.id, &package.key()).await.unwrap_err();
    }

    #[tokio::test]
    async fn unknown_repositories_are_errors() {
        let catalog = JsonCatalog::in_memory(http(), Vec::new());
        let _ = catalog.update_digest(RepositoryId::new_v4(), "d").await.unwrap_err();
        let _ = catalog.registered_packages(RepositoryId::new_v4()).await.unwrap_err();
    }

    #[tokio::test]
    async fn verified_publisher_respects_cancellation() {
        let r = repo("stable");
        let catalog = JsonCatalog::in_memory(http(), vec![r.clone()]);
        let cancel = CancellationToken::new();

        catalog.set_verified_publisher(&cancel, r.id, true).await.unwrap();
        assert!(catalog.repository(r.id).unwrap().verified_publisher);

        cancel.cancel();
        let _ = catalog.set_verified_publisher(&cancel, r.id, false).await.unwrap_err();
        assert!(catalog.repository(r.id).unwrap().verified_publisher);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let catalog = JsonCatalog::in_memory(http(), vec![repo("stable")]);
        let _ = catalog.add_repository(repo("stable")).unwrap_err();
        catalog.add_repository(repo("incubator")).unwrap();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn saved_state_survives_reopening() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data").join("catalog.json");
        let r = repo("stable");

        {
            let catalog = JsonCatalog::open(&path, http()).await.unwrap();
            catalog.add_repository(r.clone()).unwrap();
            catalog.register(Package::new(r.id, "nginx", Version::new(1, 0, 0), "d1")).await.unwrap();
            catalog.update_digest(r.id, "index-digest").await.unwrap();
            catalog.set_last_tracking_results(r.id, &["boom".to_string()]).await.unwrap();
            catalog.save().unwrap();
        }

        let reopened = JsonCatalog::open(&path, http()).await.unwrap();
        let stored = reopened.repository(r.id).unwrap();
        assert_eq!(stored.digest.as_deref(), Some("index-digest"));
        assert_eq!(reopened.packages(r.id).len(), 1);
        let (_, errors) = reopened.last_tracking(r.id).unwrap();
        assert_eq!(errors, vec!["boom".to_string()]);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn corrupt_catalogs_fail_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();
        let _ = JsonCatalog::open(&path, http()).await.unwrap_err();
    }
}
