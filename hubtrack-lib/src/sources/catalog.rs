use super::{PackageSource, SourceSnapshot};
use crate::Result;
use crate::hub::{METADATA_FILE, Package, Repository, RepositoryId};
use crate::tracker::Services;
use async_trait::async_trait;
use ohno::{EnrichableExt, IntoAppError};
use semver::Version;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

const LOG_TARGET: &str = "     catalog";

/// Name of the per-version package description file in git catalogs.
pub const PACKAGE_METADATA_FILE: &str = "artifacthub-pkg.yml";

/// Discovers packages in a git repository laid out as a package catalog.
///
/// Every directory holding an `artifacthub-pkg.yml` file describes one
/// package version. The remote digest is the revision the tracked branch
/// points at, so an unchanged branch skips the clone entirely.
#[derive(Debug, Default)]
pub struct GitCatalogSource;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageFile {
    name: String,
    version: String,

    #[serde(default)]
    display_name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    app_version: Option<String>,

    #[serde(default, rename = "logoURL")]
    logo_url: Option<Url>,

    #[serde(default)]
    deprecated: bool,
}

#[async_trait]
impl PackageSource for GitCatalogSource {
    async fn remote_digest(&mut self, svc: &Services, repository: &Repository) -> Result<Option<String>> {
        let revision = svc
            .cloner()
            .head_revision(repository)
            .await
            .map_err(|e| e.enrich_with(|| format!("resolving head revision of repository '{}'", repository.name)))?;
        Ok(Some(revision))
    }

    async fn load(&mut self, svc: &Services, repository: &Repository) -> Result<SourceSnapshot> {
        let checkout = svc
            .cloner()
            .clone_repository(repository)
            .await
            .map_err(|e| e.enrich_with(|| format!("cloning repository '{}'", repository.name)))?;

        let root = checkout.path().to_path_buf();
        let id = repository.id;
        let results = tokio::task::spawn_blocking(move || discover_packages(&root, id))
            .await
            .into_app_err("package discovery task panicked")?;

        let mut packages = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(package) => packages.push(package),
                Err(e) => svc.errors().append(id, e),
            }
        }

        log::debug!(target: LOG_TARGET, "Found {} package versions in repository '{}'", packages.len(), repository.name);

        let metadata_location = checkout.path().join(METADATA_FILE).to_string_lossy().into_owned();
        Ok(SourceSnapshot::new(metadata_location, packages).with_checkout(checkout))
    }
}

fn discover_packages(root: &Path, repository_id: RepositoryId) -> Vec<Result<Package>> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    let mut results = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && entry.file_name() == PACKAGE_METADATA_FILE => {
                results.push(read_package(entry.path(), root, repository_id));
            }
            Ok(_) => {}
            Err(e) => results.push(Err(e).into_app_err("walking repository checkout")),
        }
    }

    results
}

fn read_package(path: &Path, root: &Path, repository_id: RepositoryId) -> Result<Package> {
    let relative: PathBuf = path.strip_prefix(root).map_or_else(|_| path.to_path_buf(), Path::to_path_buf);

    let bytes = std::fs::read(path).into_app_err_with(|| format!("reading '{}'", relative.display()))?;
    let file: PackageFile = serde_yaml::from_slice(&bytes).into_app_err_with(|| format!("parsing '{}'", relative.display()))?;

    let version = Version::parse(file.version.trim_start_matches('v'))
        .into_app_err_with(|| format!("invalid version '{}' for package '{}' in '{}'", file.version, file.name, relative.display()))?;

    let mut package = Package::new(repository_id, file.name, version, hex::encode(Sha256::digest(&bytes)));
    package.display_name = file.display_name;
    package.description = file.description;
    package.app_version = file.app_version;
    package.logo_url = file.logo_url;
    package.deprecated = file.deprecated;
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call mkdir")]
    fn discovers_every_package_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plugins/a/1.0.0/artifacthub-pkg.yml", "name: a\nversion: 1.0.0\ndisplayName: Plugin A\n");
        write(dir.path(), "plugins/a/1.1.0/artifacthub-pkg.yml", "name: a\nversion: v1.1.0\nlogoURL: https://example.com/a.png\n");
        write(dir.path(), "plugins/b/0.1.0/artifacthub-pkg.yml", "name: b\nversion: 0.1.0\ndeprecated: true\n");
        write(dir.path(), ".git/artifacthub-pkg.yml", "name: hidden\nversion: 9.9.9\n");
        write(dir.path(), "README.md", "# catalog\n");

        let id = RepositoryId::new_v4();
        let packages: Vec<_> = discover_packages(dir.path(), id).into_iter().map(Result::unwrap).collect();

        assert_eq!(packages.len(), 3);
        assert!(packages.iter().all(|p| p.repository_id == id));
        assert_eq!(packages[0].display_name.as_deref(), Some("Plugin A"));
        assert_eq!(packages[1].version, Version::new(1, 1, 0));
        assert!(packages[1].logo_url.is_some());
        assert!(packages[2].deprecated);
        assert!(!packages.iter().any(|p| p.name == "hidden"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call mkdir")]
    fn digest_tracks_file_content() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/artifacthub-pkg.yml", "name: a\nversion: 1.0.0\n");
        let id = RepositoryId::new_v4();
        let before = discover_packages(dir.path(), id).pop().unwrap().unwrap().digest;

        write(dir.path(), "a/artifacthub-pkg.yml", "name: a\nversion: 1.0.0\ndescription: new\n");
        let after = discover_packages(dir.path(), id).pop().unwrap().unwrap().digest;

        assert_eq!(before.len(), 64);
        assert_ne!(before, after);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call mkdir")]
    fn bad_files_are_reported_individually() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good/artifacthub-pkg.yml", "name: good\nversion: 1.0.0\n");
        write(dir.path(), "bad-version/artifacthub-pkg.yml", "name: bad\nversion: latest\n");
        write(dir.path(), "bad-yaml/artifacthub-pkg.yml", "name: [\n");

        let results = discover_packages(dir.path(), RepositoryId::new_v4());
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    }
}
