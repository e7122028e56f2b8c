use super::{PackageSource, SourceSnapshot};
use crate::Result;
use crate::hub::{ChartVersion, LoadedIndex, METADATA_FILE, Package, Repository, RepositoryId};
use crate::tracker::Services;
use async_trait::async_trait;
use ohno::{EnrichableExt, IntoAppError};
use semver::Version;
use sha2::{Digest, Sha256};
use url::Url;

const LOG_TARGET: &str = "        helm";

/// Discovers charts listed in a repository's `index.yaml`.
///
/// The index is fetched once per pass: computing the remote digest loads it,
/// and the subsequent [`PackageSource::load`] reuses what was fetched.
#[derive(Debug, Default)]
pub struct ChartIndexSource {
    loaded: Option<LoadedIndex>,
}

impl ChartIndexSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(svc: &Services, repository: &Repository) -> Result<LoadedIndex> {
        svc.index_loader()
            .load_index(repository)
            .await
            .map_err(|e| e.enrich_with(|| format!("loading index of repository '{}'", repository.name)))
    }
}

#[async_trait]
impl PackageSource for ChartIndexSource {
    async fn remote_digest(&mut self, svc: &Services, repository: &Repository) -> Result<Option<String>> {
        let loaded = Self::fetch(svc, repository).await?;
        let digest = loaded.digest.clone();
        self.loaded = Some(loaded);
        Ok(Some(digest))
    }

    async fn load(&mut self, svc: &Services, repository: &Repository) -> Result<SourceSnapshot> {
        let loaded = match self.loaded.take() {
            Some(loaded) => loaded,
            None => Self::fetch(svc, repository).await?,
        };

        let mut packages = Vec::with_capacity(loaded.index.version_count());
        for (name, versions) in loaded.index.entries {
            for chart in versions {
                match chart_to_package(repository.id, &name, chart) {
                    Ok(package) => packages.push(package),
                    Err(e) => svc.errors().append(repository.id, e),
                }
            }
        }

        log::debug!(target: LOG_TARGET, "Found {} chart versions in repository '{}'", packages.len(), repository.name);

        Ok(SourceSnapshot::new(metadata_url(&repository.url), packages))
    }
}

/// Location of the metadata file published next to the index.
fn metadata_url(base: &Url) -> String {
    format!("{}/{METADATA_FILE}", base.as_str().trim_end_matches('/'))
}

fn chart_to_package(repository_id: RepositoryId, entry_name: &str, chart: ChartVersion) -> Result<Package> {
    let name = if chart.name.is_empty() { entry_name.to_string() } else { chart.name.clone() };

    let version = Version::parse(chart.version.trim_start_matches('v'))
        .into_app_err_with(|| format!("invalid version '{}' for chart '{name}'", chart.version))?;

    let digest = match &chart.digest {
        Some(digest) if !digest.is_empty() => digest.clone(),
        _ => {
            let bytes = serde_json::to_vec(&chart).into_app_err("serializing chart entry")?;
            hex::encode(Sha256::digest(&bytes))
        }
    };

    let logo_url = chart.icon.as_deref().and_then(|icon| match Url::parse(icon) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => {
            log::debug!(target: LOG_TARGET, "Ignoring unusable icon '{icon}' for chart '{name}'");
            None
        }
    });

    let mut package = Package::new(repository_id, name, version, digest);
    package.description = chart.description;
    package.app_version = chart.app_version;
    package.logo_url = logo_url;
    package.deprecated = chart.deprecated;
    Ok(package)
}
