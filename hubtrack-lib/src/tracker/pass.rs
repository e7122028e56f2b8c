//! The tracking pass shared by every repository kind.

use super::verified_publisher::set_verified_publisher_flag;
use super::{Completion, Services, Tracker, TrackerSettings};
use crate::Result;
use crate::hub::{Package, Repository, RepositoryMetadata};
use crate::sources::PackageSource;
use async_trait::async_trait;
use ohno::{EnrichableExt, IntoAppError, app_err};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

const LOG_TARGET: &str = "     tracker";

/// Tracks one repository using a kind-specific [`PackageSource`].
///
/// A pass proceeds as follows:
///
/// 1. Ask the source for the remote digest and stop early when it matches the
///    digest stored by the last successful pass.
/// 2. Load the packages the source currently publishes.
/// 3. Fetch the repository metadata once and reconcile the verified-publisher flag.
/// 4. Register new or changed package versions, skipping ignored ones.
/// 5. Unregister versions that disappeared or became ignored.
/// 6. Store the new digest, unless some package failed along the way.
///
/// Failures of steps 1 to 3 abort the pass. Failures affecting a single
/// package are recorded and the pass moves on.
///
/// The digest of a chart repository covers only `index.yaml`, so a change to
/// its `artifacthub-repo.yml` alone is picked up on the next pass that finds
/// a new index, or on any pass run with the digest check bypassed.
#[derive(Debug)]
pub struct RepositoryTracker<S> {
    svc: Arc<Services>,
    repository: Repository,
    source: S,
    settings: TrackerSettings,
}

impl<S: PackageSource> RepositoryTracker<S> {
    #[must_use]
    pub fn new(svc: Arc<Services>, repository: Repository, source: S) -> Self {
        let settings = TrackerSettings::from_config(svc.config());
        Self {
            svc,
            repository,
            source,
            settings,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let Self {
            svc,
            repository,
            source,
            settings,
        } = self;
        let svc = &**svc;

        ensure_active(svc)?;
        let remote_digest = source.remote_digest(svc, repository).await?;
        if !settings.bypass_digest_check && remote_digest.is_some() && remote_digest == repository.digest {
            log::info!(target: LOG_TARGET, "Repository '{}' is unchanged since the last pass", repository.name);
            return Ok(());
        }

        let errors_before = svc.errors().count_for(repository.id);
        ensure_active(svc)?;
        let snapshot = source.load(svc, repository).await?;

        ensure_active(svc)?;
        let metadata = set_verified_publisher_flag(svc, repository, &snapshot.metadata_location).await?;

        let registered = svc
            .package_manager()
            .registered_packages(repository.id)
            .await
            .map_err(|e| e.enrich_with(|| format!("listing packages registered for repository '{}'", repository.name)))?;

        let mut available = HashSet::with_capacity(snapshot.packages.len());
        let mut registrations = 0_usize;

        for package in snapshot.packages {
            ensure_active(svc)?;

            if is_ignored(metadata.as_ref(), &package) {
                log::debug!(target: LOG_TARGET, "Ignoring package '{}' of repository '{}'", package.key(), repository.name);
                continue;
            }

            let key = package.key();
            let unchanged = registered.get(&key).is_some_and(|digest| *digest == package.digest);
            let _ = available.insert(key);
            if unchanged {
                continue;
            }

            if register_package(svc, repository, package).await {
                registrations += 1;
            }
        }

        let mut removals = 0_usize;
        for key in registered.keys().filter(|key| !available.contains(*key)) {
            ensure_active(svc)?;

            match svc.package_manager().unregister(repository.id, key).await {
                Ok(()) => removals += 1,
                Err(e) => svc.errors().append(repository.id, e.enrich_with(|| format!("unregistering package '{key}'"))),
            }
        }

        log::debug!(
            target: LOG_TARGET,
            "Repository '{}': {registrations} packages registered, {removals} unregistered",
            repository.name
        );

        let had_item_errors = svc.errors().count_for(repository.id) > errors_before;
        if let Some(digest) = remote_digest
            && !had_item_errors
            && repository.digest.as_deref() != Some(digest.as_str())
        {
            svc.repository_manager()
                .update_digest(repository.id, &digest)
                .await
                .map_err(|e| e.enrich_with(|| format!("updating digest of repository '{}'", repository.name)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl<S: PackageSource + 'static> Tracker for RepositoryTracker<S> {
    fn repository(&self) -> &Repository {
        &self.repository
    }

    fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut TrackerSettings {
        &mut self.settings
    }

    async fn track(mut self: Box<Self>, done: Completion) -> Result<()> {
        let svc = Arc::clone(&self.svc);
        let id = self.repository.id;
        let name = self.repository.name.clone();
        let timeout = self.settings.timeout;
        let start = Instant::now();

        log::info!(target: LOG_TARGET, "Tracking repository '{name}'");

        let result = tokio::select! {
            biased;
            () = svc.cancellation().cancelled() => Err(app_err!("tracking of repository '{name}' was cancelled")),
            outcome = tokio::time::timeout(timeout, self.run()) => match outcome {
                Ok(result) => result,
                Err(_) => Err(app_err!("tracking of repository '{name}' timed out after {timeout:?}")),
            },
        };

        match &result {
            Ok(()) => log::info!(target: LOG_TARGET, "Finished tracking repository '{name}' in {:.3}s", start.elapsed().as_secs_f64()),
            Err(e) => {
                log::error!(target: LOG_TARGET, "Tracking repository '{name}' failed: {e:#}");
                svc.errors().append(id, e);
            }
        }

        done.done();
        result
    }
}

fn ensure_active(svc: &Services) -> Result<()> {
    if svc.cancellation().is_cancelled() {
        return Err(app_err!("tracking cancelled"));
    }
    Ok(())
}

fn is_ignored(metadata: Option<&RepositoryMetadata>, package: &Package) -> bool {
    metadata.is_some_and(|md| md.ignores(&package.name, &package.version.to_string()))
}

/// Registers one package version, recording any failure. Returns whether it was registered.
async fn register_package(svc: &Services, repository: &Repository, mut package: Package) -> bool {
    let key = package.key();

    if let Some(logo_url) = package.logo_url.clone() {
        match store_logo(svc, &logo_url).await {
            Ok(image_id) => package.logo_image_id = Some(image_id),
            Err(e) => {
                svc.errors()
                    .append(repository.id, e.enrich_with(|| format!("storing logo of package '{key}'")));
            }
        }
    }

    match svc.package_manager().register(package).await {
        Ok(()) => {
            log::debug!(target: LOG_TARGET, "Registered package '{key}' of repository '{}'", repository.name);
            true
        }
        Err(e) => {
            svc.errors().append(repository.id, e.enrich_with(|| format!("registering package '{key}'")));
            false
        }
    }
}

async fn store_logo(svc: &Services, url: &url::Url) -> Result<String> {
    let response = svc.http().get(url).await?;
    let data = response.bytes().await.into_app_err_with(|| format!("reading logo from '{url}'"))?;
    svc.image_store().save_image(data).await
}
