//! Reconciliation of a repository's verified-publisher flag.

use super::Services;
use crate::Result;
use crate::hub::{Repository, RepositoryId, RepositoryMetadata};
use ohno::EnrichableExt;

const LOG_TARGET: &str = "    verified";

/// Whether metadata proves the publisher owns the repository.
///
/// Missing metadata, or metadata without a repository identifier, never verifies.
#[must_use]
pub fn is_verified_publisher(id: RepositoryId, md: Option<&RepositoryMetadata>) -> bool {
    md.is_some_and(|md| md.claims(id))
}

/// Brings the stored flag in line with already-fetched metadata.
///
/// Persists only when the computed value differs from the repository record.
/// Returns whether a write happened.
pub async fn reconcile_verified_publisher(svc: &Services, repository: &Repository, md: Option<&RepositoryMetadata>) -> Result<bool> {
    let verified = is_verified_publisher(repository.id, md);
    if verified == repository.verified_publisher {
        return Ok(false);
    }

    svc.repository_manager()
        .set_verified_publisher(svc.cancellation(), repository.id, verified)
        .await
        .map_err(|e| e.enrich("error setting verified publisher flag"))?;

    log::info!(
        target: LOG_TARGET,
        "Repository '{}' is {} a verified publisher",
        repository.name,
        if verified { "now" } else { "no longer" }
    );

    Ok(true)
}

/// Fetches the metadata at `md_file` and reconciles the flag against it.
///
/// Metadata that cannot be fetched or parsed counts as absent, so a repository
/// that loses its metadata loses its verified status. Only a failure to
/// persist a changed flag is an error. The fetched metadata is handed back so
/// the caller can apply its ignore rules without fetching it again.
pub async fn set_verified_publisher_flag(svc: &Services, repository: &Repository, md_file: &str) -> Result<Option<RepositoryMetadata>> {
    let md = fetch_metadata(svc, repository, md_file).await;
    let _ = reconcile_verified_publisher(svc, repository, md.as_ref()).await?;
    Ok(md)
}

async fn fetch_metadata(svc: &Services, repository: &Repository, md_file: &str) -> Option<RepositoryMetadata> {
    match svc.repository_manager().get_metadata(md_file).await {
        Ok(md) => Some(md),
        Err(e) => {
            log::debug!(target: LOG_TARGET, "No usable metadata for repository '{}' at '{md_file}': {e:#}", repository.name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{RepositoryKind, RepositoryManager};
    use crate::tracker::testing::{FakeRepositoryManager, services_with};
    use std::sync::Arc;
    use url::Url;

    fn repository(verified: bool) -> Repository {
        let mut repo = Repository::new("charts", RepositoryKind::Helm, Url::parse("https://charts.example.com/").unwrap());
        repo.verified_publisher = verified;
        repo
    }

    #[test]
    fn verification_requires_matching_identifier() {
        let id = RepositoryId::new_v4();
        let mine = RepositoryMetadata {
            repository_id: Some(id),
            ..RepositoryMetadata::default()
        };
        let theirs = RepositoryMetadata {
            repository_id: Some(RepositoryId::new_v4()),
            ..RepositoryMetadata::default()
        };

        assert!(is_verified_publisher(id, Some(&mine)));
        assert!(!is_verified_publisher(id, Some(&theirs)));
        assert!(!is_verified_publisher(id, Some(&RepositoryMetadata::default())));
        assert!(!is_verified_publisher(id, None));
    }

    #[tokio::test]
    async fn missing_metadata_on_unverified_repository_writes_nothing() {
        let repo = repository(false);
        let rm = Arc::new(FakeRepositoryManager::new(vec![repo.clone()]));
        let svc = services_with(Arc::clone(&rm));

        let md = set_verified_publisher_flag(&svc, &repo, "missing.yml").await.unwrap();
        assert!(md.is_none());
        assert_eq!(rm.verified_writes(), 0);
    }

    #[tokio::test]
    async fn matching_metadata_verifies_once() {
        let repo = repository(false);
        let rm = Arc::new(FakeRepositoryManager::new(vec![repo.clone()]));
        rm.put_metadata("md.yml", Some(repo.id));
        let svc = services_with(Arc::clone(&rm));

        let md = set_verified_publisher_flag(&svc, &repo, "md.yml").await.unwrap();
        assert_eq!(md.and_then(|md| md.repository_id), Some(repo.id));
        assert_eq!(rm.verified_writes(), 1);
        assert_eq!(rm.verified_flag(repo.id), Some(true));
    }

    #[tokio::test]
    async fn foreign_metadata_unverifies() {
        let repo = repository(true);
        let rm = Arc::new(FakeRepositoryManager::new(vec![repo.clone()]));
        rm.put_metadata("md.yml", Some(RepositoryId::new_v4()));
        let svc = services_with(Arc::clone(&rm));

        let _ = set_verified_publisher_flag(&svc, &repo, "md.yml").await.unwrap();
        assert_eq!(rm.verified_writes(), 1);
        assert_eq!(rm.verified_flag(repo.id), Some(false));
    }

    #[tokio::test]
    async fn unchanged_flag_is_not_rewritten() {
        let repo = repository(true);
        let rm = Arc::new(FakeRepositoryManager::new(vec![repo.clone()]));
        rm.put_metadata("md.yml", Some(repo.id));
        let svc = services_with(Arc::clone(&rm));

        let _ = set_verified_publisher_flag(&svc, &repo, "md.yml").await.unwrap();
        assert_eq!(rm.verified_writes(), 0);
    }

    #[tokio::test]
    async fn reconciling_again_after_reread_writes_nothing() {
        let repo = repository(false);
        let rm = Arc::new(FakeRepositoryManager::new(vec![repo.clone()]));
        let md = RepositoryMetadata {
            repository_id: Some(repo.id),
            ..RepositoryMetadata::default()
        };
        let svc = services_with(Arc::clone(&rm));

        assert!(reconcile_verified_publisher(&svc, &repo, Some(&md)).await.unwrap());

        let reread = rm.list().await.unwrap().into_iter().find(|r| r.id == repo.id).unwrap();
        assert!(reread.verified_publisher);
        assert!(!reconcile_verified_publisher(&svc, &reread, Some(&md)).await.unwrap());
        assert_eq!(rm.verified_writes(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported() {
        let repo = repository(false);
        let rm = Arc::new(FakeRepositoryManager::new(vec![repo.clone()]).failing_verified_writes());
        rm.put_metadata("md.yml", Some(repo.id));
        let svc = services_with(Arc::clone(&rm));

        let err = set_verified_publisher_flag(&svc, &repo, "md.yml").await.unwrap_err();
        assert!(format!("{err:#}").contains("simulated write failure"));
        assert_eq!(rm.verified_flag(repo.id), Some(false));
    }
}
