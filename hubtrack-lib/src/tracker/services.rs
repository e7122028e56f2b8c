use super::ErrorsCollector;
use crate::config::Config;
use crate::hub::{HttpGetter, ImageStore, IndexLoader, PackageManager, RepositoryCloner, RepositoryManager};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a tracker needs to do its work.
///
/// One instance is built per run and shared by every tracker through an
/// `Arc`. All collaborators are trait objects so tests can substitute fakes,
/// and all of them are safe to use from many trackers at once.
pub struct Services {
    cancel: CancellationToken,
    config: Arc<Config>,
    cloner: Arc<dyn RepositoryCloner>,
    repositories: Arc<dyn RepositoryManager>,
    packages: Arc<dyn PackageManager>,
    index_loader: Arc<dyn IndexLoader>,
    images: Arc<dyn ImageStore>,
    errors: Arc<ErrorsCollector>,
    http: Arc<dyn HttpGetter>,
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("config", &self.config)
            .field("cloner", &"<dyn RepositoryCloner>")
            .field("repositories", &"<dyn RepositoryManager>")
            .field("packages", &"<dyn PackageManager>")
            .field("index_loader", &"<dyn IndexLoader>")
            .field("images", &"<dyn ImageStore>")
            .field("errors", &self.errors)
            .field("http", &"<dyn HttpGetter>")
            .finish()
    }
}

impl Services {
    #[expect(clippy::too_many_arguments, reason = "one argument per collaborator, all required")]
    #[must_use]
    pub fn new(
        cancel: CancellationToken,
        config: Arc<Config>,
        cloner: Arc<dyn RepositoryCloner>,
        repositories: Arc<dyn RepositoryManager>,
        packages: Arc<dyn PackageManager>,
        index_loader: Arc<dyn IndexLoader>,
        images: Arc<dyn ImageStore>,
        errors: Arc<ErrorsCollector>,
        http: Arc<dyn HttpGetter>,
    ) -> Self {
        Self {
            cancel,
            config,
            cloner,
            repositories,
            packages,
            index_loader,
            images,
            errors,
            http,
        }
    }

    /// Fires when the run is being shut down.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn cloner(&self) -> &dyn RepositoryCloner {
        self.cloner.as_ref()
    }

    #[must_use]
    pub fn repository_manager(&self) -> &dyn RepositoryManager {
        self.repositories.as_ref()
    }

    #[must_use]
    pub fn package_manager(&self) -> &dyn PackageManager {
        self.packages.as_ref()
    }

    #[must_use]
    pub fn index_loader(&self) -> &dyn IndexLoader {
        self.index_loader.as_ref()
    }

    #[must_use]
    pub fn image_store(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorsCollector {
        &self.errors
    }

    #[must_use]
    pub fn http(&self) -> &dyn HttpGetter {
        self.http.as_ref()
    }
}
