use crate::Result;
use crate::hub::{ChartIndex, HttpGetter, IndexLoader, LoadedIndex, Repository};
use async_trait::async_trait;
use ohno::IntoAppError;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

const LOG_TARGET: &str = "       index";

/// Loads `index.yaml` from a chart repository over HTTP.
///
/// The digest is the SHA-256 of the raw index bytes, so any change to the
/// index, including reordering, marks the repository as changed.
pub struct HttpIndexLoader {
    http: Arc<dyn HttpGetter>,
}

impl core::fmt::Debug for HttpIndexLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpIndexLoader").field("http", &"<dyn HttpGetter>").finish()
    }
}

impl HttpIndexLoader {
    #[must_use]
    pub fn new(http: Arc<dyn HttpGetter>) -> Self {
        Self { http }
    }
}

fn index_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("index.yaml").into_app_err_with(|| format!("building index URL from '{base}'"))
}

#[async_trait]
impl IndexLoader for HttpIndexLoader {
    async fn load_index(&self, repository: &Repository) -> Result<LoadedIndex> {
        let url = index_url(&repository.url)?;
        let response = self.http.get(&url).await?;
        let bytes = response.bytes().await.into_app_err_with(|| format!("reading '{url}'"))?;

        let digest = hex::encode(Sha256::digest(&bytes));
        let index = ChartIndex::parse(&bytes)?;

        log::debug!(target: LOG_TARGET, "Loaded index of '{}' ({} versions, digest {digest})", repository.name, index.version_count());

        Ok(LoadedIndex { index, digest })
    }
}
