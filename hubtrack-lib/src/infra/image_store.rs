use crate::Result;
use crate::hub::ImageStore;
use async_trait::async_trait;
use bytes::Bytes;
use ohno::IntoAppError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "      images";

/// Stores images as files named by the SHA-256 of their content.
///
/// Saving the same bytes twice yields the same identifier and writes once.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    dir: PathBuf,
}

impl DirImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).into_app_err_with(|| format!("unable to create image directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path_of(&self, image_id: &str) -> PathBuf {
        self.dir.join(image_id)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for DirImageStore {
    async fn save_image(&self, data: Bytes) -> Result<String> {
        let image_id = hex::encode(Sha256::digest(&data));
        let path = self.path_of(&image_id);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            log::debug!(target: LOG_TARGET, "Image {image_id} already stored");
            return Ok(image_id);
        }

        tokio::fs::write(&path, &data)
            .await
            .into_app_err_with(|| format!("unable to write image '{}'", path.display()))?;
        log::debug!(target: LOG_TARGET, "Stored image {image_id} ({} bytes)", data.len());

        Ok(image_id)
    }
}
