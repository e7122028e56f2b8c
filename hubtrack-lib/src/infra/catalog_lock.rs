use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     catalog";

/// Guard that releases the catalog lock when dropped
#[derive(Debug)]
pub struct CatalogLockGuard(File);

impl Drop for CatalogLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not unlock catalog: {e:#}");
        }
    }
}

fn lock_path_for(catalog_path: &Path) -> PathBuf {
    let mut name = catalog_path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".lock");
    catalog_path.with_file_name(name)
}

/// Acquire an exclusive advisory lock on a catalog file.
///
/// Waits for any other hubtrack process working on the same catalog to finish.
pub async fn acquire_catalog_lock(catalog_path: &Path) -> Result<CatalogLockGuard> {
    let lock_path = lock_path_for(catalog_path);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening catalog lock file at '{}'", lock_path.display()))?;

    // lock_exclusive blocks, possibly for a long time
    let file = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on catalog at '{}'", lock_path.display()))?;
        log::debug!(target: LOG_TARGET, "Acquired catalog lock at '{}'", lock_path.display());
        Ok::<_, ohno::AppError>(file)
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(CatalogLockGuard(file))
}
