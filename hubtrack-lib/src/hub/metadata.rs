use super::{HttpGetter, RepositoryId};
use crate::Result;
use ohno::{IntoAppError, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = "    metadata";

/// Name of the metadata file publishers place at the root of their repository.
pub const METADATA_FILE: &str = "artifacthub-repo.yml";

/// Publisher-controlled metadata describing a repository.
///
/// The `repositoryID` field is how a publisher proves ownership: when it matches
/// the catalog's identifier for the repository, the repository is considered to
/// come from a verified publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    #[serde(rename = "repositoryID", default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<Owner>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<IgnoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

/// A rule excluding packages from tracking.
///
/// `version` is an unanchored regular expression; when absent, every version
/// of the named package is excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RepositoryMetadata {
    /// Parses and validates a metadata document.
    pub fn parse(text: &str) -> Result<Self> {
        let md: Self = serde_yaml::from_str(text).into_app_err("parsing repository metadata")?;
        md.validate()?;
        Ok(md)
    }

    fn validate(&self) -> Result<()> {
        for owner in &self.owners {
            if owner.email.trim().is_empty() {
                bail!("repository metadata owner entries must carry an email");
            }
        }

        for entry in &self.ignore {
            if entry.name.trim().is_empty() {
                bail!("repository metadata ignore entries must carry a package name");
            }
        }

        Ok(())
    }

    /// Whether this metadata claims the given repository.
    #[must_use]
    pub fn claims(&self, id: RepositoryId) -> bool {
        self.repository_id == Some(id)
    }

    /// Whether the given package version is excluded by an ignore rule.
    #[must_use]
    pub fn ignores(&self, name: &str, version: &str) -> bool {
        self.ignore.iter().any(|entry| entry.matches(name, version))
    }
}

impl IgnoreEntry {
    fn matches(&self, name: &str, version: &str) -> bool {
        if self.name != name {
            return false;
        }

        let Some(pattern) = &self.version else {
            return true;
        };

        match Regex::new(pattern) {
            Ok(re) => re.is_match(version),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Ignoring invalid version pattern '{pattern}' for package '{name}': {e}");
                false
            }
        }
    }
}

/// Loads repository metadata from a local path or an http(s) URL.
pub async fn load_metadata(http: &dyn HttpGetter, location: &str) -> Result<RepositoryMetadata> {
    let text = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            log::debug!(target: LOG_TARGET, "Fetching metadata from '{url}'");
            let response = http.get(&url).await?;
            response
                .text()
                .await
                .into_app_err_with(|| format!("reading metadata from '{url}'"))?
        }
        _ => {
            log::debug!(target: LOG_TARGET, "Reading metadata from '{location}'");
            tokio::fs::read_to_string(location)
                .await
                .into_app_err_with(|| format!("reading metadata from '{location}'"))?
        }
    };

    RepositoryMetadata::parse(&text)
}
