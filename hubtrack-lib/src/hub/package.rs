use super::RepositoryId;
use core::fmt::{Display, Formatter};
use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifies one version of a package within a repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageKey {
    pub name: String,
    pub version: Version,
}

impl PackageKey {
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self { name: name.into(), version }
    }
}

impl Display for PackageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A package version as registered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub repository_id: RepositoryId,
    pub name: String,
    pub version: Version,

    /// Digest of the package's source content, used to skip unchanged versions.
    pub digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<Url>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image_id: Option<String>,

    #[serde(default)]
    pub deprecated: bool,
}

impl Package {
    #[must_use]
    pub fn new(repository_id: RepositoryId, name: impl Into<String>, version: Version, digest: impl Into<String>) -> Self {
        Self {
            repository_id,
            name: name.into(),
            version,
            digest: digest.into(),
            display_name: None,
            description: None,
            app_version: None,
            logo_url: None,
            logo_image_id: None,
            deprecated: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.name.clone(), self.version.clone())
    }
}
