use clap::ValueEnum;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};
use url::Url;
use uuid::Uuid;

/// Stable identifier of a repository in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(Uuid);

impl RepositoryId {
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RepositoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RepositoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The kinds of repositories hubtrack knows how to track.
///
/// Only Helm repositories publish a chart index; every other kind is a git
/// repository holding one `artifacthub-pkg.yml` file per package version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum, StrumDisplay, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum RepositoryKind {
    Helm,
    HelmPlugin,
    Falco,
    Opa,
    Olm,
    TektonTask,
    Krew,
    KedaScaler,
    Kyverno,
    Generic,
}

impl RepositoryKind {
    /// Whether repositories of this kind are served as a chart index over HTTP.
    #[must_use]
    pub const fn is_chart_index(self) -> bool {
        matches!(self, Self::Helm)
    }
}

/// A repository record as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub kind: RepositoryKind,
    pub url: Url,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default)]
    pub verified_publisher: bool,

    /// Digest of the remote content observed by the last successful pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Repository {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RepositoryKind, url: Url) -> Self {
        Self {
            id: RepositoryId::new_v4(),
            name: name.into(),
            kind,
            url,
            branch: None,
            verified_publisher: false,
            digest: None,
        }
    }
}
