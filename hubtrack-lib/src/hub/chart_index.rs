use crate::Result;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The `index.yaml` document served at the root of a chart repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartIndex {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

/// One published version of a chart.
///
/// The version is kept as text here. Charts whose versions are not valid
/// semver are reported per package rather than failing the whole index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default)]
    pub deprecated: bool,
}

impl ChartIndex {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(bytes).into_app_err("parsing chart repository index")
    }

    /// Number of chart versions listed across all entries.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
