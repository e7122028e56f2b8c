use crate::Result;
use crate::hub::{Repository, RepositoryKind};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../default_config.toml");

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "hubtrack.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum number of repositories tracked at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound on the time spent tracking a single repository
    #[serde(default = "default_repository_timeout", with = "humantime_serde")]
    pub repository_timeout: Duration,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub http_timeout: Duration,

    /// Timeout applied to every git invocation
    #[serde(default = "default_clone_timeout", with = "humantime_serde")]
    pub clone_timeout: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Process repositories even when their remote digest is unchanged
    #[serde(default)]
    pub bypass_digest_check: bool,

    /// Only track repositories of these kinds; empty selects all kinds
    #[serde(default)]
    pub repository_kinds: Vec<RepositoryKind>,

    /// Only track repositories with these names; empty selects all repositories
    #[serde(default)]
    pub repository_names: Vec<String>,

    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

const fn default_concurrency() -> usize {
    10
}

const fn default_repository_timeout() -> Duration {
    Duration::from_mins(15)
}

const fn default_http_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_clone_timeout() -> Duration {
    Duration::from_mins(5)
}

fn default_user_agent() -> String {
    "hubtrack".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.json")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `hubtrack.toml` in `dir` is used when present.
    pub fn load(dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading hubtrack configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading hubtrack configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(app_err!("concurrency must be at least 1"));
        }

        for (name, value) in [
            ("repository_timeout", self.repository_timeout),
            ("http_timeout", self.http_timeout),
            ("clone_timeout", self.clone_timeout),
        ] {
            if value.is_zero() {
                return Err(app_err!("{name} must be greater than zero"));
            }
        }

        if self.user_agent.trim().is_empty() {
            return Err(app_err!("user_agent must not be empty"));
        }

        Ok(())
    }

    /// Whether a repository passes the kind and name filters.
    #[must_use]
    pub fn selects(&self, repository: &Repository) -> bool {
        (self.repository_kinds.is_empty() || self.repository_kinds.contains(&repository.kind))
            && (self.repository_names.is_empty() || self.repository_names.iter().any(|n| *n == repository.name))
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
