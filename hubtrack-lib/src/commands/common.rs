//! Settings shared by the commands.

use crate::Result;
use crate::config::Config;
use crate::hub::HttpGetter;
use crate::infra::{JsonCatalog, ReqwestGetter};
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use core::time::Duration;
use std::io::IsTerminal;
use std::sync::Arc;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Whether to emit colors on a stream whose terminal-ness is `is_terminal`.
    #[must_use]
    pub const fn enabled(self, is_terminal: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => is_terminal,
        }
    }

    #[must_use]
    pub fn for_stdout(self) -> bool {
        self.enabled(std::io::stdout().is_terminal())
    }

    #[must_use]
    pub fn for_stderr(self) -> bool {
        self.enabled(std::io::stderr().is_terminal())
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

impl LogLevel {
    /// How long the progress bar stays hidden.
    ///
    /// When logging is on the bar would fight with log lines, so it never shows.
    #[must_use]
    pub const fn progress_delay(self) -> Duration {
        match self {
            Self::None => Duration::from_millis(300),
            _ => Duration::from_hours(365 * 24),
        }
    }
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a logger may already be installed when commands run more than once in a process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

/// Loads the configuration from the working directory or an explicit path.
pub fn load_config(config_path: Option<&Utf8PathBuf>) -> Result<Config> {
    Config::load(Utf8Path::new("."), config_path)
}

/// Builds the shared HTTP getter described by the configuration.
pub fn http_getter(config: &Config) -> Result<Arc<dyn HttpGetter>> {
    Ok(Arc::new(ReqwestGetter::new(&config.user_agent, config.http_timeout)?))
}

/// Opens the catalog named by the configuration, taking its lock.
pub async fn open_catalog(config: &Config, http: Arc<dyn HttpGetter>) -> Result<Arc<JsonCatalog>> {
    Ok(Arc::new(JsonCatalog::open(config.catalog_path.clone(), http).await?))
}
