use super::Host;
use super::common::{ColorMode, http_getter, load_config, open_catalog};
use crate::Result;
use crate::hub::RepositoryManager;
use camino::Utf8PathBuf;
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Path to configuration file (default is `hubtrack.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,
}

pub async fn list_repositories<H: Host>(host: &mut H, args: &ListArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let catalog = open_catalog(&config, http_getter(&config)?).await?;
    let use_colors = args.color.for_stdout();

    let repositories = catalog.list().await?;
    if repositories.is_empty() {
        let _ = writeln!(host.output(), "No repositories in '{}'", config.catalog_path.display());
        return Ok(());
    }

    for repository in repositories {
        let status = match catalog.last_tracking(repository.id) {
            None => "never tracked".to_string(),
            Some((ts, errors)) if errors.is_empty() => format!("ok at {}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
            Some((ts, errors)) => {
                let text = format!("{} error(s) at {}", errors.len(), ts.format("%Y-%m-%d %H:%M:%S UTC"));
                if use_colors { text.red().to_string() } else { text }
            }
        };

        let verified = if repository.verified_publisher { ", verified publisher" } else { "" };
        let _ = writeln!(
            host.output(),
            "{} [{}] {} ({} packages{verified}): {status}",
            repository.name,
            repository.kind,
            repository.url,
            catalog.packages(repository.id).len()
        );
    }

    Ok(())
}
