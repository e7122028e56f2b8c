use super::Host;
use super::common::{http_getter, load_config, open_catalog};
use crate::Result;
use crate::hub::{Repository, RepositoryKind};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;
use url::Url;

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Unique name of the repository
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Kind of packages the repository holds
    #[arg(long, value_name = "KIND")]
    pub kind: RepositoryKind,

    /// Location of the repository
    #[arg(long, value_name = "URL")]
    pub url: Url,

    /// Branch to track, for git-hosted repositories
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Path to configuration file (default is `hubtrack.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

pub async fn add_repository<H: Host>(host: &mut H, args: &AddArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let catalog = open_catalog(&config, http_getter(&config)?).await?;

    let mut repository = Repository::new(args.name.clone(), args.kind, args.url.clone());
    repository.branch.clone_from(&args.branch);
    let id = repository.id;

    catalog.add_repository(repository)?;
    catalog.save()?;

    let _ = writeln!(host.output(), "Added {} repository '{}' ({id})", args.kind, args.name);
    Ok(())
}
