use super::common::{ColorMode, LogLevel, http_getter, init_logging, load_config, open_catalog};
use super::{Host, ProgressReporter};
use crate::Result;
use crate::hub::{PackageManager, RepositoryKind, RepositoryManager};
use crate::infra::{DirImageStore, GitCloner, HttpIndexLoader, JsonCatalog};
use crate::tracker::{ErrorsCollector, Orchestrator, Progress, Services, TrackingReport, new_tracker};
use camino::Utf8PathBuf;
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "       track";

#[derive(Parser, Debug)]
pub struct TrackArgs {
    /// Path to configuration file (default is `hubtrack.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Maximum number of repositories tracked at the same time
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Only track repositories of this kind (can be repeated)
    #[arg(long = "kind", value_name = "KIND")]
    pub kinds: Vec<RepositoryKind>,

    /// Only track the repository with this name (can be repeated)
    #[arg(long = "repository", value_name = "NAME")]
    pub repositories: Vec<String>,

    /// Process repositories even if their content has not changed
    #[arg(long)]
    pub bypass_digest_check: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,

    /// Exit with status code 1 if any repository reported errors
    #[arg(long)]
    pub error_if_failures: bool,
}

/// Runs one tracking pass over the catalog.
pub async fn track_repositories<H: Host>(host: &mut H, args: &TrackArgs) -> Result<()> {
    init_logging(args.log_level);

    let mut config = load_config(args.config.as_ref())?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if !args.kinds.is_empty() {
        config.repository_kinds.clone_from(&args.kinds);
    }
    if !args.repositories.is_empty() {
        config.repository_names.clone_from(&args.repositories);
    }
    config.bypass_digest_check |= args.bypass_digest_check;
    config.validate()?;
    let config = Arc::new(config);

    let http = http_getter(&config)?;
    let catalog = open_catalog(&config, Arc::clone(&http)).await?;
    let cancel = CancellationToken::new();

    let svc = Arc::new(Services::new(
        cancel.clone(),
        Arc::clone(&config),
        Arc::new(GitCloner::new(config.clone_timeout)),
        Arc::clone(&catalog) as Arc<dyn RepositoryManager>,
        Arc::clone(&catalog) as Arc<dyn PackageManager>,
        Arc::new(HttpIndexLoader::new(Arc::clone(&http))),
        Arc::new(DirImageStore::new(&config.images_dir)?),
        Arc::new(ErrorsCollector::new()),
        http,
    ));

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!(target: LOG_TARGET, "Interrupted, cancelling the run");
            cancel.cancel();
        }
    });

    let progress: Arc<dyn Progress> = Arc::new(ProgressReporter::new(args.log_level.progress_delay(), args.color.for_stderr()));
    let report = Orchestrator::new(svc, new_tracker).with_progress(progress).track_all().await;
    interrupt.abort();
    let report = report?;

    catalog.save()?;
    print_summary(host, &catalog, &report, args.color.for_stdout());

    if args.error_if_failures && !report.is_success() {
        host.exit(1);
    }

    Ok(())
}

fn print_summary<H: Host>(host: &mut H, catalog: &JsonCatalog, report: &TrackingReport, use_colors: bool) {
    let failed = report.failures().count();
    let _ = writeln!(host.output(), "Tracked {} repositories, {failed} with errors", report.tracked());

    for (id, errors) in report.failures() {
        let name = catalog.repository(id).map_or_else(|| id.to_string(), |r| r.name);
        if use_colors {
            let _ = writeln!(host.error(), "{}", name.red().bold());
        } else {
            let _ = writeln!(host.error(), "{name}");
        }
        for error in errors {
            let _ = writeln!(host.error(), "  {error}");
        }
    }
}
