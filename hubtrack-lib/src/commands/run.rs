//! Command dispatch logic for hubtrack

use super::{AddArgs, InitArgs, ListArgs, TrackArgs, ValidateArgs, add_repository, init_config, list_repositories, track_repositories, validate_config};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "hubtrack", version, author, long_about = None)]
#[command(about = "Track package repositories and register their packages into a catalog")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: HubtrackSubcommand,
}

#[derive(Subcommand, Debug)]
enum HubtrackSubcommand {
    /// Track the repositories in the catalog and register their packages
    Track(Box<TrackArgs>),
    /// Register a repository in the catalog
    Add(AddArgs),
    /// List the repositories in the catalog
    List(ListArgs),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Errors
///
/// Returns an error if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        HubtrackSubcommand::Track(track_args) => track_repositories(host, track_args).await,
        HubtrackSubcommand::Add(add_args) => add_repository(host, add_args).await,
        HubtrackSubcommand::List(list_args) => list_repositories(host, list_args).await,
        HubtrackSubcommand::Init(init_args) => init_config(host, init_args),
        HubtrackSubcommand::Validate(validate_args) => validate_config(host, validate_args),
    }
}
