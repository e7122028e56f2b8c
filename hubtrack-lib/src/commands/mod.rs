//! Command-line interface for hubtrack
//!
//! This module parses arguments, builds the concrete collaborators a run
//! needs, and hands them to the [`crate::tracker`] orchestration.
//!
//! ## Commands
//!
//! - **track**: Run one tracking pass over the repositories in the catalog
//! - **add**: Register a repository in the catalog
//! - **list**: Show the catalog's repositories and their last tracking outcome
//! - **init**: Generate a default configuration file
//! - **validate**: Check a configuration file
//!
//! Every command writes through a [`Host`] so tests can capture output and
//! intercept the process exit code.

mod add;
mod common;
mod host;
mod init;
mod list;
mod progress_reporter;
mod run;
mod track;
mod validate;

pub use add::{AddArgs, add_repository};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use list::{ListArgs, list_repositories};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use track::{TrackArgs, track_repositories};
pub use validate::{ValidateArgs, validate_config};

#[cfg(test)]
pub use host::TestHost;
