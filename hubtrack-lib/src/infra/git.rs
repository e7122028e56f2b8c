use crate::Result;
use crate::hub::{ClonedRepository, Repository, RepositoryCloner};
use async_trait::async_trait;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::time::Instant;
use tokio::process::Command;

const LOG_TARGET: &str = "         git";

/// Materializes git repositories with the `git` command-line tool.
///
/// Clones are shallow, single-branch, and placed in temporary directories
/// that are removed once the tracker is done with them.
#[derive(Debug, Clone)]
pub struct GitCloner {
    timeout: Duration,
}

impl GitCloner {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_git_with_timeout(&self, args: &[&str]) -> Result<std::process::Output> {
        let child = Command::new("git")
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .into_app_err("could not spawn git command")?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e).into_app_err_with(|| format!("'git {}' failed to run", args.join(" "))),
            Err(_) => {
                bail!("'git {}' timed out after {} seconds", args.join(" "), self.timeout.as_secs());
            }
        }
    }
}

#[async_trait]
impl RepositoryCloner for GitCloner {
    async fn clone_repository(&self, repository: &Repository) -> Result<ClonedRepository> {
        let start_time = Instant::now();
        let dir = tempfile::Builder::new()
            .prefix("hubtrack-")
            .tempdir()
            .into_app_err("could not create temporary directory for clone")?;
        let path_str = dir.path().to_str().into_app_err("invalid UTF-8 in temporary directory path")?;

        let mut args = vec!["clone", "--depth", "1", "--single-branch", "--no-tags"];
        if let Some(branch) = repository.branch.as_deref() {
            args.extend(["--branch", branch]);
        }
        args.extend([repository.url.as_str(), path_str]);

        log::info!(target: LOG_TARGET, "Cloning repository '{}'", repository.url);
        let output = self.run_git_with_timeout(&args).await?;
        check_git_output(&output, "git clone")?;

        log::debug!(
            target: LOG_TARGET,
            "Cloned '{}' in {:.3}s",
            repository.url,
            start_time.elapsed().as_secs_f64()
        );

        Ok(ClonedRepository::temporary(dir))
    }

    async fn head_revision(&self, repository: &Repository) -> Result<String> {
        let reference = repository.branch.as_deref().map_or_else(|| "HEAD".to_string(), |b| format!("refs/heads/{b}"));
        let output = self
            .run_git_with_timeout(&["ls-remote", repository.url.as_str(), &reference])
            .await?;
        check_git_output(&output, "git ls-remote")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_ls_remote(&stdout) {
            Some(revision) => Ok(revision.to_string()),
            None => bail!("'{reference}' not found in repository '{}'", repository.url),
        }
    }
}

/// Extracts the object name from the first line of `git ls-remote` output.
fn parse_ls_remote(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find(|rev| !rev.is_empty())
}

fn check_git_output(output: &std::process::Output, operation: &str) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{operation} failed: {}", stderr.trim());
    }
    Ok(())
}
