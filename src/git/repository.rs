use std::path::Path;

use tracing::debug;

use crate::error::{Result, StatsError};
use crate::types::{CommitId, CommitOrder};

use super::runner::{DefaultGitRunner, GitRunner, git_stdout};

/// The version-control operations a run needs. Every call targets the
/// working tree at `dir`; nothing is cached between calls.
pub trait RepositoryAccessor {
    /// Clone `url` into the existing, empty directory `dir`.
    ///
    /// # Errors
    /// [`StatsError::CloneFailed`] when git cannot clone.
    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()>;

    /// Commits reachable from `HEAD` in the requested order.
    ///
    /// # Errors
    /// [`StatsError::GitLog`] when the log query fails. That includes a
    /// repository with no commits at all: `git log` refuses an unborn `HEAD`,
    /// and the run ends there instead of writing an empty report.
    fn list_commits(&self, dir: &Path, order: CommitOrder) -> Result<Vec<CommitId>>;

    /// Replace the working tree with `commit`.
    ///
    /// # Errors
    /// [`StatsError::CheckoutFailed`] when git refuses the checkout.
    fn checkout(&self, dir: &Path, commit: &CommitId) -> Result<()>;

    /// Committer time of `commit` as Unix seconds.
    ///
    /// # Errors
    /// [`StatsError::GitLog`] or [`StatsError::Timestamp`].
    fn commit_timestamp(&self, dir: &Path, commit: &CommitId) -> Result<i64>;
}

/// [`RepositoryAccessor`] backed by the `git` binary.
pub struct GitRepository<R = DefaultGitRunner> {
    runner: R,
}

impl<R: GitRunner> GitRepository<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl Default for GitRepository<DefaultGitRunner> {
    fn default() -> Self {
        Self::new(DefaultGitRunner)
    }
}

impl<R: GitRunner> RepositoryAccessor for GitRepository<R> {
    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        git_stdout(&self.runner, dir, &["clone", "--quiet", url, "."])
            .map(|_| ())
            .map_err(|stderr| StatsError::CloneFailed {
                url: url.to_string(),
                stderr,
            })
    }

    fn list_commits(&self, dir: &Path, order: CommitOrder) -> Result<Vec<CommitId>> {
        let args: &[&str] = match order {
            CommitOrder::NewestFirst => &["log", "--format=%H"],
            CommitOrder::OldestFirst => &["log", "--reverse", "--format=%H"],
        };
        let text = git_stdout(&self.runner, dir, args).map_err(|stderr| StatsError::GitLog { stderr })?;
        let commits: Vec<CommitId> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(CommitId::from)
            .collect();
        debug!(count = commits.len(), ?order, "listed commits");
        Ok(commits)
    }

    fn checkout(&self, dir: &Path, commit: &CommitId) -> Result<()> {
        git_stdout(
            &self.runner,
            dir,
            &["checkout", "--force", "--quiet", commit.as_str()],
        )
        .map(|_| ())
        .map_err(|stderr| StatsError::CheckoutFailed {
            commit: commit.to_string(),
            stderr,
        })
    }

    fn commit_timestamp(&self, dir: &Path, commit: &CommitId) -> Result<i64> {
        let text = git_stdout(
            &self.runner,
            dir,
            &["log", "-1", "--format=%ct", commit.as_str()],
        )
        .map_err(|stderr| StatsError::GitLog { stderr })?;
        text.parse::<i64>().map_err(|_| StatsError::Timestamp {
            commit: commit.to_string(),
            value: text,
        })
    }
}
