use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use tracing::info;

use crate::config::load_configuration;
use crate::error::{Result, StatsError};
use crate::git::RepositoryAccessor;
use crate::output::{Formatter, LineStream, formatter_for};
use crate::pipeline::process_commits;
use crate::system::{CommandExecutor, Prompt};
use crate::types::{Options, RunContext};

/// The external pieces a run talks to.
pub struct Collaborators<'a> {
    pub repo: &'a dyn RepositoryAccessor,
    pub executor: &'a dyn CommandExecutor,
    pub prompt: &'a dyn Prompt,
}

/// Clone `opts.url` into a fresh temporary directory, measure its history and
/// write the formatted lines to `out` as they are produced. The user is asked
/// whether to delete the clone once the run is over, whether it succeeded or not.
///
/// # Errors
/// An unknown format is rejected before anything is cloned. Clone, configuration,
/// log and checkout failures end the run; task failures never do.
pub fn run(opts: &Options, deps: &Collaborators<'_>, out: &mut dyn Write) -> Result<()> {
    run_with_progress(opts, deps, out, &progress_bar(opts.progress))
}

fn run_with_progress(
    opts: &Options,
    deps: &Collaborators<'_>,
    out: &mut dyn Write,
    progress: &ProgressBar,
) -> Result<()> {
    let formatter = formatter_for(&opts.format)?;
    let workspace = Workspace::create()?;

    let result = collect(opts, deps, formatter, workspace.path(), out, progress);
    if result.is_ok() {
        info!("Done");
    }
    let cleanup = workspace.finish(deps.prompt);
    result?;
    cleanup.map(|_| ())
}

fn collect(
    opts: &Options,
    deps: &Collaborators<'_>,
    formatter: &dyn Formatter,
    dir: &Path,
    out: &mut dyn Write,
    progress: &ProgressBar,
) -> Result<()> {
    let url = resolve_url(&opts.url);
    info!("Cloning {url} in {}", dir.display());
    deps.repo.clone_repo(&url, dir)?;

    let configuration = load_configuration(dir, &opts.tasks)?;
    let ctx = RunContext {
        working_dir: dir.to_path_buf(),
        max: opts.max,
    };
    let commits = ctx.truncate(deps.repo.list_commits(dir, opts.order)?);
    info!("Iterating through {} commits", commits.len());

    progress.set_length(commits.len() as u64);
    if !progress.is_hidden() {
        progress.set_message("processing commits");
        progress.enable_steady_tick(Duration::from_millis(100));
    }
    let ticker = progress.clone();
    let records = process_commits(
        commits,
        &ctx.working_dir,
        &configuration.tasks,
        deps.repo,
        deps.executor,
    )
    .with_time_zone(opts.time_zone)
    .inspect(move |record| {
        if record.is_ok() {
            ticker.inc(1);
        }
    });

    match write_lines(formatter.format(&configuration, Box::new(records)), out) {
        Ok(lines) => {
            progress.finish_and_clear();
            info!("Wrote {lines} lines");
            Ok(())
        }
        Err(err) => {
            progress.abandon();
            Err(err)
        }
    }
}

fn write_lines(lines: LineStream<'_>, out: &mut dyn Write) -> Result<usize> {
    let mut written = 0;
    for line in lines {
        let line = line?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|source| StatsError::io("failed to write output", source))?;
        written += 1;
    }
    Ok(written)
}

/// Sized once the commits are listed. It advances per record, so the CSV
/// header line is not counted.
fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(0);
    let style =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}

/// `git clone` runs inside the workspace, so a relative local path has to be
/// made absolute first.
fn resolve_url(url: &str) -> String {
    let path = Path::new(url);
    if path.is_relative()
        && path.exists()
        && let Ok(full) = path.canonicalize()
    {
        return full.display().to_string();
    }
    url.to_string()
}

/// The temporary clone. Deleting it is the user's call.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// # Errors
    /// Fails when the temporary directory cannot be created.
    pub fn create() -> Result<Self> {
        tempfile::Builder::new()
            .prefix("gitstats_")
            .tempdir()
            .map(|dir| Self { dir })
            .map_err(|source| StatsError::io("failed to create temporary directory", source))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Ask whether to delete the directory (default yes). Returns the path
    /// when it was kept.
    ///
    /// # Errors
    /// Fails when the directory cannot be removed.
    pub fn finish(self, prompt: &dyn Prompt) -> Result<Option<PathBuf>> {
        let path = self.dir.path().display().to_string();
        if prompt.confirm(&format!("Delete directory {path}?"), true) {
            info!("Deleting {path}");
            self.dir
                .close()
                .map_err(|source| StatsError::io(format!("failed to delete {path}"), source))?;
            Ok(None)
        } else {
            info!("Not deleting {path}");
            Ok(Some(self.dir.keep()))
        }
    }
}
