//! The checkout / execute / collect loop.
//!
//! [`CommitPipeline`] is a pull-driven iterator: nothing happens until the
//! consumer asks for the next record, and each call checks out exactly one
//! commit, runs every task against it and hands the record back. The working
//! tree therefore always matches the commit of the record most recently
//! produced.

use std::path::Path;

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Result, StatsError};
use crate::git::RepositoryAccessor;
use crate::system::CommandExecutor;
use crate::types::{CommitId, CommitRecord, TaskMapping, TimeZonePolicy};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CommitPipeline<'a, I> {
    commits: I,
    working_dir: &'a Path,
    tasks: &'a TaskMapping,
    repo: &'a dyn RepositoryAccessor,
    executor: &'a dyn CommandExecutor,
    time_zone: TimeZonePolicy,
    failed: bool,
}

impl<'a, I> CommitPipeline<'a, I>
where
    I: Iterator<Item = CommitId>,
{
    pub fn new(
        commits: impl IntoIterator<Item = CommitId, IntoIter = I>,
        working_dir: &'a Path,
        tasks: &'a TaskMapping,
        repo: &'a dyn RepositoryAccessor,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            commits: commits.into_iter(),
            working_dir,
            tasks,
            repo,
            executor,
            time_zone: TimeZonePolicy::default(),
            failed: false,
        }
    }

    #[must_use]
    pub fn with_time_zone(mut self, time_zone: TimeZonePolicy) -> Self {
        self.time_zone = time_zone;
        self
    }

    fn process(&self, commit: CommitId) -> Result<CommitRecord> {
        self.repo.checkout(self.working_dir, &commit)?;
        let timestamp = self.repo.commit_timestamp(self.working_dir, &commit)?;
        let date = format_timestamp(timestamp, self.time_zone).ok_or_else(|| {
            StatsError::Timestamp {
                commit: commit.to_string(),
                value: timestamp.to_string(),
            }
        })?;
        debug!(%commit, %date, "checked out");

        let mut results = IndexMap::with_capacity(self.tasks.len());
        for (name, command) in self.tasks.iter() {
            let output = self.executor.run(self.working_dir, command);
            debug!(%commit, task = name, "task done");
            results.insert(name.to_string(), output);
        }
        Ok(CommitRecord {
            commit,
            date,
            results,
        })
    }
}

impl<I> Iterator for CommitPipeline<'_, I>
where
    I: Iterator<Item = CommitId>,
{
    type Item = Result<CommitRecord>;

    /// Yields one record per commit. After an error the pipeline is fused:
    /// the tree is in an unknown state, so no later commit is measured.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let commit = self.commits.next()?;
        let result = self.process(commit);
        if let Err(err) = &result {
            warn!(error = %err, "stopping commit iteration");
            self.failed = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, self.commits.size_hint().1)
        }
    }
}

/// Build the lazy record sequence for `commits`, in the order given.
pub fn process_commits<'a>(
    commits: Vec<CommitId>,
    working_dir: &'a Path,
    tasks: &'a TaskMapping,
    repo: &'a dyn RepositoryAccessor,
    executor: &'a dyn CommandExecutor,
) -> CommitPipeline<'a, std::vec::IntoIter<CommitId>> {
    CommitPipeline::new(commits, working_dir, tasks, repo, executor)
}

/// Render Unix seconds as `YYYY-MM-DD HH:MM:SS`. `None` when out of range.
#[must_use]
pub fn format_timestamp(secs: i64, time_zone: TimeZonePolicy) -> Option<String> {
    let utc = DateTime::<Utc>::from_timestamp(secs, 0)?;
    Some(match time_zone {
        TimeZonePolicy::Utc => utc.format(DATE_FORMAT).to_string(),
        TimeZonePolicy::Local => utc.with_timezone(&Local).format(DATE_FORMAT).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// Shared fake for the repository and the shell: tracks the checked-out
    /// commit and logs every call in order.
    #[derive(Default)]
    struct FakeWorld {
        head: RefCell<Option<String>>,
        log: RefCell<Vec<String>>,
        timestamps: HashMap<&'static str, i64>,
        outputs: HashMap<(&'static str, &'static str), &'static str>,
        bad_commit: Option<&'static str>,
    }

    impl FakeWorld {
        fn new() -> Self {
            Self {
                timestamps: HashMap::from([("c1", 1_700_000_000), ("c2", 1_700_086_400), ("c3", 0)]),
                outputs: HashMap::from([
                    (("c1", "count-lines"), "120"),
                    (("c2", "count-lines"), "150"),
                    (("c3", "count-lines"), "7"),
                ]),
                ..Self::default()
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    impl RepositoryAccessor for FakeWorld {
        fn clone_repo(&self, _url: &str, _dir: &Path) -> Result<()> {
            unreachable!("the pipeline never clones")
        }

        fn list_commits(&self, _dir: &Path, _order: crate::CommitOrder) -> Result<Vec<CommitId>> {
            unreachable!("the pipeline never lists commits")
        }

        fn checkout(&self, _dir: &Path, commit: &CommitId) -> Result<()> {
            self.log.borrow_mut().push(format!("checkout {commit}"));
            if self.bad_commit == Some(commit.as_str()) {
                return Err(StatsError::CheckoutFailed {
                    commit: commit.to_string(),
                    stderr: "fatal: bad object".to_string(),
                });
            }
            *self.head.borrow_mut() = Some(commit.to_string());
            Ok(())
        }

        fn commit_timestamp(&self, _dir: &Path, commit: &CommitId) -> Result<i64> {
            Ok(self.timestamps.get(commit.as_str()).copied().unwrap_or_default())
        }
    }

    impl CommandExecutor for FakeWorld {
        fn run(&self, _dir: &Path, command: &str) -> String {
            let head = self.head.borrow().clone().unwrap_or_default();
            self.log.borrow_mut().push(format!("run {command} @ {head}"));
            self.outputs
                .iter()
                .find(|((c, cmd), _)| *c == head && *cmd == command)
                .map_or_else(|| format!("sh: {command}: not found"), |(_, out)| (*out).to_string())
        }
    }

    fn commits(ids: &[&str]) -> Vec<CommitId> {
        ids.iter().copied().map(CommitId::from).collect()
    }

    fn loc_only() -> TaskMapping {
        [("loc", "count-lines")].into_iter().collect()
    }

    fn utc(secs: i64) -> String {
        format_timestamp(secs, TimeZonePolicy::Utc).unwrap()
    }

    #[test]
    fn one_record_per_commit_in_input_order() {
        let world = FakeWorld::new();
        let tasks = loc_only();
        let records: Vec<CommitRecord> =
            process_commits(commits(&["c1", "c2"]), Path::new("/w"), &tasks, &world, &world)
                .with_time_zone(TimeZonePolicy::Utc)
                .collect::<Result<_>>()
                .expect("records");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].commit.as_str(), "c1");
        assert_eq!(records[0].date, utc(1_700_000_000));
        assert_eq!(records[0].results["loc"], "120");
        assert_eq!(records[1].commit.as_str(), "c2");
        assert_eq!(records[1].date, utc(1_700_086_400));
        assert_eq!(records[1].results["loc"], "150");
    }

    #[test]
    fn checkout_precedes_every_task_of_its_commit() {
        let world = FakeWorld::new();
        let tasks: TaskMapping = [("loc", "count-lines"), ("missing", "nope")].into_iter().collect();
        let n = process_commits(commits(&["c2", "c1"]), Path::new("/w"), &tasks, &world, &world).count();
        assert_eq!(n, 2);
        assert_eq!(
            world.log(),
            [
                "checkout c2",
                "run count-lines @ c2",
                "run nope @ c2",
                "checkout c1",
                "run count-lines @ c1",
                "run nope @ c1",
            ]
        );
    }

    #[test]
    fn records_are_produced_on_demand() {
        let world = FakeWorld::new();
        let tasks = loc_only();
        let mut pipeline =
            process_commits(commits(&["c1", "c2", "c3"]), Path::new("/w"), &tasks, &world, &world);
        assert!(world.log().is_empty());

        let first = pipeline.next().expect("first").expect("ok");
        assert_eq!(first.commit.as_str(), "c1");
        assert_eq!(world.log(), ["checkout c1", "run count-lines @ c1"]);
    }

    #[test]
    fn key_order_follows_task_mapping() {
        let world = FakeWorld::new();
        let tasks: TaskMapping = [("zeta", "a"), ("alpha", "b"), ("mid", "c")].into_iter().collect();
        let record = process_commits(commits(&["c1"]), Path::new("/w"), &tasks, &world, &world)
            .next()
            .expect("record")
            .expect("ok");
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            ["commit", "date", "zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn failing_task_output_is_kept_as_text() {
        let world = FakeWorld::new();
        let tasks: TaskMapping = [("broken", "does-not-exist")].into_iter().collect();
        let record = process_commits(commits(&["c1"]), Path::new("/w"), &tasks, &world, &world)
            .next()
            .expect("record")
            .expect("task failures do not abort");
        assert_eq!(record.results["broken"], "sh: does-not-exist: not found");
    }

    #[test]
    fn checkout_failure_ends_the_run() {
        let world = FakeWorld {
            bad_commit: Some("c2"),
            ..FakeWorld::new()
        };
        let tasks = loc_only();
        let results: Vec<_> =
            process_commits(commits(&["c1", "c2", "c3"]), Path::new("/w"), &tasks, &world, &world)
                .collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(StatsError::CheckoutFailed { .. })));
        // No task ran against the failed checkout, and c3 was never touched.
        assert_eq!(
            world.log(),
            ["checkout c1", "run count-lines @ c1", "checkout c2"]
        );
    }

    #[test]
    fn empty_task_mapping_still_yields_commit_and_date() {
        let world = FakeWorld::new();
        let tasks = TaskMapping::new();
        let record = process_commits(commits(&["c3"]), Path::new("/w"), &tasks, &world, &world)
            .with_time_zone(TimeZonePolicy::Utc)
            .next()
            .expect("record")
            .expect("ok");
        assert_eq!(
            record.entries().collect::<Vec<_>>(),
            [("commit", "c3"), ("date", "1970-01-01 00:00:00")]
        );
    }

    #[test]
    fn rerun_is_identical() {
        let tasks = loc_only();
        let run = || {
            let world = FakeWorld::new();
            let records: Vec<CommitRecord> =
                process_commits(commits(&["c1", "c2", "c3"]), Path::new("/w"), &tasks, &world, &world)
                    .with_time_zone(TimeZonePolicy::Utc)
                    .collect::<Result<_>>()
                    .expect("records");
            records
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn timestamp_formatting() {
        assert_eq!(utc(1_700_000_000), "2023-11-14 22:13:20");
        assert!(format_timestamp(i64::MAX, TimeZonePolicy::Utc).is_none());
    }
}
