use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A git revision hash as reported by `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Task name to shell command, in the order the configuration lists them.
/// That order is both execution order and output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMapping(IndexMap<String, String>);

impl TaskMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, command: impl Into<String>) {
        self.0.insert(name.into(), command.into());
    }

    /// Keep only the tasks named in `names`, in this mapping's order.
    /// Names that are not configured are ignored.
    #[must_use]
    pub fn filtered<S: AsRef<str>>(&self, names: &[S]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(name, _)| names.iter().any(|n| n.as_ref() == name.as_str()))
                .map(|(name, command)| (name.clone(), command.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TaskMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The result bundle for one commit. Keys always come out as
/// `commit`, `date`, then the task names in mapping order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub commit: CommitId,
    pub date: String,
    pub results: IndexMap<String, String>,
}

impl CommitRecord {
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("commit", self.commit.as_str()),
            ("date", self.date.as_str()),
        ]
        .into_iter()
        .chain(self.results.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries().map(|(_, v)| v)
    }
}

impl Serialize for CommitRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.results.len() + 2))?;
        for (key, value) in self.entries() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Parsed `.gitstats.yml`. Everything besides `tasks` is kept for formatters.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub tasks: TaskMapping,
    pub extra: serde_yaml::Mapping,
}

impl Configuration {
    /// A formatter-specific top-level section, e.g. `csv:`.
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.extra.get(key)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TimeZonePolicy {
    #[default]
    Local,
    Utc,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CommitOrder {
    /// `git log` order.
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Where the run happens and how many commits it may touch.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub working_dir: PathBuf,
    pub max: Option<usize>,
}

impl RunContext {
    /// Cut `commits` down to the first `max` entries, keeping their order.
    #[must_use]
    pub fn truncate(&self, mut commits: Vec<CommitId>) -> Vec<CommitId> {
        if let Some(max) = self.max {
            commits.truncate(max);
        }
        commits
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub tasks: Vec<String>,
    pub format: String,
    pub max: Option<usize>,
    pub progress: bool,
    pub order: CommitOrder,
    pub time_zone: TimeZonePolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: String::new(),
            tasks: Vec::new(),
            format: "csv".to_string(),
            max: None,
            progress: false,
            order: CommitOrder::default(),
            time_zone: TimeZonePolicy::default(),
        }
    }
}
