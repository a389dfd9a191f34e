use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::types::{Configuration, TaskMapping};

pub const CONFIG_FILE_NAME: &str = ".gitstats.yml";

/// Keys every record starts with; tasks cannot shadow them.
const RESERVED_TASK_NAMES: [&str; 2] = ["commit", "date"];

/// Load `.gitstats.yml` from the root of `dir`, optionally keeping only the
/// tasks named in `filter`. An empty filter keeps every task.
///
/// # Errors
/// [`StatsError::ConfigurationMissing`] when the file does not exist,
/// [`StatsError::ConfigurationMalformed`] when it cannot be read as a mapping
/// with a `tasks` mapping of strings, or when a task takes a name reserved
/// for the leading record columns.
pub fn load_configuration<S: AsRef<str>>(dir: &Path, filter: &[S]) -> Result<Configuration> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Err(StatsError::ConfigurationMissing { path });
    }
    let text = std::fs::read_to_string(&path)
        .map_err(|source| StatsError::io(format!("failed to read {}", path.display()), source))?;
    let mut configuration = parse_configuration(&path, &text)?;

    if !filter.is_empty() {
        let before = configuration.tasks.len();
        configuration.tasks = configuration.tasks.filtered(filter);
        debug!(
            kept = configuration.tasks.len(),
            dropped = before - configuration.tasks.len(),
            "applied task filter"
        );
    }
    Ok(configuration)
}

pub(crate) fn parse_configuration(path: &Path, text: &str) -> Result<Configuration> {
    if text.trim().is_empty() {
        return Ok(Configuration::default());
    }
    let document: Value =
        serde_yaml::from_str(text).map_err(|source| malformed(path, &source.to_string()))?;
    let mut extra = match document {
        Value::Null => Mapping::new(),
        Value::Mapping(map) => map,
        _ => return Err(malformed(path, "top level must be a mapping")),
    };
    let tasks = match extra.remove("tasks") {
        None | Some(Value::Null) => TaskMapping::new(),
        Some(Value::Mapping(map)) => parse_tasks(path, map)?,
        Some(_) => return Err(malformed(path, "`tasks` must map task names to commands")),
    };
    Ok(Configuration { tasks, extra })
}

fn parse_tasks(path: &Path, map: Mapping) -> Result<TaskMapping> {
    let mut tasks = TaskMapping::new();
    for (name, command) in map {
        let Some(name) = scalar_text(&name) else {
            return Err(malformed(path, "task names must be scalars"));
        };
        let Some(command) = scalar_text(&command) else {
            return Err(malformed(
                path,
                &format!("command for task `{name}` must be a string"),
            ));
        };
        if RESERVED_TASK_NAMES.contains(&name.as_str()) {
            return Err(malformed(
                path,
                &format!("task name `{name}` is reserved for the record column"),
            ));
        }
        tasks.insert(name, command);
    }
    Ok(tasks)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn malformed(path: &Path, message: &str) -> StatsError {
    StatsError::ConfigurationMalformed {
        path: PathBuf::from(path),
        message: message.to_string(),
    }
}
