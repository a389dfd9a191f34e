use std::iter;

use serde_yaml::Value;

use crate::error::{Result, StatsError};
use crate::types::{CommitRecord, Configuration};

use super::{Formatter, LineStream, RecordStream};

/// `commit,date,<tasks...>` header, then one row per record.
///
/// Reads an optional `csv:` section with `delimiter` (one character) and
/// `header` (bool).
pub struct CsvFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CsvOptions {
    delimiter: char,
    header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            header: true,
        }
    }
}

impl Formatter for CsvFormatter {
    fn format<'a>(&self, configuration: &'a Configuration, records: RecordStream<'a>) -> LineStream<'a> {
        let options = match csv_options(configuration) {
            Ok(options) => options,
            Err(err) => return Box::new(iter::once(Err(err))),
        };

        let header = options.header.then(|| {
            let columns = ["commit", "date"].into_iter().chain(configuration.tasks.names());
            Ok(join_row(columns, options.delimiter))
        });
        let rows = records.map(move |record| record.map(|r| row(&r, options.delimiter)));
        Box::new(header.into_iter().chain(rows))
    }
}

fn csv_options(configuration: &Configuration) -> Result<CsvOptions> {
    let mut options = CsvOptions::default();
    let Some(section) = configuration.section("csv") else {
        return Ok(options);
    };
    if let Some(value) = section.get("delimiter") {
        let text = value.as_str().unwrap_or_default();
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '"' && c != '\n' && c != '\r' => options.delimiter = c,
            _ => return Err(option_error(format!("delimiter must be a single character, got {value:?}"))),
        }
    }
    match section.get("header") {
        None => {}
        Some(Value::Bool(b)) => options.header = *b,
        Some(other) => return Err(option_error(format!("header must be a boolean, got {other:?}"))),
    }
    Ok(options)
}

fn option_error(message: String) -> StatsError {
    StatsError::FormatOption {
        format: "csv",
        message,
    }
}

fn row(record: &CommitRecord, delimiter: char) -> String {
    join_row(record.values(), delimiter)
}

fn join_row<'v>(fields: impl Iterator<Item = &'v str>, delimiter: char) -> String {
    let mut line = String::new();
    for (i, field) in fields.enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        push_field(&mut line, field, delimiter);
    }
    line
}

fn push_field(line: &mut String, field: &str, delimiter: char) {
    let needs_quotes = field
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');
    if needs_quotes {
        line.push('"');
        line.push_str(&field.replace('"', "\"\""));
        line.push('"');
    } else {
        line.push_str(field);
    }
}
