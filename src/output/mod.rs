pub mod csv;
pub mod json;

use std::str::FromStr;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;

use crate::error::{Result, StatsError};
use crate::types::{CommitRecord, Configuration};

/// Records as the pipeline produces them. The first `Err` ends the run.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<CommitRecord>> + 'a>;

/// Output lines in the order they must be written.
pub type LineStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// Turns the record sequence into output lines. Implementations should pull
/// records lazily so lines can be written while later commits are processed.
pub trait Formatter {
    fn format<'a>(&self, configuration: &'a Configuration, records: RecordStream<'a>) -> LineStream<'a>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn formatter(self) -> &'static dyn Formatter {
        match self {
            Self::Csv => &CsvFormatter,
            Self::Json => &JsonFormatter,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = StatsError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(StatsError::UnknownFormat {
                name: name.to_string(),
            }),
        }
    }
}

/// Look a formatter up by its case-insensitive name.
///
/// # Errors
/// [`StatsError::UnknownFormat`] for anything but `csv` or `json`.
pub fn formatter_for(name: &str) -> Result<&'static dyn Formatter> {
    name.parse::<OutputFormat>().map(OutputFormat::formatter)
}
