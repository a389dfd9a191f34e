use std::iter;

use serde_yaml::Value;

use crate::error::{Result, StatsError};
use crate::types::Configuration;

use super::{Formatter, LineStream, RecordStream};

/// JSON Lines: one object per record, keys in record order. With
/// `json: { pretty: true }` each object is pretty-printed instead.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format<'a>(&self, configuration: &'a Configuration, records: RecordStream<'a>) -> LineStream<'a> {
        let pretty = match configuration.section("json").and_then(|s| s.get("pretty")) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Box::new(iter::once(Err(StatsError::FormatOption {
                    format: "json",
                    message: format!("pretty must be a boolean, got {other:?}"),
                })));
            }
        };
        Box::new(records.map(move |record| -> Result<String> {
            let record = record?;
            let text = if pretty {
                serde_json::to_string_pretty(&record)?
            } else {
                serde_json::to_string(&record)?
            };
            Ok(text)
        }))
    }
}
