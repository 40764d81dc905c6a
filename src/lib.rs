//! # json-flatten - Field Selection for Nested JSON
//!
//! Selects a set of fields out of nested JSON documents and explodes them into
//! flat rows keyed by full field path, ready for CSV-like sinks.
//!
//! - Sibling selections are cross-joined: `{"a": [1, 2], "b": [3, 4]}` with
//!   `$.a[*]` and `$.b[*]` gives four rows.
//! - Array elements are unioned: every element of a `[*]` segment adds rows.
//! - Missing branches produce `null` cells, so every row of a document has the
//!   same columns. An absent or empty array still yields one all-null row.
//!
//! ## Quick Start
//!
//! ```rust
//! use json_flatten::JsonFlattener;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let flattener = JsonFlattener::new(&["$.id", "$.posts[*].title"])?;
//! let rows = flattener.flatten(r#"{
//!     "id": 1,
//!     "posts": [{"title": "First"}, {"title": "Second"}]
//! }"#)?;
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].get("$.id"), Some(&json!(1)));
//! assert_eq!(rows[1].get("$.posts[*].title"), Some(&json!("Second")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Named selections
//!
//! ```rust
//! use json_flatten::{SchemaCache, SchemaFile};
//!
//! # fn main() -> anyhow::Result<()> {
//! let schemas = SchemaFile::from_json(r#"{"schemas": {"events": ["$.version"]}}"#)?;
//! let mut cache = SchemaCache::new();
//! let flattener = schemas.flattener("events", &mut cache)?;
//! let rows = flattener.flatten(r#"[{"version": "1"}, {"version": "2"}]"#)?;
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

pub mod error;
pub mod flatten;

// Re-export commonly used types for convenience
pub use error::FlattenError;
pub use flatten::{
    flatten, FlatRow, FlattenConfig, JsonFlattener, OutputFormat, PathIndex, RowWriter,
    SchemaCache, SchemaFile,
};

/// Flatten a newline-delimited JSON stream, writing every row.
/// Blank lines are skipped. Returns the number of rows written.
pub fn flatten_json<R: BufRead, W: Write>(
    reader: R,
    flattener: &JsonFlattener,
    writer: &mut RowWriter<W>,
) -> Result<usize> {
    let mut written = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let rows = flattener
            .flatten(&line)
            .with_context(|| format!("Failed to flatten line {}", line_no + 1))?;

        writer.write_rows(&rows)?;
        written += rows.len();
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_flattening() {
        let input = json!({
            "version": "1.0",
            "tags": {
                "instanceID": "i-42",
                "correlationContext": {"runID": "run-7", "agentName": "agent"}
            },
            "data-pipeline-product": "ingest"
        })
        .to_string();

        let flattener = JsonFlattener::new(&[
            "$.version",
            "$.tags.instanceID",
            "$.data-pipeline-product",
            "$.tags.correlationContext.runID",
            "$.tags.correlationContext.agentName",
            "$.tags.correlationContext.processName",
        ])
        .unwrap();
        let rows = flattener.flatten(&input).unwrap();

        assert_eq!(rows.len(), 1);
        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(
            columns,
            vec![
                "$.version",
                "$.tags.instanceID",
                "$.tags.correlationContext.runID",
                "$.tags.correlationContext.agentName",
                "$.tags.correlationContext.processName",
                "$.data-pipeline-product",
            ]
        );
        assert_eq!(rows[0].get("$.tags.correlationContext.processName"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_flatten_ndjson_stream() {
        let input = "{\"a\":[1,2]}\n\n{\"a\":[]}\n";
        let flattener = JsonFlattener::new(&["$.a[*]"]).unwrap();
        let mut writer =
            RowWriter::new(Vec::new(), OutputFormat::JsonLines, FlattenConfig::default()).unwrap();

        let written = flatten_json(input.as_bytes(), &flattener, &mut writer).unwrap();
        assert_eq!(written, 3);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "{\"$.a[*]\":1}\n{\"$.a[*]\":2}\n{\"$.a[*]\":null}\n");
    }

    #[test]
    fn test_flatten_ndjson_reports_bad_line() {
        let input = "{\"a\":1}\n{oops\n";
        let flattener = JsonFlattener::new(&["$.a"]).unwrap();
        let mut writer =
            RowWriter::new(Vec::new(), OutputFormat::JsonLines, FlattenConfig::default()).unwrap();

        let err = flatten_json(input.as_bytes(), &flattener, &mut writer).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
