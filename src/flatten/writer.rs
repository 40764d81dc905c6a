use crate::flatten::types::{FlatRow, FlattenConfig};
use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::io::Write;

/// Output layout for flattened rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per row
    JsonLines,
    /// Separator-delimited cells with an optional header line
    Delimited,
}

enum Sink<W: Write> {
    JsonLines(W),
    Delimited(csv::Writer<W>),
}

/// Writes flattened rows to any `Write` sink
pub struct RowWriter<W: Write> {
    sink: Sink<W>,
    config: FlattenConfig,
    header_written: bool,
}

impl<W: Write> RowWriter<W> {
    /// Fails for delimited output when the separator is not a single byte
    pub fn new(writer: W, format: OutputFormat, config: FlattenConfig) -> Result<Self> {
        let sink = match format {
            OutputFormat::JsonLines => Sink::JsonLines(writer),
            OutputFormat::Delimited => {
                let delimiter = single_byte_separator(config.separator)?;
                Sink::Delimited(
                    csv::WriterBuilder::new()
                        .delimiter(delimiter)
                        .has_headers(false)
                        .from_writer(writer),
                )
            }
        };

        Ok(RowWriter {
            sink,
            config,
            header_written: false,
        })
    }

    /// Write rows in order. For delimited output the header comes from the
    /// first row written; every later row from the same selection carries the
    /// same columns.
    pub fn write_rows(&mut self, rows: &[FlatRow]) -> Result<()> {
        for row in rows {
            match &mut self.sink {
                Sink::JsonLines(writer) => {
                    let json = serde_json::to_string(row).context("Failed to serialize row")?;
                    writeln!(writer, "{}", json).context("Failed to write row")?;
                }
                Sink::Delimited(writer) => {
                    if self.config.emit_header && !self.header_written {
                        writer
                            .write_record(row.columns())
                            .context("Failed to write header")?;
                        self.header_written = true;
                    }

                    let cells: Vec<String> = row
                        .cells()
                        .values()
                        .map(|value| render_cell(value, &self.config.null_text))
                        .collect();
                    writer.write_record(&cells).context("Failed to write row")?;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        let flushed = match &mut self.sink {
            Sink::JsonLines(writer) => writer.flush(),
            Sink::Delimited(writer) => writer.flush(),
        };
        flushed.context("Failed to flush writer")
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        match self.sink {
            Sink::JsonLines(mut writer) => {
                writer.flush().context("Failed to flush writer")?;
                Ok(writer)
            }
            Sink::Delimited(writer) => writer
                .into_inner()
                .map_err(|err| anyhow!("Failed to flush writer: {}", err.error())),
        }
    }
}

/// Strings go out unquoted by JSON, nulls as the configured text, anything
/// else as compact JSON
fn render_cell(value: &Value, null_text: &str) -> String {
    match value {
        Value::Null => null_text.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn single_byte_separator(separator: char) -> Result<u8> {
    let mut buf = [0u8; 4];
    let encoded = separator.encode_utf8(&mut buf);
    if encoded.len() != 1 {
        bail!("delimited output needs a single-byte separator, got '{}'", separator);
    }
    Ok(encoded.as_bytes()[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_rows() -> Vec<FlatRow> {
        let mut first = FlatRow::with_cell("$.id", json!(1));
        first.insert("$.name", json!("Alice, Jr."));
        first.insert("$.tags[*]", json!({"k": "v"}));

        let mut second = FlatRow::with_cell("$.id", json!(2));
        second.insert("$.name", Value::Null);
        second.insert("$.tags[*]", json!("say \"hi\""));

        vec![first, second]
    }

    fn delimited_output(rows: &[FlatRow], config: FlattenConfig) -> String {
        let mut writer = RowWriter::new(Vec::new(), OutputFormat::Delimited, config).unwrap();
        writer.write_rows(rows).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_json_lines() {
        let mut writer =
            RowWriter::new(Vec::new(), OutputFormat::JsonLines, FlattenConfig::default()).unwrap();
        writer.write_rows(&sample_rows()).unwrap();

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"$.id":1,"$.name":"Alice, Jr.","$.tags[*]":{"k":"v"}}"#);
    }

    #[test]
    fn test_delimited_with_header() {
        let mut writer =
            RowWriter::new(Vec::new(), OutputFormat::Delimited, FlattenConfig::default()).unwrap();
        writer.write_rows(&sample_rows()).unwrap();
        writer.write_rows(&sample_rows()[..1]).unwrap();

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "$.id,$.name,$.tags[*]");
        assert_eq!(lines[1], r#"1,"Alice, Jr.","{""k"":""v""}""#);
        assert_eq!(lines[2], r#"2,,"say ""hi""""#);
    }

    #[test]
    fn test_delimited_custom_separator() {
        let config = FlattenConfig {
            separator: '|',
            emit_header: false,
            null_text: "NULL".to_string(),
        };
        let output = delimited_output(&sample_rows(), config);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![r#"1|Alice, Jr.|"{""k"":""v""}""#, r#"2|NULL|"say ""hi""""#]
        );
    }

    #[test]
    fn test_delimited_cells_read_back() {
        let mut row = FlatRow::with_cell("$.a", json!(" padded "));
        row.insert("$.b", json!(""));
        row.insert("$.c", Value::Null);
        row.insert("$.d", json!("tab\there\nand newline"));

        let config = FlattenConfig {
            separator: '\t',
            emit_header: true,
            null_text: "NULL".to_string(),
        };
        let output = delimited_output(&[row], config);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(output.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["$.a", "$.b", "$.c", "$.d"]);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![" padded ", "", "NULL", "tab\there\nand newline"]
        );
    }

    #[test]
    fn test_rejects_multibyte_separator() {
        let config = FlattenConfig {
            separator: 'é',
            ..FlattenConfig::default()
        };
        assert!(RowWriter::new(Vec::new(), OutputFormat::Delimited, config.clone()).is_err());

        // the separator only matters for delimited output
        assert!(RowWriter::new(Vec::new(), OutputFormat::JsonLines, config).is_ok());
    }
}
