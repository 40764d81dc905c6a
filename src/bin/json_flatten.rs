//! json-flatten: Select fields from nested JSON and emit flat rows
//!
//! Usage:
//!   # Select two fields from a file, JSON Lines to stdout
//!   json-flatten data.json -p '$.id' -p '$.posts[*].title'
//!
//!   # Read from stdin, write CSV
//!   cat data.json | json-flatten -p '$.a' -p '$.b[*].c' --format delimited
//!
//!   # Use a named selection from a schema file, one document per line
//!   json-flatten --ndjson events.jsonl --schema-file schemas.json --schema events

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use json_flatten::{
    flatten_json, FlattenConfig, JsonFlattener, OutputFormat, RowWriter, SchemaCache, SchemaFile,
};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// One JSON object per row
    Jsonl,
    /// Separator-delimited cells with a header line
    Delimited,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Jsonl => OutputFormat::JsonLines,
            Format::Delimited => OutputFormat::Delimited,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "json-flatten")]
#[command(about = "Select fields from nested JSON and emit flat rows", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Field path to select, e.g. '$.tags.runID' or '$.items[*].sku' (repeatable)
    #[arg(long = "path", short = 'p', value_name = "PATH")]
    paths: Vec<String>,

    /// JSON file of named path lists: {"schemas": {"<name>": ["$.a", ...]}}
    #[arg(long, requires = "schema", conflicts_with = "paths")]
    schema_file: Option<String>,

    /// Name of the path list to use from --schema-file
    #[arg(long, requires = "schema_file")]
    schema: Option<String>,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Jsonl)]
    format: Format,

    /// Cell separator for delimited output (default: ",")
    #[arg(long)]
    separator: Option<char>,

    /// Omit the header line in delimited output
    #[arg(long)]
    no_header: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("json_flatten=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Build config
    let mut config = FlattenConfig::default();
    if let Some(sep) = args.separator {
        config.separator = sep;
    }
    if args.no_header {
        config.emit_header = false;
    }

    let flattener = build_flattener(&args)?;

    let reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?,
        )) as Box<dyn BufRead>
    } else {
        Box::new(BufReader::new(std::io::stdin())) as Box<dyn BufRead>
    };

    let stdout = std::io::stdout();
    let mut writer = RowWriter::new(stdout.lock(), args.format.into(), config)?;

    let written = if args.ndjson {
        flatten_json(reader, &flattener, &mut writer)?
    } else {
        process_document(reader, &flattener, &mut writer)?
    };

    writer.flush()?;
    tracing::info!(rows = written, "flatten complete");
    Ok(())
}

/// Resolve the selection from --path flags or a named schema
fn build_flattener(args: &Args) -> Result<JsonFlattener> {
    if let (Some(schema_file), Some(schema)) = (&args.schema_file, &args.schema) {
        let schemas = SchemaFile::load(schema_file)
            .with_context(|| format!("Failed to load schema file {}", schema_file))?;
        let mut cache = SchemaCache::new();
        return Ok(schemas.flattener(schema, &mut cache)?);
    }

    if args.paths.is_empty() {
        bail!("no fields selected: pass --path at least once, or --schema-file with --schema");
    }
    Ok(JsonFlattener::new(args.paths.as_slice())?)
}

/// Flatten the whole input as a single document using SIMD parsing
fn process_document<W: std::io::Write>(
    mut reader: Box<dyn BufRead>,
    flattener: &JsonFlattener,
    writer: &mut RowWriter<W>,
) -> Result<usize> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;

    let rows = flattener
        .flatten_bytes(&mut content)
        .context("Failed to flatten input")?;
    writer.write_rows(&rows)?;
    Ok(rows.len())
}
