//! Purpose: `jsoncast` CLI entry point.
//! Role: Binary crate root; parses args, decodes a document, emits JSON on stdout.
//! Invariants: Decoded output is a single JSON document on stdout.
//! Invariants: Errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Map};
use tracing_subscriber::EnvFilter;

use jsoncast::api::{
    self, DecodeOptions, Error, ErrorKind, ReaderSource, Schema, Value, to_exit_code,
};

mod schema_text;

#[derive(Parser)]
#[command(
    name = "jsoncast",
    version,
    about = "Decode JSON documents directly into typed shapes",
    after_help = r#"EXAMPLES
  $ jsoncast --schema person.schema.json input.json
  $ cat input.json | jsoncast --schema person.schema.json
  $ jsoncast --schema person.schema.json --projection input.json

NOTES
  - The schema descriptor is itself JSON; see the repository docs for the dialect.
  - Without an input path, the document is streamed from stdin."#
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Schema descriptor file (JSON)")]
    schema: PathBuf,

    #[arg(help = "Input document; streams from stdin when omitted")]
    input: Option<PathBuf>,

    #[arg(long, help = "Drop input fields or elements the schema does not describe")]
    projection: bool,

    #[arg(long, help = "Treat explicit null for optional fields as absence")]
    nil_as_optional: bool,

    #[arg(long, help = "Let absent nilable fields satisfy required-ness")]
    absent_as_nilable: bool,

    #[arg(long, help = "Pretty-print the decoded value")]
    pretty: bool,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    let schema_text = fs::read_to_string(&cli.schema).map_err(|err| {
        Error::new(ErrorKind::SourceRead)
            .with_message(format!(
                "failed to read schema file '{}'",
                cli.schema.display()
            ))
            .with_source(err)
    })?;
    let schema = schema_text::parse_schema(&schema_text)?;

    let options = DecodeOptions {
        projection: cli.projection,
        nil_as_optional_field: cli.nil_as_optional,
        absent_as_nilable_type: cli.absent_as_nilable,
        validate_constraints: false,
    };

    let value = decode_input(&cli, &schema, options)?;
    let rendered = render(&value, cli.pretty);
    println!("{rendered}");
    Ok(())
}

fn decode_input(cli: &Cli, schema: &Arc<Schema>, options: DecodeOptions) -> Result<Value, Error> {
    match &cli.input {
        Some(path) => {
            let bytes = fs::read(path).map_err(|err| {
                Error::new(ErrorKind::SourceRead)
                    .with_message(format!("failed to read input file '{}'", path.display()))
                    .with_source(err)
            })?;
            api::from_slice(&bytes, schema, options)
        }
        None => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::SourceRead)
                        .with_message("failed to start async runtime")
                        .with_source(err)
                })?;
            runtime.block_on(async {
                let mut source = ReaderSource::new(tokio::io::stdin());
                api::from_stream(&mut source, schema, options).await
            })
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let json = value.to_json();
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.unwrap_or_else(|_| "null".to_string())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn emit_error(err: &Error) {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    if let Some(message) = err.message() {
        inner.insert("message".to_string(), json!(message));
    }
    if let Some((line, column)) = err.location() {
        inner.insert("line".to_string(), json!(line));
        inner.insert("column".to_string(), json!(column));
    }
    if let Some(path) = err.field_path() {
        inner.insert("field".to_string(), json!(path));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), serde_json::Value::Object(inner));
    let rendered = serde_json::to_string(&serde_json::Value::Object(outer)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Syntax\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{rendered}");
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}
