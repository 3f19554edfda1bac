//! Purpose: Define the stable public Rust API boundary for jsoncast.
//! Exports: Schema/value types, decode entry points, and the options bag.
//! Role: Public, additive-only surface; hides internal decoder modules.
//! Invariants: This module is the only public path to the decode engine.
//! Invariants: Constraint validation runs after a decode succeeds, never during.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::coerce::from_string_with_schema;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::options::{ConstraintValidator, DecodeOptions};
pub use crate::core::parse::Decoder;
pub use crate::core::schema::{
    ArraySize, FieldDescriptor, IntWidth, Literal, RecordShape, Schema,
};
pub use crate::core::source::{ChunkSource, ReaderSource, StreamSource};
pub use crate::core::value::{OrderedMap, Value};

use std::sync::Arc;

/// Decodes a complete JSON document held in memory.
pub fn from_str(input: &str, schema: &Arc<Schema>, options: DecodeOptions) -> Result<Value, Error> {
    let mut decoder = Decoder::new(schema, options)?;
    decoder.feed_str(input)?;
    decoder.finish()
}

/// Decodes a complete UTF-8 byte buffer.
pub fn from_slice(
    input: &[u8],
    schema: &Arc<Schema>,
    options: DecodeOptions,
) -> Result<Value, Error> {
    let mut decoder = Decoder::new(schema, options)?;
    decoder.feed(input)?;
    decoder.finish()
}

/// Decodes from a chunked source. The source is closed exactly once on
/// every exit path; a decode error takes precedence over a close error.
pub async fn from_stream<S: ChunkSource>(
    source: &mut S,
    schema: &Arc<Schema>,
    options: DecodeOptions,
) -> Result<Value, Error> {
    let outcome = drive(source, schema, options).await;
    let closed = source.close().await;
    let value = outcome?;
    closed?;
    Ok(value)
}

async fn drive<S: ChunkSource>(
    source: &mut S,
    schema: &Arc<Schema>,
    options: DecodeOptions,
) -> Result<Value, Error> {
    let mut decoder = Decoder::new(schema, options)?;
    while let Some(chunk) = source.next_chunk().await? {
        decoder.feed(&chunk)?;
    }
    decoder.finish()
}

/// Reshapes an already-parsed JSON tree into the target schema.
pub fn convert(
    input: &serde_json::Value,
    schema: &Arc<Schema>,
    options: DecodeOptions,
) -> Result<Value, Error> {
    crate::core::traverse::convert(input, schema, &options)
}

fn run_validator(
    value: Value,
    schema: &Arc<Schema>,
    options: DecodeOptions,
    validator: &dyn ConstraintValidator,
) -> Result<Value, Error> {
    if options.validate_constraints {
        validator.validate(&value, schema).map_err(|err| {
            if err.kind() == ErrorKind::Validation {
                err
            } else {
                Error::new(ErrorKind::Validation)
                    .with_message("constraint validation failed")
                    .with_source(err)
            }
        })?;
    }
    Ok(value)
}

/// `from_str` followed by the constraint hook when enabled.
pub fn from_str_validated(
    input: &str,
    schema: &Arc<Schema>,
    options: DecodeOptions,
    validator: &dyn ConstraintValidator,
) -> Result<Value, Error> {
    let value = from_str(input, schema, options)?;
    run_validator(value, schema, options, validator)
}

pub fn from_slice_validated(
    input: &[u8],
    schema: &Arc<Schema>,
    options: DecodeOptions,
    validator: &dyn ConstraintValidator,
) -> Result<Value, Error> {
    let value = from_slice(input, schema, options)?;
    run_validator(value, schema, options, validator)
}

pub async fn from_stream_validated<S: ChunkSource>(
    source: &mut S,
    schema: &Arc<Schema>,
    options: DecodeOptions,
    validator: &dyn ConstraintValidator,
) -> Result<Value, Error> {
    let value = from_stream(source, schema, options).await?;
    run_validator(value, schema, options, validator)
}

pub fn convert_validated(
    input: &serde_json::Value,
    schema: &Arc<Schema>,
    options: DecodeOptions,
    validator: &dyn ConstraintValidator,
) -> Result<Value, Error> {
    let value = convert(input, schema, options)?;
    run_validator(value, schema, options, validator)
}
