//! Purpose: Async decode coverage over chunked sources.
//! Exports: Integration tests only.
//! Role: Verify chunk-boundary independence and the close-exactly-once
//! contract of the stream entry point.
//! Invariants: A decode failure still closes the source exactly once.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use jsoncast::api::{
    self, ChunkSource, DecodeOptions, Error, ErrorKind, FieldDescriptor, IntWidth, ReaderSource,
    RecordShape, Schema, StreamSource, Value,
};

fn arc(schema: Schema) -> Arc<Schema> {
    Arc::new(schema)
}

fn point_schema() -> Arc<Schema> {
    arc(Schema::Record(Arc::new(
        RecordShape::new(
            "Point",
            vec![
                FieldDescriptor::new("x", arc(Schema::Int(IntWidth::Signed64))),
                FieldDescriptor::new("y", arc(Schema::Int(IntWidth::Signed64))),
            ],
            None,
        )
        .expect("valid shape"),
    )))
}

/// Source that tracks how often it was closed.
struct CountingSource {
    chunks: VecDeque<Result<Bytes, std::io::Error>>,
    closes: usize,
}

impl CountingSource {
    fn new(chunks: Vec<Result<Bytes, std::io::Error>>) -> Self {
        Self {
            chunks: chunks.into(),
            closes: 0,
        }
    }
}

impl ChunkSource for CountingSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self.chunks.pop_front() {
            None => Ok(None),
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(Error::new(ErrorKind::SourceRead)
                .with_message("chunk read failed")
                .with_source(err)),
        }
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.closes += 1;
        Ok(())
    }
}

#[tokio::test]
async fn chunked_document_decodes_across_arbitrary_boundaries() {
    let input = br#"{"x": 1, "y": 22}"#;
    for split in 1..input.len() {
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&input[..split])),
            Ok(Bytes::copy_from_slice(&input[split..])),
        ];
        let mut source = StreamSource::new(tokio_stream::iter(chunks));
        let value = api::from_stream(&mut source, &point_schema(), DecodeOptions::default())
            .await
            .expect("decode");
        let Value::Map(map) = value else { panic!("expected map") };
        assert_eq!(map.get("y"), Some(&Value::Int(22)));
    }
}

#[tokio::test]
async fn multibyte_sequences_survive_chunk_splits() {
    let text = "\"sn\u{2603}wm\u{1F600}n\"";
    let bytes = text.as_bytes();
    let schema = arc(Schema::String);
    for split in 1..bytes.len() {
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];
        let mut source = StreamSource::new(tokio_stream::iter(chunks));
        let value = api::from_stream(&mut source, &schema, DecodeOptions::default())
            .await
            .expect("decode");
        assert_eq!(value, Value::Str("sn\u{2603}wm\u{1F600}n".to_string()));
    }
}

#[tokio::test]
async fn source_is_closed_exactly_once_on_success() {
    let mut source = CountingSource::new(vec![
        Ok(Bytes::from_static(b"{\"x\":1,")),
        Ok(Bytes::from_static(b"\"y\":2}")),
    ]);
    api::from_stream(&mut source, &point_schema(), DecodeOptions::default())
        .await
        .expect("decode");
    assert_eq!(source.closes, 1);
}

#[tokio::test]
async fn source_is_closed_exactly_once_on_decode_failure() {
    let mut source = CountingSource::new(vec![Ok(Bytes::from_static(b"{\"x\":1}"))]);
    let err = api::from_stream(&mut source, &point_schema(), DecodeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredFieldNotPresent);
    assert_eq!(source.closes, 1);
}

#[tokio::test]
async fn read_failures_surface_as_source_read_and_still_close() {
    let mut source = CountingSource::new(vec![
        Ok(Bytes::from_static(b"{\"x\":1,")),
        Err(std::io::Error::other("connection reset")),
    ]);
    let err = api::from_stream(&mut source, &point_schema(), DecodeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceRead);
    assert_eq!(source.closes, 1);
}

#[tokio::test]
async fn reader_source_decodes_from_an_async_reader() {
    let input: &[u8] = br#"{"x": 3, "y": 4}"#;
    let mut source = ReaderSource::new(input);
    let value = api::from_stream(&mut source, &point_schema(), DecodeOptions::default())
        .await
        .expect("decode");
    let Value::Map(map) = value else { panic!("expected map") };
    assert_eq!(map.get("x"), Some(&Value::Int(3)));
}

#[tokio::test]
async fn decode_error_takes_precedence_and_trailing_chunks_are_left_unread() {
    let mut source = CountingSource::new(vec![
        Ok(Bytes::from_static(b"{\"x\":\"bad\"")),
        Ok(Bytes::from_static(b",\"y\":2}")),
    ]);
    let err = api::from_stream(&mut source, &point_schema(), DecodeOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleValueForField);
    assert_eq!(source.closes, 1);
    // the second chunk was never pulled
    assert_eq!(source.chunks.len(), 1);
}
