//! Purpose: Pull-based byte sources feeding the streaming decoder.
//! Exports: `ChunkSource`, `StreamSource`, `ReaderSource`.
//! Role: Decouples the decode loop from where the bytes come from.
//! Invariants: `close` is called exactly once per decode, on every exit path.
//! Invariants: Source failures surface as `SourceRead` with the cause chained.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_stream::{Stream, StreamExt};

use crate::core::error::{Error, ErrorKind};

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// A byte source the decode loop pulls from. `next_chunk` returns `None`
/// at end of input; `close` releases the source.
#[allow(async_fn_in_trait)]
pub trait ChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error>;
    async fn close(&mut self) -> Result<(), Error>;
}

/// Adapts a fallible byte-chunk stream.
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> ChunkSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self.inner.next().await {
            None => Ok(None),
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(Error::new(ErrorKind::SourceRead)
                .with_message("failed to read next chunk from stream")
                .with_source(err)),
        }
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Adapts any async reader, pulling fixed-size chunks.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let read = self.inner.read(&mut buf).await.map_err(|err| {
            Error::new(ErrorKind::SourceRead)
                .with_message("failed to read from reader")
                .with_source(err)
        })?;
        if read == 0 {
            Ok(None)
        } else {
            buf.truncate(read);
            Ok(Some(Bytes::from(buf)))
        }
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_source_yields_chunks_then_none() {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"{}")), Ok(Bytes::from_static(b" "))];
        let mut source = StreamSource::new(tokio_stream::iter(chunks));
        assert_eq!(
            source.next_chunk().await.unwrap(),
            Some(Bytes::from_static(b"{}"))
        );
        assert_eq!(
            source.next_chunk().await.unwrap(),
            Some(Bytes::from_static(b" "))
        );
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_source_maps_failures_to_source_read() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![Err(std::io::Error::other("boom"))];
        let mut source = StreamSource::new(tokio_stream::iter(chunks));
        let err = source.next_chunk().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceRead);
    }

    #[tokio::test]
    async fn reader_source_drains_to_none() {
        let mut source = ReaderSource::new(&b"[1,2]"[..]);
        let mut collected = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"[1,2]");
    }
}
