//! Splitting an upload source into numbered, length-bounded chunks.

use std::fmt;

use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ChunkError, ClientError, ClientResult};

/// Upper bound on the up-front buffer reservation for one chunk.
const DEFAULT_READ_CAPACITY: usize = 8 * 1024 * 1024;

/// One part of an upload, read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based part number.
    pub part_number: u32,
    /// Number of bytes in `payload`.
    pub length: u64,
    /// The part data.
    pub payload: Bytes,
}

/// Reads a source sequentially into chunks of at most `part_size` bytes.
///
/// Every chunk but the last holds exactly `part_size` bytes. An empty source
/// yields no chunks. A read failure is reported once, after which the
/// splitter is exhausted.
pub struct ChunkSplitter<R> {
    source: R,
    part_size: u64,
    next_part: u32,
    done: bool,
}

impl<R> fmt::Debug for ChunkSplitter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkSplitter")
            .field("part_size", &self.part_size)
            .field("next_part", &self.next_part)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin> ChunkSplitter<R> {
    /// Create a splitter over `source`.
    pub fn new(source: R, part_size: u64) -> ClientResult<Self> {
        if part_size == 0 {
            return Err(ClientError::Config("part size must be positive".to_owned()));
        }
        Ok(Self {
            source,
            part_size,
            next_part: 1,
            done: false,
        })
    }

    /// Read the next chunk. Returns `None` once the source is exhausted.
    pub async fn next_chunk(&mut self) -> Option<Result<Chunk, ChunkError>> {
        if self.done {
            return None;
        }

        let part_number = self.next_part;
        let capacity = usize::try_from(self.part_size).unwrap_or(usize::MAX);
        let mut buf = Vec::with_capacity(capacity.min(DEFAULT_READ_CAPACITY));
        let mut limited = (&mut self.source).take(self.part_size);

        match limited.read_to_end(&mut buf).await {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                let length = n as u64;
                if length < self.part_size {
                    self.done = true;
                }
                self.next_part += 1;
                Some(Ok(Chunk {
                    part_number,
                    length,
                    payload: Bytes::from(buf),
                }))
            }
            Err(source) => {
                self.done = true;
                Some(Err(ChunkError {
                    part_number,
                    source,
                }))
            }
        }
    }

    /// Expose the remaining chunks as a stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Chunk, ChunkError>> {
        futures::stream::unfold(self, |mut splitter| async move {
            splitter
                .next_chunk()
                .await
                .map(|chunk| (chunk, splitter))
        })
    }
}
