//! Upload orchestration.
//!
//! Objects smaller than the configured part size are sent with a single
//! `put_object`. Everything else goes through a multipart session: the
//! source is split into chunks, each chunk is uploaded as a numbered part,
//! and the sorted part list completes the session. Once a session is open
//! it is either completed or aborted, never left behind.

use bytes::Bytes;
use futures::StreamExt;
use objectstack_model::{CompletedPart, Operation, TransportError};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkSplitter};
use crate::config::ClientConfig;
use crate::error::{ChunkError, ClientError, ClientResult};
use crate::register::CompletedParts;
use crate::transport::{Transport, TransportResult};

/// Upload `source` as `bucket/object` and return the resulting entity tag.
///
/// `total_size` selects the path: below `config.part_size` the first chunk
/// is stored with one request, otherwise a multipart session is used. Up to
/// `config.upload_concurrency` parts are in flight at once. The object is
/// stored as `config.content_type`.
pub async fn create_object<T, R>(
    transport: &T,
    config: &ClientConfig,
    bucket: &str,
    object: &str,
    total_size: u64,
    source: R,
) -> ClientResult<String>
where
    T: Transport + ?Sized,
    R: AsyncRead + Unpin + Send,
{
    let mut splitter = ChunkSplitter::new(source, config.part_size)?;

    let content_type = config.content_type.as_str();

    if total_size < config.part_size {
        return put_single(transport, bucket, object, content_type, &mut splitter).await;
    }

    let upload_id = transport
        .initiate_multipart_upload(bucket, object, content_type)
        .await?;
    debug!(bucket, object, upload_id = %upload_id, total_size, "multipart upload started");

    let session = UploadSession {
        transport,
        bucket,
        object,
        upload_id,
    };
    match session
        .upload_parts(splitter, config.upload_concurrency.max(1))
        .await
    {
        Ok(parts) => session.complete(parts).await,
        Err(failure) => Err(session.abort(failure).await),
    }
}

async fn put_single<T, R>(
    transport: &T,
    bucket: &str,
    object: &str,
    content_type: &str,
    splitter: &mut ChunkSplitter<R>,
) -> ClientResult<String>
where
    T: Transport + ?Sized,
    R: AsyncRead + Unpin + Send,
{
    let chunk = match splitter.next_chunk().await {
        Some(chunk) => chunk?,
        None => Chunk {
            part_number: 1,
            length: 0,
            payload: Bytes::new(),
        },
    };
    let etag = transport
        .put_object(bucket, object, content_type, chunk.length, chunk.payload)
        .await?;
    debug!(bucket, object, length = chunk.length, "object uploaded in one request");
    Ok(etag)
}

/// Why an open session has to be aborted.
#[derive(Debug)]
enum SessionFailure {
    Chunk(ChunkError),
    Transport(Operation, TransportError),
}

impl SessionFailure {
    fn operation(&self) -> Option<Operation> {
        match self {
            Self::Chunk(_) => None,
            Self::Transport(op, _) => Some(*op),
        }
    }
}

/// An open multipart session. `complete` and `abort` consume it, so it is
/// finalized exactly once.
#[derive(Debug)]
struct UploadSession<'a, T: ?Sized> {
    transport: &'a T,
    bucket: &'a str,
    object: &'a str,
    upload_id: String,
}

impl<T: Transport + ?Sized> UploadSession<'_, T> {
    /// Upload every chunk of `splitter`, at most `concurrency` at a time.
    /// Reading the next chunk overlaps with the parts already in flight.
    async fn upload_parts<R>(
        &self,
        splitter: ChunkSplitter<R>,
        concurrency: usize,
    ) -> Result<CompletedParts, SessionFailure>
    where
        R: AsyncRead + Unpin + Send,
    {
        let uploads = splitter
            .into_stream()
            .map(move |chunk| async move {
                let chunk = chunk.map_err(SessionFailure::Chunk)?;
                self.upload_chunk(chunk)
                    .await
                    .map_err(|e| SessionFailure::Transport(Operation::UploadPart, e))
            })
            .buffer_unordered(concurrency);
        let mut uploads = std::pin::pin!(uploads);

        let mut parts = CompletedParts::new();
        while let Some(result) = uploads.next().await {
            parts.add(result?);
        }
        Ok(parts)
    }

    async fn upload_chunk(&self, chunk: Chunk) -> TransportResult<CompletedPart> {
        let Chunk {
            part_number,
            length,
            payload,
        } = chunk;
        let etag = self
            .transport
            .upload_part(
                self.bucket,
                self.object,
                &self.upload_id,
                part_number,
                length,
                payload,
            )
            .await?;
        debug!(
            bucket = self.bucket,
            object = self.object,
            upload_id = %self.upload_id,
            part_number,
            length,
            "part uploaded"
        );
        Ok(CompletedPart::new(part_number, etag))
    }

    async fn complete(self, parts: CompletedParts) -> ClientResult<String> {
        let parts = parts.finalize();
        match self
            .transport
            .complete_multipart_upload(self.bucket, self.object, &self.upload_id, &parts)
            .await
        {
            Ok(etag) => {
                info!(
                    bucket = self.bucket,
                    object = self.object,
                    upload_id = %self.upload_id,
                    parts = parts.len(),
                    "multipart upload completed"
                );
                Ok(etag)
            }
            Err(err) => Err(self
                .abort(SessionFailure::Transport(
                    Operation::CompleteMultipartUpload,
                    err,
                ))
                .await),
        }
    }

    /// Abort the session and turn `failure` into the error the caller sees.
    /// A failing abort is logged and otherwise ignored.
    async fn abort(self, failure: SessionFailure) -> ClientError {
        if let Err(err) = self
            .transport
            .abort_multipart_upload(self.bucket, self.object, &self.upload_id)
            .await
        {
            warn!(
                bucket = self.bucket,
                object = self.object,
                upload_id = %self.upload_id,
                failed_operation = ?failure.operation(),
                error = %err,
                "failed to abort multipart upload"
            );
        } else {
            debug!(
                upload_id = %self.upload_id,
                failed_operation = ?failure.operation(),
                "multipart upload aborted"
            );
        }

        match failure {
            SessionFailure::Chunk(err) => ClientError::ChunkRead(err),
            SessionFailure::Transport(_, source) => ClientError::IncompleteUpload {
                bucket: self.bucket.to_owned(),
                object: self.object.to_owned(),
                upload_id: self.upload_id,
                source,
            },
        }
    }
}
