//! Client error types.

use objectstack_model::TransportError;

/// A failure while reading the next chunk from an upload source.
#[derive(Debug, thiserror::Error)]
#[error("failed to read part {part_number} from source: {source}")]
pub struct ChunkError {
    /// The part number that was being read.
    pub part_number: u32,
    /// The underlying I/O failure.
    #[source]
    pub source: std::io::Error,
}

/// Errors returned by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport rejected a request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The upload source could not be read.
    #[error(transparent)]
    ChunkRead(#[from] ChunkError),

    /// A multipart session failed after it was opened and has been aborted.
    #[error("multipart upload {upload_id} for {bucket}/{object} aborted: {source}")]
    IncompleteUpload {
        /// Target bucket.
        bucket: String,
        /// Target object key.
        object: String,
        /// The aborted session.
        upload_id: String,
        /// The part or completion failure that ended the session.
        #[source]
        source: TransportError,
    },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// The transport failure behind this error, if there is one.
    #[must_use]
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) | Self::IncompleteUpload { source: err, .. } => Some(err),
            Self::ChunkRead(_) | Self::Config(_) => None,
        }
    }
}

/// Convenience result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
