//! Names of the transport operations.

use std::fmt;

/// Every request the client can issue against a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// The PutBucket operation.
    PutBucket,
    /// The PutBucketAcl operation.
    PutBucketAcl,
    /// The HeadBucket operation.
    HeadBucket,
    /// The DeleteBucket operation.
    DeleteBucket,
    /// The ListBuckets operation.
    ListBuckets,
    /// The ListObjects operation.
    ListObjects,
    /// The PutObject operation.
    PutObject,
    /// The GetObject operation.
    GetObject,
    /// The HeadObject operation.
    HeadObject,
    /// The DeleteObject operation.
    DeleteObject,
    /// The InitiateMultipartUpload operation.
    InitiateMultipartUpload,
    /// The UploadPart operation.
    UploadPart,
    /// The CompleteMultipartUpload operation.
    CompleteMultipartUpload,
    /// The AbortMultipartUpload operation.
    AbortMultipartUpload,
}

impl Operation {
    /// Returns the operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PutBucket => "PutBucket",
            Self::PutBucketAcl => "PutBucketAcl",
            Self::HeadBucket => "HeadBucket",
            Self::DeleteBucket => "DeleteBucket",
            Self::ListBuckets => "ListBuckets",
            Self::ListObjects => "ListObjects",
            Self::PutObject => "PutObject",
            Self::GetObject => "GetObject",
            Self::HeadObject => "HeadObject",
            Self::DeleteObject => "DeleteObject",
            Self::InitiateMultipartUpload => "InitiateMultipartUpload",
            Self::UploadPart => "UploadPart",
            Self::CompleteMultipartUpload => "CompleteMultipartUpload",
            Self::AbortMultipartUpload => "AbortMultipartUpload",
        }
    }

    /// Whether the operation belongs to a multipart upload session.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(
            self,
            Self::InitiateMultipartUpload
                | Self::UploadPart
                | Self::CompleteMultipartUpload
                | Self::AbortMultipartUpload
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
