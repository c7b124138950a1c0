//! Data model shared by the ObjectStack client and its transports.
//!
//! Nothing in this crate performs I/O. It defines the metadata records,
//! canned ACLs, listing pages and the error type a transport reports.

pub mod error;
pub mod operations;
pub mod types;

pub use error::{ErrorCode, TransportError};
pub use operations::Operation;
pub use types::{
    BucketAcl, BucketMetadata, CompletedPart, Keyed, ListPage, ObjectMetadata,
    ParseBucketAclError,
};
