//! The request contract a storage backend must fulfil.
//!
//! The client never touches the wire itself. Signing, encoding and retrying
//! are the transport's business; the orchestrator and the enumerator only
//! rely on the operations below.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use objectstack_model::{
    BucketAcl, BucketMetadata, CompletedPart, ListPage, ObjectMetadata, TransportError,
};

/// Result type returned by every transport operation.
pub type TransportResult<T> = Result<T, TransportError>;

/// Storage backend operations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a multipart session and return its upload ID. The assembled
    /// object is stored as `content_type`.
    async fn initiate_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
    ) -> TransportResult<String>;

    /// Upload one part of a session and return its entity tag.
    async fn upload_part(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number: u32,
        length: u64,
        payload: Bytes,
    ) -> TransportResult<String>;

    /// Assemble the uploaded parts into the final object.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> TransportResult<String>;

    /// Discard a session and its uploaded parts.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
    ) -> TransportResult<()>;

    /// Store an object in a single request and return its entity tag.
    async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        length: u64,
        payload: Bytes,
    ) -> TransportResult<String>;

    /// Read `length` bytes starting at `offset`. A zero length reads to the end.
    async fn get_object(
        &self,
        bucket: &str,
        object: &str,
        offset: u64,
        length: u64,
    ) -> TransportResult<(Bytes, ObjectMetadata)>;

    /// Fetch object metadata.
    async fn head_object(&self, bucket: &str, object: &str) -> TransportResult<ObjectMetadata>;

    /// Remove an object.
    async fn delete_object(&self, bucket: &str, object: &str) -> TransportResult<()>;

    /// Fetch one page of object metadata.
    async fn list_objects(
        &self,
        bucket: &str,
        max_keys: u32,
        marker: &str,
        prefix: &str,
        delimiter: &str,
    ) -> TransportResult<ListPage<ObjectMetadata>>;

    /// Fetch all buckets visible to the caller.
    async fn list_buckets(&self) -> TransportResult<Vec<BucketMetadata>>;

    /// Create a bucket with a canned ACL.
    async fn put_bucket(&self, bucket: &str, acl: BucketAcl) -> TransportResult<()>;

    /// Replace a bucket's canned ACL.
    async fn put_bucket_acl(&self, bucket: &str, acl: BucketAcl) -> TransportResult<()>;

    /// Check that a bucket exists and is accessible.
    async fn head_bucket(&self, bucket: &str) -> TransportResult<()>;

    /// Remove an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> TransportResult<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn initiate_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
    ) -> TransportResult<String> {
        (**self)
            .initiate_multipart_upload(bucket, object, content_type)
            .await
    }

    async fn upload_part(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number: u32,
        length: u64,
        payload: Bytes,
    ) -> TransportResult<String> {
        (**self)
            .upload_part(bucket, object, upload_id, part_number, length, payload)
            .await
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> TransportResult<String> {
        (**self)
            .complete_multipart_upload(bucket, object, upload_id, parts)
            .await
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
    ) -> TransportResult<()> {
        (**self)
            .abort_multipart_upload(bucket, object, upload_id)
            .await
    }

    async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        length: u64,
        payload: Bytes,
    ) -> TransportResult<String> {
        (**self)
            .put_object(bucket, object, content_type, length, payload)
            .await
    }

    async fn get_object(
        &self,
        bucket: &str,
        object: &str,
        offset: u64,
        length: u64,
    ) -> TransportResult<(Bytes, ObjectMetadata)> {
        (**self).get_object(bucket, object, offset, length).await
    }

    async fn head_object(&self, bucket: &str, object: &str) -> TransportResult<ObjectMetadata> {
        (**self).head_object(bucket, object).await
    }

    async fn delete_object(&self, bucket: &str, object: &str) -> TransportResult<()> {
        (**self).delete_object(bucket, object).await
    }

    async fn list_objects(
        &self,
        bucket: &str,
        max_keys: u32,
        marker: &str,
        prefix: &str,
        delimiter: &str,
    ) -> TransportResult<ListPage<ObjectMetadata>> {
        (**self)
            .list_objects(bucket, max_keys, marker, prefix, delimiter)
            .await
    }

    async fn list_buckets(&self) -> TransportResult<Vec<BucketMetadata>> {
        (**self).list_buckets().await
    }

    async fn put_bucket(&self, bucket: &str, acl: BucketAcl) -> TransportResult<()> {
        (**self).put_bucket(bucket, acl).await
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: BucketAcl) -> TransportResult<()> {
        (**self).put_bucket_acl(bucket, acl).await
    }

    async fn head_bucket(&self, bucket: &str) -> TransportResult<()> {
        (**self).head_bucket(bucket).await
    }

    async fn delete_bucket(&self, bucket: &str) -> TransportResult<()> {
        (**self).delete_bucket(bucket).await
    }
}
