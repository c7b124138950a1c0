//! The public client.
//!
//! [`Client`] wraps a [`Transport`] and a [`ClientConfig`]. Object and
//! bucket operations are split across the [`ObjectApi`] and [`BucketApi`]
//! traits; [`Api`] is their union.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use objectstack_model::{BucketAcl, ObjectMetadata};
use tokio::io::AsyncRead;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::list::{BucketPages, BucketStream, ObjectPages, ObjectStream, Traversal, enumerate};
use crate::transport::Transport;
use crate::upload;

/// Object operations.
#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Upload `size` bytes from `data` and return the entity tag.
    async fn create_object(
        &self,
        bucket: &str,
        object: &str,
        size: u64,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> ClientResult<String>;

    /// Read `length` bytes from `offset`; a zero length reads to the end.
    async fn get_object(
        &self,
        bucket: &str,
        object: &str,
        offset: u64,
        length: u64,
    ) -> ClientResult<(Bytes, ObjectMetadata)>;

    /// Fetch object metadata.
    async fn stat_object(&self, bucket: &str, object: &str) -> ClientResult<ObjectMetadata>;

    /// Remove an object.
    async fn delete_object(&self, bucket: &str, object: &str) -> ClientResult<()>;
}

/// Bucket operations and listings.
#[async_trait]
pub trait BucketApi: Send + Sync {
    /// Create a bucket.
    async fn create_bucket(&self, bucket: &str, acl: BucketAcl) -> ClientResult<()>;

    /// Replace a bucket's canned ACL.
    async fn set_bucket_acl(&self, bucket: &str, acl: BucketAcl) -> ClientResult<()>;

    /// Check that a bucket exists.
    async fn stat_bucket(&self, bucket: &str) -> ClientResult<()>;

    /// Remove an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> ClientResult<()>;

    /// Stream the objects of `bucket` under `prefix`.
    ///
    /// A non-recursive listing returns one page of keys that contain no
    /// `/` past the prefix. A recursive listing walks every page.
    fn list_objects(&self, bucket: &str, prefix: &str, recursive: bool) -> ObjectStream;

    /// Stream every bucket.
    fn list_buckets(&self) -> BucketStream;
}

/// Every client operation.
pub trait Api: ObjectApi + BucketApi {}

impl<C: ObjectApi + BucketApi + ?Sized> Api for C {}

/// Object storage client over a transport `T`.
pub struct Client<T: ?Sized> {
    transport: Arc<T>,
    config: Arc<ClientConfig>,
}

impl<T: ?Sized> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: Transport + 'static> Client<T> {
    /// Create a client owning `transport`.
    pub fn new(transport: T, config: ClientConfig) -> ClientResult<Self> {
        Self::from_shared(Arc::new(transport), config)
    }
}

impl<T: Transport + ?Sized + 'static> Client<T> {
    /// Create a client over a shared transport.
    pub fn from_shared(transport: Arc<T>, config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        debug!(endpoint = %config.endpoint, user_agent = %config.user_agent(), "client created");
        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

#[async_trait]
impl<T: Transport + ?Sized + 'static> ObjectApi for Client<T> {
    async fn create_object(
        &self,
        bucket: &str,
        object: &str,
        size: u64,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> ClientResult<String> {
        upload::create_object(
            self.transport.as_ref(),
            &self.config,
            bucket,
            object,
            size,
            data,
        )
        .await
    }

    async fn get_object(
        &self,
        bucket: &str,
        object: &str,
        offset: u64,
        length: u64,
    ) -> ClientResult<(Bytes, ObjectMetadata)> {
        Ok(self
            .transport
            .get_object(bucket, object, offset, length)
            .await?)
    }

    async fn stat_object(&self, bucket: &str, object: &str) -> ClientResult<ObjectMetadata> {
        Ok(self.transport.head_object(bucket, object).await?)
    }

    async fn delete_object(&self, bucket: &str, object: &str) -> ClientResult<()> {
        self.transport.delete_object(bucket, object).await?;
        debug!(bucket, object, "object deleted");
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + ?Sized + 'static> BucketApi for Client<T> {
    async fn create_bucket(&self, bucket: &str, acl: BucketAcl) -> ClientResult<()> {
        self.transport.put_bucket(bucket, acl).await?;
        info!(bucket, acl = %acl, "bucket created");
        Ok(())
    }

    async fn set_bucket_acl(&self, bucket: &str, acl: BucketAcl) -> ClientResult<()> {
        self.transport.put_bucket_acl(bucket, acl).await?;
        debug!(bucket, acl = %acl, "bucket acl set");
        Ok(())
    }

    async fn stat_bucket(&self, bucket: &str) -> ClientResult<()> {
        Ok(self.transport.head_bucket(bucket).await?)
    }

    async fn delete_bucket(&self, bucket: &str) -> ClientResult<()> {
        self.transport.delete_bucket(bucket).await?;
        info!(bucket, "bucket deleted");
        Ok(())
    }

    fn list_objects(&self, bucket: &str, prefix: &str, recursive: bool) -> ObjectStream {
        let traversal = if recursive {
            Traversal::Recursive
        } else {
            Traversal::Flat
        };
        let fetcher = ObjectPages::new(
            Arc::clone(&self.transport),
            bucket,
            prefix,
            self.config.list_max_keys,
        );
        enumerate(fetcher, traversal)
    }

    fn list_buckets(&self) -> BucketStream {
        enumerate(BucketPages::new(Arc::clone(&self.transport)), Traversal::Flat)
    }
}
