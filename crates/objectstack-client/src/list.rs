//! Streamed, marker-based listings.
//!
//! [`enumerate`] spawns a producer task that pulls pages from a
//! [`PageFetcher`] and hands each item to the consumer over a channel of
//! capacity 1. The producer suspends until the consumer takes the previous
//! item, closes the stream on every exit path, and stops as soon as the
//! consumer drops the [`ItemStream`].

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use objectstack_model::{BucketMetadata, Keyed, ListPage, ObjectMetadata};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace, warn};

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;

/// Delimiter that rolls keys up into one level of hierarchy.
pub const FLAT_DELIMITER: &str = "/";

/// One delivered item, or the error that ended the listing.
pub type StreamedItem<T> = Result<T, ClientError>;

/// Stream of object metadata.
pub type ObjectStream = ItemStream<ObjectMetadata>;

/// Stream of bucket metadata.
pub type BucketStream = ItemStream<BucketMetadata>;

/// How far an enumeration descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// One page, grouped by [`FLAT_DELIMITER`].
    Flat,
    /// Every page, with no grouping.
    Recursive,
}

impl Traversal {
    /// Delimiter sent with each page request.
    #[must_use]
    pub fn delimiter(self) -> &'static str {
        match self {
            Self::Flat => FLAT_DELIMITER,
            Self::Recursive => "",
        }
    }
}

/// Source of listing pages.
#[async_trait]
pub trait PageFetcher: Send + 'static {
    /// Item type on each page.
    type Item: Keyed + Send + 'static;

    /// Fetch the page following `marker` (empty for the first page).
    async fn fetch(&mut self, marker: &str, delimiter: &str)
    -> ClientResult<ListPage<Self::Item>>;
}

/// Consumer end of an enumeration.
pub struct ItemStream<T> {
    inner: ReceiverStream<StreamedItem<T>>,
}

impl<T> fmt::Debug for ItemStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStream").finish_non_exhaustive()
    }
}

impl<T> ItemStream<T> {
    /// Wait for the next item. `None` means the listing is finished.
    pub async fn recv(&mut self) -> Option<StreamedItem<T>> {
        self.inner.next().await
    }
}

impl<T> Stream for ItemStream<T> {
    type Item = StreamedItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Start a listing driven by `fetcher`.
///
/// Must be called from within a tokio runtime.
pub fn enumerate<F: PageFetcher>(fetcher: F, traversal: Traversal) -> ItemStream<F::Item> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(produce(fetcher, traversal, tx));
    ItemStream {
        inner: ReceiverStream::new(rx),
    }
}

async fn produce<F: PageFetcher>(
    mut fetcher: F,
    traversal: Traversal,
    tx: mpsc::Sender<StreamedItem<F::Item>>,
) {
    let delimiter = traversal.delimiter();
    let mut marker = String::new();
    let mut pages = 0usize;

    loop {
        let page = match fetcher.fetch(&marker, delimiter).await {
            Ok(page) => page,
            Err(err) => {
                debug!(pages, error = %err, "listing failed");
                // Nothing left to do if the consumer is gone.
                let _ = tx.send(Err(err)).await;
                return;
            }
        };
        pages += 1;
        trace!(
            pages,
            items = page.items.len(),
            is_truncated = page.is_truncated,
            "page fetched"
        );

        let next_marker = match traversal {
            Traversal::Recursive if page.is_truncated => match page.continuation_marker() {
                Some(next) if next != marker => Some(next),
                _ => {
                    warn!(marker = %marker, "truncated page without a new marker; ending listing");
                    None
                }
            },
            _ => None,
        };

        for item in page.items {
            if tx.send(Ok(item)).await.is_err() {
                debug!(pages, "listing consumer dropped");
                return;
            }
        }

        match next_marker {
            Some(next) => marker = next,
            None => break,
        }
    }

    debug!(pages, "listing finished");
}

// ---------------------------------------------------------------------------
// Fetchers
// ---------------------------------------------------------------------------

/// Pages through the objects of one bucket.
pub struct ObjectPages<T: ?Sized> {
    transport: Arc<T>,
    bucket: String,
    prefix: String,
    max_keys: u32,
}

impl<T: ?Sized> fmt::Debug for ObjectPages<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPages")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("max_keys", &self.max_keys)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + ?Sized> ObjectPages<T> {
    /// Page through `bucket`, restricted to keys starting with `prefix`.
    pub fn new(
        transport: Arc<T>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        max_keys: u32,
    ) -> Self {
        Self {
            transport,
            bucket: bucket.into(),
            prefix: prefix.into(),
            max_keys,
        }
    }
}

#[async_trait]
impl<T: Transport + ?Sized + 'static> PageFetcher for ObjectPages<T> {
    type Item = ObjectMetadata;

    async fn fetch(
        &mut self,
        marker: &str,
        delimiter: &str,
    ) -> ClientResult<ListPage<ObjectMetadata>> {
        let page = self
            .transport
            .list_objects(&self.bucket, self.max_keys, marker, &self.prefix, delimiter)
            .await?;
        Ok(page)
    }
}

/// The bucket list, fetched in one request.
pub struct BucketPages<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ?Sized> fmt::Debug for BucketPages<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketPages").finish_non_exhaustive()
    }
}

impl<T: Transport + ?Sized> BucketPages<T> {
    /// List the buckets visible through `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport + ?Sized + 'static> PageFetcher for BucketPages<T> {
    type Item = BucketMetadata;

    async fn fetch(
        &mut self,
        _marker: &str,
        _delimiter: &str,
    ) -> ClientResult<ListPage<BucketMetadata>> {
        let buckets = self.transport.list_buckets().await?;
        Ok(ListPage::complete(buckets))
    }
}
