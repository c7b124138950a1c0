//! In-memory transport.
//!
//! [`InMemoryTransport`] implements the whole [`Transport`] contract against
//! process-local maps. Buckets live in a [`DashMap`]; each bucket keeps its
//! objects in a `BTreeMap` behind a `parking_lot` lock so listings come out
//! in lexicographic key order. Multipart sessions are tracked separately
//! until they are completed or aborted.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use md5::{Digest, Md5};
use objectstack_model::{
    BucketAcl, BucketMetadata, CompletedPart, ErrorCode, ListPage, ObjectMetadata, TransportError,
};
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::transport::{Transport, TransportResult};

/// Highest part number a multipart session accepts.
pub const MAX_PART_NUMBER: u32 = 10_000;

// ---------------------------------------------------------------------------
// Checksums
// ---------------------------------------------------------------------------

/// Quoted hex MD5 of `data`, e.g. `"d41d8cd98f00b204e9800998ecf8427e"`.
#[must_use]
pub fn compute_etag(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(data)))
}

/// Entity tag of an assembled multipart object: the MD5 of the concatenated
/// part digests, suffixed with the part count.
#[must_use]
pub fn compute_multipart_etag(part_etags: &[impl AsRef<str>]) -> String {
    let mut combined = Vec::with_capacity(part_etags.len() * 16);
    for etag in part_etags {
        if let Ok(bytes) = hex::decode(etag.as_ref().trim_matches('"')) {
            combined.extend_from_slice(&bytes);
        }
    }
    let digest = hex::encode(Md5::digest(&combined));
    format!("\"{digest}-{}\"", part_etags.len())
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    metadata: ObjectMetadata,
}

#[derive(Debug)]
struct BucketState {
    created: DateTime<Utc>,
    acl: RwLock<BucketAcl>,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

#[derive(Debug)]
struct UploadPart {
    data: Bytes,
    etag: String,
}

#[derive(Debug)]
struct PendingUpload {
    bucket: String,
    object: String,
    content_type: String,
    parts: BTreeMap<u32, UploadPart>,
}

/// Thread-safe, process-local storage backend.
///
/// # Examples
///
/// ```
/// use objectstack_client::{BucketApi, Client, ClientConfig, InMemoryTransport, ObjectApi};
/// use objectstack_client::model::BucketAcl;
///
/// # tokio_test::block_on(async {
/// let client = Client::new(InMemoryTransport::new(), ClientConfig::default()).unwrap();
/// client.create_bucket("photos", BucketAcl::Private).await.unwrap();
/// client
///     .create_object("photos", "cat.jpg", 5, &mut &b"meow!"[..])
///     .await
///     .unwrap();
///
/// let (data, meta) = client.get_object("photos", "cat.jpg", 0, 0).await.unwrap();
/// assert_eq!(data.as_ref(), b"meow!");
/// assert_eq!(meta.size, 5);
/// # });
/// ```
pub struct InMemoryTransport {
    buckets: DashMap<String, BucketState>,
    uploads: DashMap<String, PendingUpload>,
}

impl fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("buckets", &self.buckets.len())
            .field("uploads", &self.uploads.len())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            uploads: DashMap::new(),
        }
    }

    /// Number of objects stored in `bucket`, zero if it does not exist.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .get(bucket)
            .map_or(0, |state| state.objects.read().len())
    }

    /// Number of multipart sessions neither completed nor aborted.
    #[must_use]
    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }

    /// The canned ACL currently applied to `bucket`.
    #[must_use]
    pub fn bucket_acl(&self, bucket: &str) -> Option<BucketAcl> {
        self.buckets.get(bucket).map(|state| *state.acl.read())
    }

    /// Drop every bucket, object and pending session.
    pub fn reset(&self) {
        self.buckets.clear();
        self.uploads.clear();
        info!("in-memory transport reset");
    }

    fn ensure_bucket(&self, bucket: &str) -> TransportResult<()> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(TransportError::no_such_bucket(bucket))
        }
    }

    fn store(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        data: Bytes,
        etag: String,
    ) -> TransportResult<()> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?;
        let metadata = ObjectMetadata {
            key: object.to_owned(),
            last_modified: Utc::now(),
            etag,
            size: data.len() as u64,
            content_type: content_type.to_owned(),
        };
        state
            .objects
            .write()
            .insert(object.to_owned(), StoredObject { data, metadata });
        Ok(())
    }
}

fn check_length(length: u64, payload: &Bytes) -> TransportResult<()> {
    if payload.len() as u64 == length {
        Ok(())
    } else {
        Err(TransportError::invalid_argument(format!(
            "declared length {length} does not match body of {} bytes",
            payload.len()
        )))
    }
}

/// Build one listing page from keys in ascending order.
fn list_from_btree<'a>(
    objects: impl Iterator<Item = &'a StoredObject>,
    prefix: &str,
    delimiter: &str,
    marker: &str,
    max_keys: usize,
) -> ListPage<ObjectMetadata> {
    let use_delim = !delimiter.is_empty();
    let mut items: Vec<ObjectMetadata> = Vec::new();
    let mut common_prefixes: Vec<String> = Vec::new();
    let mut seen_prefixes = HashSet::new();
    let mut is_truncated = false;

    for obj in objects {
        let key = obj.metadata.key.as_str();
        if !marker.is_empty() && key <= marker {
            continue;
        }
        if !key.starts_with(prefix) {
            continue;
        }

        if use_delim {
            let after_prefix = &key[prefix.len()..];
            if let Some(pos) = after_prefix.find(delimiter) {
                let cp = format!("{prefix}{}{delimiter}", &after_prefix[..pos]);
                if seen_prefixes.insert(cp.clone()) {
                    common_prefixes.push(cp);
                }
                continue;
            }
        }

        if items.len() >= max_keys {
            is_truncated = true;
            break;
        }
        items.push(obj.metadata.clone());
    }

    let next_marker = if is_truncated {
        items.last().map(|o| o.key.clone())
    } else {
        None
    };

    ListPage {
        items,
        common_prefixes,
        is_truncated,
        next_marker,
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[async_trait]
impl Transport for InMemoryTransport {
    async fn initiate_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
    ) -> TransportResult<String> {
        self.ensure_bucket(bucket)?;
        let upload_id = Uuid::new_v4().simple().to_string();
        self.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_owned(),
                object: object.to_owned(),
                content_type: content_type.to_owned(),
                parts: BTreeMap::new(),
            },
        );
        debug!(bucket, object, upload_id = %upload_id, "multipart upload initiated");
        Ok(upload_id)
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
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(TransportError::invalid_argument(format!(
                "part number must be between 1 and {MAX_PART_NUMBER}"
            )));
        }
        check_length(length, &payload)?;

        let mut upload = self
            .uploads
            .get_mut(upload_id)
            .filter(|u| u.bucket == bucket && u.object == object)
            .ok_or_else(|| TransportError::no_such_upload(upload_id))?;
        let etag = compute_etag(&payload);
        upload.parts.insert(
            part_number,
            UploadPart {
                data: payload,
                etag: etag.clone(),
            },
        );
        debug!(bucket, object, upload_id, part_number, length, "part stored");
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> TransportResult<String> {
        {
            let upload = self
                .uploads
                .get(upload_id)
                .filter(|u| u.bucket == bucket && u.object == object)
                .ok_or_else(|| TransportError::no_such_upload(upload_id))?;

            if parts.is_empty() {
                return Err(TransportError::invalid_argument(
                    "a multipart upload needs at least one part",
                ));
            }
            if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
                return Err(TransportError::invalid_part_order(upload_id));
            }
            for part in parts {
                match upload.parts.get(&part.part_number) {
                    Some(stored) if stored.etag == part.etag => {}
                    _ => {
                        return Err(TransportError::invalid_part(format!(
                            "part {} ({})",
                            part.part_number, part.etag
                        )));
                    }
                }
            }
        }

        let (_, upload) = self
            .uploads
            .remove(upload_id)
            .ok_or_else(|| TransportError::no_such_upload(upload_id))?;

        let total: usize = parts
            .iter()
            .filter_map(|p| upload.parts.get(&p.part_number))
            .map(|p| p.data.len())
            .sum();
        let mut data = BytesMut::with_capacity(total);
        for part in parts {
            if let Some(stored) = upload.parts.get(&part.part_number) {
                data.extend_from_slice(&stored.data);
            }
        }

        let etags: Vec<&str> = parts.iter().map(|p| p.etag.as_str()).collect();
        let etag = compute_multipart_etag(&etags);
        self.store(
            bucket,
            object,
            &upload.content_type,
            data.freeze(),
            etag.clone(),
        )?;
        debug!(bucket, object, upload_id, parts = parts.len(), "multipart upload completed");
        Ok(etag)
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
    ) -> TransportResult<()> {
        let removed = self
            .uploads
            .remove_if(upload_id, |_, u| u.bucket == bucket && u.object == object);
        if removed.is_none() {
            return Err(TransportError::no_such_upload(upload_id));
        }
        debug!(bucket, object, upload_id, "multipart upload aborted");
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        length: u64,
        payload: Bytes,
    ) -> TransportResult<String> {
        check_length(length, &payload)?;
        let etag = compute_etag(&payload);
        self.store(bucket, object, content_type, payload, etag.clone())?;
        debug!(bucket, object, length, "object stored");
        Ok(etag)
    }

    async fn get_object(
        &self,
        bucket: &str,
        object: &str,
        offset: u64,
        length: u64,
    ) -> TransportResult<(Bytes, ObjectMetadata)> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?;
        let objects = state.objects.read();
        let stored = objects
            .get(object)
            .ok_or_else(|| TransportError::no_such_key(object))?;

        let size = stored.metadata.size;
        let end = if length == 0 {
            size
        } else {
            offset.saturating_add(length)
        };
        if offset > size || end > size {
            return Err(TransportError::invalid_range(format!(
                "bytes={offset}-{end} of {size}"
            )));
        }

        let (start, end) = (
            usize::try_from(offset).map_err(|_| TransportError::new(ErrorCode::InvalidRange))?,
            usize::try_from(end).map_err(|_| TransportError::new(ErrorCode::InvalidRange))?,
        );
        Ok((stored.data.slice(start..end), stored.metadata.clone()))
    }

    async fn head_object(&self, bucket: &str, object: &str) -> TransportResult<ObjectMetadata> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?;
        let objects = state.objects.read();
        objects
            .get(object)
            .map(|o| o.metadata.clone())
            .ok_or_else(|| TransportError::no_such_key(object))
    }

    async fn delete_object(&self, bucket: &str, object: &str) -> TransportResult<()> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?;
        if state.objects.write().remove(object).is_none() {
            return Err(TransportError::no_such_key(object));
        }
        debug!(bucket, object, "object deleted");
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        max_keys: u32,
        marker: &str,
        prefix: &str,
        delimiter: &str,
    ) -> TransportResult<ListPage<ObjectMetadata>> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?;
        let objects = state.objects.read();
        let max_keys = usize::try_from(max_keys).unwrap_or(usize::MAX);
        let page = list_from_btree(objects.values(), prefix, delimiter, marker, max_keys);
        debug!(
            bucket,
            marker,
            prefix,
            delimiter,
            items = page.items.len(),
            is_truncated = page.is_truncated,
            "objects listed"
        );
        Ok(page)
    }

    async fn list_buckets(&self) -> TransportResult<Vec<BucketMetadata>> {
        let mut buckets: Vec<BucketMetadata> = self
            .buckets
            .iter()
            .map(|entry| BucketMetadata {
                name: entry.key().clone(),
                creation_date: entry.value().created,
            })
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn put_bucket(&self, bucket: &str, acl: BucketAcl) -> TransportResult<()> {
        match self.buckets.entry(bucket.to_owned()) {
            Entry::Occupied(_) => Err(TransportError::bucket_already_owned_by_you(bucket)),
            Entry::Vacant(slot) => {
                slot.insert(BucketState {
                    created: Utc::now(),
                    acl: RwLock::new(acl),
                    objects: RwLock::new(BTreeMap::new()),
                });
                info!(bucket, acl = %acl, "bucket created");
                Ok(())
            }
        }
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: BucketAcl) -> TransportResult<()> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?;
        *state.acl.write() = acl;
        debug!(bucket, acl = %acl, "bucket acl updated");
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> TransportResult<()> {
        self.ensure_bucket(bucket)
    }

    async fn delete_bucket(&self, bucket: &str) -> TransportResult<()> {
        let not_empty = !self
            .buckets
            .get(bucket)
            .ok_or_else(|| TransportError::no_such_bucket(bucket))?
            .objects
            .read()
            .is_empty();
        if not_empty {
            return Err(TransportError::bucket_not_empty(bucket));
        }
        self.buckets.remove(bucket);
        info!(bucket, "bucket deleted");
        Ok(())
    }
}
