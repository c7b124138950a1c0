//! Object, bucket and listing types exchanged with a transport.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keyed
// ---------------------------------------------------------------------------

/// An item that can serve as a pagination marker.
pub trait Keyed {
    /// The key that identifies this item in a listing.
    fn key(&self) -> &str;
}

// ---------------------------------------------------------------------------
// ObjectMetadata / BucketMetadata
// ---------------------------------------------------------------------------

/// Metadata describing a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// The object key.
    pub key: String,
    /// When the object was last written.
    pub last_modified: DateTime<Utc>,
    /// The entity tag, quoted as reported by the server.
    pub etag: String,
    /// The object size in bytes.
    pub size: u64,
    /// The content type of the object.
    pub content_type: String,
}

impl Keyed for ObjectMetadata {
    fn key(&self) -> &str {
        &self.key
    }
}

/// Metadata describing a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketMetadata {
    /// The bucket name.
    pub name: String,
    /// When the bucket was created.
    pub creation_date: DateTime<Utc>,
}

impl Keyed for BucketMetadata {
    fn key(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// BucketAcl
// ---------------------------------------------------------------------------

/// Canned access control applied to a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketAcl {
    /// Only the owner has access (default).
    #[default]
    Private,
    /// Anyone may read.
    PublicRead,
    /// Anyone may read and write.
    PublicReadWrite,
    /// Any authenticated user may read.
    AuthenticatedRead,
}

impl BucketAcl {
    /// Return the wire string of the canned ACL.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl fmt::Display for BucketAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`BucketAcl`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bucket ACL: {0}")]
pub struct ParseBucketAclError(String);

impl FromStr for BucketAcl {
    type Err = ParseBucketAclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            _ => Err(ParseBucketAclError(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// CompletedPart
// ---------------------------------------------------------------------------

/// A part that was uploaded successfully within a multipart session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// Entity tag returned by the server for this part.
    pub etag: String,
}

impl CompletedPart {
    /// Create a new completed part record.
    #[must_use]
    pub fn new(part_number: u32, etag: impl Into<String>) -> Self {
        Self {
            part_number,
            etag: etag.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ListPage
// ---------------------------------------------------------------------------

/// One page of a marker-based listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    /// Items on this page, in listing order.
    pub items: Vec<T>,
    /// Key groups rolled up by the delimiter.
    #[serde(default)]
    pub common_prefixes: Vec<String>,
    /// Whether more items follow this page.
    pub is_truncated: bool,
    /// Marker the server suggests for the next request.
    #[serde(default)]
    pub next_marker: Option<String>,
}

impl<T> Default for ListPage<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            common_prefixes: Vec::new(),
            is_truncated: false,
            next_marker: None,
        }
    }
}

impl<T> ListPage<T> {
    /// A final page holding `items`.
    #[must_use]
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }
}

impl<T: Keyed> ListPage<T> {
    /// Marker to continue from: the last item's key, or `next_marker` when
    /// the page carries no items.
    #[must_use]
    pub fn continuation_marker(&self) -> Option<String> {
        self.items
            .last()
            .map(|item| item.key().to_owned())
            .or_else(|| self.next_marker.clone())
    }
}
