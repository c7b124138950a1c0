//! Client configuration.
//!
//! [`ClientConfig`] carries the endpoint, credentials and the tuning knobs
//! the upload orchestrator and the listing enumerator read. The part size is
//! fixed per client; individual calls cannot override it.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{ClientError, ClientResult};

/// Default size of a multipart chunk, and the single-request threshold: 5 MiB.
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default page size for object listings.
pub const DEFAULT_LIST_MAX_KEYS: u32 = 1000;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9000";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Object storage client configuration.
///
/// # Examples
///
/// ```
/// use objectstack_client::config::{ClientConfig, DEFAULT_PART_SIZE};
///
/// let config = ClientConfig::default();
/// assert_eq!(config.part_size, DEFAULT_PART_SIZE);
/// assert_eq!(config.upload_concurrency, 1);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the storage service.
    #[builder(default = String::from(DEFAULT_ENDPOINT))]
    pub endpoint: String,

    /// Access key used to sign requests.
    #[builder(default)]
    pub access_key_id: String,

    /// Secret key used to sign requests.
    #[builder(default)]
    #[serde(skip_serializing, default)]
    pub secret_access_key: String,

    /// Content type attached to uploaded objects.
    #[builder(default = String::from(DEFAULT_CONTENT_TYPE))]
    pub content_type: String,

    /// Chunk size for multipart uploads; smaller objects go out in one request.
    #[builder(default = DEFAULT_PART_SIZE)]
    pub part_size: u64,

    /// Page size requested from the server when listing objects.
    #[builder(default = DEFAULT_LIST_MAX_KEYS)]
    pub list_max_keys: u32,

    /// Maximum number of part uploads in flight for one object.
    #[builder(default = 1)]
    pub upload_concurrency: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(DEFAULT_ENDPOINT),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            content_type: String::from(DEFAULT_CONTENT_TYPE),
            part_size: DEFAULT_PART_SIZE,
            list_max_keys: DEFAULT_LIST_MAX_KEYS,
            upload_concurrency: 1,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("content_type", &self.content_type)
            .field("part_size", &self.part_size)
            .field("list_max_keys", &self.list_max_keys)
            .field("upload_concurrency", &self.upload_concurrency)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OBJECTSTACK_ENDPOINT` | `http://127.0.0.1:9000` |
    /// | `OBJECTSTACK_ACCESS_KEY_ID` | empty |
    /// | `OBJECTSTACK_SECRET_ACCESS_KEY` | empty |
    /// | `OBJECTSTACK_CONTENT_TYPE` | `application/octet-stream` |
    /// | `OBJECTSTACK_PART_SIZE` | `5242880` |
    /// | `OBJECTSTACK_LIST_MAX_KEYS` | `1000` |
    /// | `OBJECTSTACK_UPLOAD_CONCURRENCY` | `1` |
    ///
    /// Unparseable numbers keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("OBJECTSTACK_ENDPOINT") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("OBJECTSTACK_ACCESS_KEY_ID") {
            config.access_key_id = v;
        }
        if let Ok(v) = std::env::var("OBJECTSTACK_SECRET_ACCESS_KEY") {
            config.secret_access_key = v;
        }
        if let Ok(v) = std::env::var("OBJECTSTACK_CONTENT_TYPE") {
            config.content_type = v;
        }
        if let Ok(v) = std::env::var("OBJECTSTACK_PART_SIZE") {
            if let Ok(n) = v.parse::<u64>() {
                config.part_size = n;
            }
        }
        if let Ok(v) = std::env::var("OBJECTSTACK_LIST_MAX_KEYS") {
            if let Ok(n) = v.parse::<u32>() {
                config.list_max_keys = n;
            }
        }
        if let Ok(v) = std::env::var("OBJECTSTACK_UPLOAD_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                config.upload_concurrency = n;
            }
        }

        config
    }

    /// Reject settings the client cannot operate with.
    pub fn validate(&self) -> ClientResult<()> {
        if self.part_size == 0 {
            return Err(ClientError::Config("part size must be positive".to_owned()));
        }
        if self.list_max_keys == 0 {
            return Err(ClientError::Config(
                "list max keys must be positive".to_owned(),
            ));
        }
        if self.upload_concurrency == 0 {
            return Err(ClientError::Config(
                "upload concurrency must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// The `User-Agent` sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} ({}; {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}
