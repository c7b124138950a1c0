//! Object storage client core.
//!
//! Two engines sit behind the [`Client`] API:
//!
//! - the upload orchestrator ([`upload`]), which sends small objects in one
//!   request and large ones as a multipart session built from the
//!   [`chunk`] splitter and the [`register`] of completed parts;
//! - the listing enumerator ([`list`]), which turns marker-based pages into
//!   one lazy stream fed by a background task.
//!
//! Requests go through a [`Transport`]. [`memory::InMemoryTransport`] is a
//! complete process-local implementation.

pub mod chunk;
pub mod client;
pub mod config;
pub mod error;
pub mod list;
pub mod memory;
pub mod register;
pub mod transport;
pub mod upload;

pub use client::{Api, BucketApi, Client, ObjectApi};
pub use config::{ClientConfig, DEFAULT_PART_SIZE};
pub use error::{ChunkError, ClientError, ClientResult};
pub use list::{BucketStream, ItemStream, ObjectStream, PageFetcher, StreamedItem, Traversal};
pub use memory::InMemoryTransport;
pub use objectstack_model as model;
pub use transport::{Transport, TransportResult};
