//! Object storage access
//!
//! Reads source blobs and writes thumbnails to S3-compatible storage.

pub mod client;
pub mod mock;

pub use client::S3BlobStore;
pub use mock::MockBlobStore;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a blob. Returns `None` when the blob does not exist.
    async fn get_blob(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a blob, replacing any existing blob at the same key.
    async fn put_blob(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
}
