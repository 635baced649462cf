use super::BlobStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory blob store keyed by `container/key`.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    blobs: Arc<Mutex<HashMap<String, StoredBlob>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
    upload_count: Arc<Mutex<usize>>,
    read_count: Arc<Mutex<usize>>,
}

fn blob_path(container: &str, key: &str) -> String {
    format!("{}/{}", container, key)
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, container: &str, key: &str, data: Vec<u8>) -> Self {
        self.blobs.lock().unwrap().insert(
            blob_path(container, key),
            StoredBlob {
                data,
                content_type: "application/octet-stream".to_string(),
            },
        );
        self
    }

    /// Make uploads to `container/key` fail.
    pub fn with_failing_upload(self, container: &str, key: &str) -> Self {
        self.failing_keys
            .lock()
            .unwrap()
            .insert(blob_path(container, key));
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_read_count(&self) -> usize {
        *self.read_count.lock().unwrap()
    }

    pub fn get_blob_entry(&self, container: &str, key: &str) -> Option<StoredBlob> {
        self.blobs
            .lock()
            .unwrap()
            .get(&blob_path(container, key))
            .cloned()
    }

    pub fn get_blobs(&self) -> HashMap<String, StoredBlob> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn get_blob(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>> {
        *self.read_count.lock().unwrap() += 1;

        Ok(self
            .blobs
            .lock()
            .unwrap()
            .get(&blob_path(container, key))
            .map(|blob| blob.data.clone()))
    }

    async fn put_blob(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        *self.upload_count.lock().unwrap() += 1;

        let path = blob_path(container, key);
        if self.failing_keys.lock().unwrap().contains(&path) {
            return Err(Error::Storage(format!("Mock upload failure for {}", path)));
        }

        self.blobs.lock().unwrap().insert(
            path,
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
