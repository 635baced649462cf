//! Storage event envelopes
//!
//! Events arrive in the event-grid shape, either one at a time or as a JSON
//! array. Only blob-created events carry work; everything else is ignored by
//! the handler.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const BLOB_CREATED: &str = "Microsoft.Storage.BlobCreated";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEvent {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "type")]
    pub event_type: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, alias = "time")]
    pub event_time: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlobCreatedData {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub api: Option<String>,
}

impl StorageEvent {
    pub fn is_blob_created(&self) -> bool {
        self.event_type == BLOB_CREATED
    }

    /// Payload of a blob-created event, or `None` for any other event type.
    pub fn blob_created(&self) -> Result<Option<BlobCreatedData>> {
        if !self.is_blob_created() {
            return Ok(None);
        }

        serde_json::from_value(self.data.clone())
            .map(Some)
            .map_err(|e| {
                Error::InvalidEvent(format!(
                    "Blob-created event '{}' has malformed data: {}",
                    self.id, e
                ))
            })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Delivery {
    Batch(Vec<StorageEvent>),
    Single(StorageEvent),
}

/// Parse one event or an array of events.
pub fn parse_events(json: &str) -> Result<Vec<StorageEvent>> {
    match serde_json::from_str::<Delivery>(json) {
        Ok(Delivery::Batch(events)) => Ok(events),
        Ok(Delivery::Single(event)) => Ok(vec![event]),
        Err(e) => Err(Error::InvalidEvent(format!("Unrecognised event payload: {}", e))),
    }
}

pub fn read_events(path: &Path) -> Result<Vec<StorageEvent>> {
    let json = std::fs::read_to_string(path)?;
    parse_events(&json)
}
