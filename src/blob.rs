//! Locating a blob from its URL.

use crate::{Error, Result};
use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::net::IpAddr;

/// Container and name of a blob, parsed from its access URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub container: String,
    pub name: String,
}

impl BlobLocation {
    /// Parse a blob URL.
    ///
    /// Handles path-style URLs (`https://host/container/name`), blob storage
    /// emulator URLs where the first path segment is the account
    /// (`http://127.0.0.1:10000/devstoreaccount1/container/name`), and virtual-hosted
    /// S3 URLs (`https://bucket.s3.region.amazonaws.com/name`). The query
    /// string and fragment are ignored; percent-escapes are decoded.
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| Error::InvalidEvent(format!("Invalid blob URL '{}': {}", raw, e)))?;
        let host = url.host_str().unwrap_or_default();
        let path = url.path().trim_start_matches('/');

        let (container, name) = if let Some(bucket) = virtual_hosted_bucket(host) {
            (bucket, path)
        } else {
            let path = if is_emulator_url(&url, path) {
                path.split_once('/').map(|(_, rest)| rest).unwrap_or_default()
            } else {
                path
            };
            path.split_once('/').unwrap_or((path, ""))
        };

        if container.is_empty() || name.is_empty() {
            return Err(Error::InvalidEvent(format!(
                "Blob URL '{}' does not name a blob",
                raw
            )));
        }

        Ok(Self {
            container: percent_decode(container)?,
            name: percent_decode(name)?,
        })
    }

    /// Extension of the blob name without the dot, or `""` when there is none.
    ///
    /// Everything after the last `.` of the final path segment counts, so a
    /// bare `.png` has the extension `png`.
    pub fn extension(&self) -> &str {
        let file_name = self.name.rsplit('/').next().unwrap_or_default();
        file_name
            .rfind('.')
            .map(|dot| &file_name[dot + 1..])
            .unwrap_or_default()
    }
}

fn virtual_hosted_bucket(host: &str) -> Option<&str> {
    let (bucket, rest) = host.split_once(".s3")?;
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix('-'))?;
    (!bucket.is_empty() && rest.ends_with("amazonaws.com")).then_some(bucket)
}

/// Blob storage emulator URLs carry the account as their first path segment.
/// They are recognised by a local host plus either the emulator's blob port or
/// an emulator account name, so local S3-compatible endpoints stay path-style.
fn is_emulator_url(url: &Url, path: &str) -> bool {
    const EMULATOR_BLOB_PORT: u16 = 10000;
    const EMULATOR_ACCOUNT_PREFIX: &str = "devstoreaccount";

    let host = url.host_str().unwrap_or_default();
    let local_host = host == "localhost"
        || host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok();
    let first_segment = path.split('/').next().unwrap_or_default();

    local_host
        && (url.port() == Some(EMULATOR_BLOB_PORT)
            || first_segment.starts_with(EMULATOR_ACCOUNT_PREFIX))
}

fn percent_decode(input: &str) -> Result<String> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::InvalidEvent(format!("Blob name '{}' is not UTF-8: {}", input, e)))
}
