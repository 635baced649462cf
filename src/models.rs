//! Data models and configuration
//!
//! Defines thumbnail tiers, the configured target widths, the results of a
//! handled event, and the process-wide configuration read from the environment.

use crate::image::ThumbnailEncoder;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Small => "small",
            Tier::Medium => "medium",
            Tier::Large => "large",
        }
    }

    /// Destination key for a blob in this tier, e.g. `small/photos/cat.png`.
    pub fn key_for(&self, blob_name: &str) -> String {
        format!("{}/{}", self.as_str(), blob_name)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target widths for the three tiers. All widths are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailWidths {
    small: u32,
    medium: u32,
    large: u32,
}

impl ThumbnailWidths {
    pub fn new(small: u32, medium: u32, large: u32) -> Result<Self> {
        for (tier, width) in [
            (Tier::Small, small),
            (Tier::Medium, medium),
            (Tier::Large, large),
        ] {
            if width == 0 {
                return Err(Error::Config(format!(
                    "Thumbnail width for tier '{}' must be positive",
                    tier
                )));
            }
        }

        Ok(Self {
            small,
            medium,
            large,
        })
    }

    pub fn width(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Small => self.small,
            Tier::Medium => self.medium,
            Tier::Large => self.large,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadedThumbnail {
    pub tier: Tier,
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// What a single invocation did with its event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The event was not a blob-created event.
    Ignored { event_type: String },
    /// The source blob was gone before it could be read.
    MissingInput { blob_name: String },
    /// No encoder exists for the blob's extension.
    Unsupported { blob_name: String },
    Completed {
        encoder: ThumbnailEncoder,
        thumbnails: Vec<UploadedThumbnail>,
    },
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub region: String,
    pub force_path_style: bool,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub widths: ThumbnailWidths,
    pub thumbnail_container: String,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load_env_file()?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a `.env` file into the process environment if one exists.
    pub fn load_env_file() -> Result<()> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            non_empty(key).ok_or_else(|| Error::Config(format!("{} not set", key)))
        };
        let width = |key: &str| -> Result<u32> {
            let raw = required(key)?;
            raw.trim()
                .parse::<u32>()
                .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", key, raw)))
        };
        let flag = |key: &str, default: bool| -> Result<bool> {
            match non_empty(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => Ok(true),
                    "0" | "false" | "no" => Ok(false),
                    _ => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, raw))),
                },
            }
        };

        let dry_run = flag("DRY_RUN", false)?;

        let access_key_id = non_empty("STORAGE_ACCESS_KEY_ID");
        let secret_access_key = non_empty("STORAGE_SECRET_ACCESS_KEY");
        if !dry_run && (access_key_id.is_none() || secret_access_key.is_none()) {
            return Err(Error::Config(
                "STORAGE_ACCESS_KEY_ID and STORAGE_SECRET_ACCESS_KEY must be set unless DRY_RUN is enabled"
                    .to_string(),
            ));
        }

        let widths = ThumbnailWidths::new(
            width("THUMBNAIL_WIDTH_SMALL")?,
            width("THUMBNAIL_WIDTH_MEDIUM")?,
            width("THUMBNAIL_WIDTH_LARGE")?,
        )?;

        Ok(Self {
            storage: StorageConfig {
                access_key_id,
                secret_access_key,
                endpoint: non_empty("STORAGE_ENDPOINT"),
                region: non_empty("STORAGE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                force_path_style: flag("STORAGE_FORCE_PATH_STYLE", true)?,
            },
            widths,
            thumbnail_container: required("THUMBNAIL_CONTAINER_NAME")?,
            dry_run,
        })
    }
}
