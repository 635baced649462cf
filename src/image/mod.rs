//! Thumbnail rendering
//!
//! Resolves the output encoder from a file extension, plans thumbnail
//! dimensions, and resizes and re-encodes source images in their own format.

pub mod dimensions;
pub mod format;
pub mod mock;
pub mod processor;

pub use dimensions::{plan_thumbnail_size, ThumbnailSize};
pub use format::ThumbnailEncoder;
pub use mock::MockThumbnailProcessor;
pub use processor::ImageProcessor;

use crate::Result;
use async_trait::async_trait;

/// An encoded thumbnail held in memory.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub source_width: u32,
    pub source_height: u32,
    pub size: ThumbnailSize,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ThumbnailService: Send + Sync {
    /// Decode `source`, resize it to `target_width` and encode it with `encoder`.
    async fn render(
        &self,
        source: &[u8],
        encoder: ThumbnailEncoder,
        target_width: u32,
    ) -> Result<Thumbnail>;
}
