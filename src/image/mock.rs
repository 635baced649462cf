use super::{plan_thumbnail_size, Thumbnail, ThumbnailEncoder, ThumbnailService};
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Renders fake thumbnails without touching any codec.
///
/// Every source is treated as an image of `source_size`; the output bytes
/// spell out the encoder and dimensions so tests can tell the tiers apart.
#[derive(Clone)]
pub struct MockThumbnailProcessor {
    render_count: Arc<Mutex<usize>>,
    source_size: (u32, u32),
    should_fail: Arc<Mutex<bool>>,
}

impl MockThumbnailProcessor {
    pub fn new() -> Self {
        Self {
            render_count: Arc::new(Mutex::new(0)),
            source_size: (1000, 600),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_source_size(mut self, width: u32, height: u32) -> Self {
        self.source_size = (width, height);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_render_count(&self) -> usize {
        *self.render_count.lock().unwrap()
    }
}

impl Default for MockThumbnailProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThumbnailService for MockThumbnailProcessor {
    async fn render(
        &self,
        _source: &[u8],
        encoder: ThumbnailEncoder,
        target_width: u32,
    ) -> Result<Thumbnail> {
        if *self.should_fail.lock().unwrap() {
            return Err(crate::Error::Image(image::ImageError::IoError(
                std::io::Error::other("Mock failure"),
            )));
        }

        *self.render_count.lock().unwrap() += 1;

        let (source_width, source_height) = self.source_size;
        let size = plan_thumbnail_size(source_width, source_height, target_width)?;
        let data = format!("{:?}:{}x{}", encoder, size.width, size.height).into_bytes();

        Ok(Thumbnail {
            source_width,
            source_height,
            size,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_thumbnail_processor() {
        let processor = MockThumbnailProcessor::new();

        let thumbnail = processor
            .render(b"fake image data", ThumbnailEncoder::Png, 100)
            .await
            .unwrap();

        assert_eq!(thumbnail.data, b"Png:100x60".to_vec());
        assert_eq!(processor.get_render_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_applies_sizing_rules() {
        let processor = MockThumbnailProcessor::new().with_source_size(80, 80);

        let result = processor.render(b"data", ThumbnailEncoder::Gif, 100).await;
        assert!(matches!(result, Err(crate::Error::Sizing { .. })));
    }

    #[tokio::test]
    async fn test_mock_with_failure() {
        let processor = MockThumbnailProcessor::new().with_failure(true);

        let result = processor.render(b"data", ThumbnailEncoder::Jpeg, 100).await;
        assert!(result.is_err());
        assert_eq!(processor.get_render_count(), 0);
    }
}
