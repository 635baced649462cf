use super::{plan_thumbnail_size, Thumbnail, ThumbnailEncoder, ThumbnailService};
use crate::Result;
use async_trait::async_trait;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, DynamicImage, Frame, ImageDecoder, ImageFormat, ImageResult};
use std::io::Cursor;

pub struct ImageProcessor {
    filter: FilterType,
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    fn render_sync(
        source: &[u8],
        encoder: ThumbnailEncoder,
        target_width: u32,
        filter: FilterType,
    ) -> Result<Thumbnail> {
        let gif_source = image::guess_format(source).ok() == Some(ImageFormat::Gif);
        if encoder == ThumbnailEncoder::Gif && gif_source {
            return Self::render_gif_frames(source, target_width, filter);
        }

        let image = image::load_from_memory(source)?;
        let (source_width, source_height) = (image.width(), image.height());
        let size = plan_thumbnail_size(source_width, source_height, target_width)?;

        let resized = image.resize_exact(size.width, size.height, filter);
        let data = encode(resized, encoder)?;

        Ok(Thumbnail {
            source_width,
            source_height,
            size,
            data,
        })
    }

    /// Resize every frame of a GIF, keeping frame delays.
    fn render_gif_frames(source: &[u8], target_width: u32, filter: FilterType) -> Result<Thumbnail> {
        let decoder = GifDecoder::new(Cursor::new(source))?;
        let (source_width, source_height) = decoder.dimensions();
        let size = plan_thumbnail_size(source_width, source_height, target_width)?;

        // decoded frames are full-canvas composites positioned at 0,0
        let frames = decoder
            .into_frames()
            .map(|frame| -> ImageResult<Frame> {
                let frame = frame?;
                let resized = imageops::resize(frame.buffer(), size.width, size.height, filter);
                Ok(Frame::from_parts(resized, 0, 0, frame.delay()))
            })
            .collect::<ImageResult<Vec<_>>>()?;

        let mut data = Vec::new();
        {
            let animated = frames.len() > 1;
            let mut encoder = GifEncoder::new(&mut data);
            if animated {
                encoder.set_repeat(Repeat::Infinite)?;
            }
            encoder.encode_frames(frames)?;
        }

        Ok(Thumbnail {
            source_width,
            source_height,
            size,
            data,
        })
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(image: DynamicImage, encoder: ThumbnailEncoder) -> Result<Vec<u8>> {
    // JPEG has no alpha channel; GIF frames are always RGBA
    let image = match encoder {
        ThumbnailEncoder::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ThumbnailEncoder::Gif => DynamicImage::ImageRgba8(image.to_rgba8()),
        ThumbnailEncoder::Png => image,
    };

    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, encoder.image_format())?;
    Ok(buffer.into_inner())
}

#[async_trait]
impl ThumbnailService for ImageProcessor {
    async fn render(
        &self,
        source: &[u8],
        encoder: ThumbnailEncoder,
        target_width: u32,
    ) -> Result<Thumbnail> {
        let source = source.to_vec();
        let filter = self.filter;

        tokio::task::spawn_blocking(move || {
            Self::render_sync(&source, encoder, target_width, filter)
        })
        .await?
    }
}
