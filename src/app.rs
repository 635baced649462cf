//! Event handling: turn one created image blob into three thumbnails.

use crate::blob::BlobLocation;
use crate::event::StorageEvent;
use crate::image::{ImageProcessor, Thumbnail, ThumbnailEncoder, ThumbnailService};
use crate::models::{Config, Outcome, ThumbnailWidths, Tier, UploadedThumbnail};
use crate::storage::{BlobStore, MockBlobStore, S3BlobStore};
use crate::Result;
use tracing::{error, info};

/// Renders and uploads the thumbnail tiers for created blobs.
pub struct App {
    store: Box<dyn BlobStore>,
    thumbnails: Box<dyn ThumbnailService>,
    widths: ThumbnailWidths,
    thumbnail_container: String,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub store: Box<dyn BlobStore>,
    pub thumbnails: Box<dyn ThumbnailService>,
}

impl App {
    pub fn with_services(
        services: AppServices,
        widths: ThumbnailWidths,
        thumbnail_container: String,
    ) -> Self {
        Self {
            store: services.store,
            thumbnails: services.thumbnails,
            widths,
            thumbnail_container,
        }
    }

    /// Construct an app from configuration (`Config::from_env`).
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Box<dyn BlobStore> = if config.dry_run {
            info!("DRY_RUN enabled, thumbnails are kept in memory");
            Box::new(MockBlobStore::new())
        } else {
            Box::new(S3BlobStore::new(&config.storage).await?)
        };

        info!(
            "Thumbnail widths: small={} medium={} large={} -> container '{}'",
            config.widths.width(Tier::Small),
            config.widths.width(Tier::Medium),
            config.widths.width(Tier::Large),
            config.thumbnail_container
        );

        Ok(Self::with_services(
            AppServices {
                store,
                thumbnails: Box::new(ImageProcessor::new()),
            },
            config.widths,
            config.thumbnail_container.clone(),
        ))
    }

    /// Handle a storage event, reading the source blob from the store.
    pub async fn handle_event(&self, event: &StorageEvent) -> Result<Outcome> {
        self.handle_event_with_input(event, None).await
    }

    /// Handle a storage event. When `input` is given it is used as the blob
    /// content instead of reading the blob from the store.
    pub async fn handle_event_with_input(
        &self,
        event: &StorageEvent,
        input: Option<Vec<u8>>,
    ) -> Result<Outcome> {
        let result = self.dispatch(event, input).await;
        if let Err(e) = &result {
            error!("Event {} failed: {}", event.id, e);
        }
        result
    }

    async fn dispatch(&self, event: &StorageEvent, input: Option<Vec<u8>>) -> Result<Outcome> {
        let Some(created) = event.blob_created()? else {
            info!("Ignoring event {} of type {}", event.id, event.event_type);
            return Ok(Outcome::Ignored {
                event_type: event.event_type.clone(),
            });
        };

        let location = BlobLocation::from_url(&created.url)?;

        // Skip the read entirely for blobs that would be filtered out anyway
        if ThumbnailEncoder::from_extension(location.extension()).is_none() {
            return self.process_blob(&location, None, &created.url).await;
        }

        let source = match input {
            Some(bytes) => Some(bytes),
            None => self.store.get_blob(&location.container, &location.name).await?,
        };

        self.process_blob(&location, source.as_deref(), &created.url)
            .await
    }

    /// Render and upload all three tiers for one source blob.
    ///
    /// All tiers are rendered before any upload starts, so a decode or sizing
    /// failure leaves the destination untouched. Upload failures are returned
    /// after every upload has finished; tiers already written stay written.
    pub async fn process_blob(
        &self,
        location: &BlobLocation,
        source: Option<&[u8]>,
        url: &str,
    ) -> Result<Outcome> {
        let Some(encoder) = ThumbnailEncoder::from_extension(location.extension()) else {
            info!("No encoder support for: {}", url);
            return Ok(Outcome::Unsupported {
                blob_name: location.name.clone(),
            });
        };

        let Some(source) = source else {
            info!("Blob {} is no longer available, nothing to do", url);
            return Ok(Outcome::MissingInput {
                blob_name: location.name.clone(),
            });
        };

        info!(
            "Creating {:?} thumbnails for {} ({} bytes)",
            encoder,
            location.name,
            source.len()
        );

        let (small, medium, large) = tokio::join!(
            self.render_tier(source, encoder, Tier::Small),
            self.render_tier(source, encoder, Tier::Medium),
            self.render_tier(source, encoder, Tier::Large)
        );
        let rendered = [
            (Tier::Small, small?),
            (Tier::Medium, medium?),
            (Tier::Large, large?),
        ];

        let [small, medium, large] = rendered.map(|(tier, thumbnail)| {
            self.upload_tier(tier, thumbnail, encoder, &location.name)
        });
        let (small, medium, large) = tokio::join!(small, medium, large);

        let thumbnails = vec![small?, medium?, large?];
        info!("Uploaded {} thumbnails for {}", thumbnails.len(), location.name);

        Ok(Outcome::Completed {
            encoder,
            thumbnails,
        })
    }

    async fn render_tier(
        &self,
        source: &[u8],
        encoder: ThumbnailEncoder,
        tier: Tier,
    ) -> Result<Thumbnail> {
        let width = self.widths.width(tier);
        info!("[{}] Thumbnail width: {}", tier, width);

        let thumbnail = self.thumbnails.render(source, encoder, width).await?;
        info!(
            "[{}] Input image (w x h): {} x {}, divisor: {}, new size (w x h): {} x {}",
            tier,
            thumbnail.source_width,
            thumbnail.source_height,
            thumbnail.size.divisor,
            thumbnail.size.width,
            thumbnail.size.height
        );
        Ok(thumbnail)
    }

    async fn upload_tier(
        &self,
        tier: Tier,
        thumbnail: Thumbnail,
        encoder: ThumbnailEncoder,
        blob_name: &str,
    ) -> Result<UploadedThumbnail> {
        let key = tier.key_for(blob_name);
        let bytes = thumbnail.data.len();

        self.store
            .put_blob(
                &self.thumbnail_container,
                &key,
                thumbnail.data,
                encoder.content_type(),
            )
            .await?;
        info!("[{}] Uploaded {} ({} bytes)", tier, key, bytes);

        Ok(UploadedThumbnail {
            tier,
            key,
            width: thumbnail.size.width,
            height: thumbnail.size.height,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices};
    use crate::blob::BlobLocation;
    use crate::event::parse_events;
    use crate::image::{MockThumbnailProcessor, ThumbnailEncoder};
    use crate::models::{Outcome, ThumbnailWidths, Tier};
    use crate::storage::MockBlobStore;
    use crate::Error;
    use pretty_assertions::assert_eq;

    const CONTAINER: &str = "thumbnails";

    fn build_test_app(store: &MockBlobStore, processor: &MockThumbnailProcessor) -> App {
        App::with_services(
            AppServices {
                store: Box::new(store.clone()),
                thumbnails: Box::new(processor.clone()),
            },
            ThumbnailWidths::new(100, 250, 500).unwrap(),
            CONTAINER.to_string(),
        )
    }

    fn created_event(url: &str) -> crate::event::StorageEvent {
        let json = format!(
            r#"{{"id": "evt-1", "eventType": "Microsoft.Storage.BlobCreated", "data": {{"url": "{}"}}}}"#,
            url
        );
        parse_events(&json).unwrap().remove(0)
    }

    #[tokio::test]
    async fn test_process_blob_uploads_three_tiers() {
        let store = MockBlobStore::new();
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);
        let location = BlobLocation::from_url("https://host/uploads/cat.png").unwrap();

        let outcome = app
            .process_blob(&location, Some(b"png"), "https://host/uploads/cat.png")
            .await
            .unwrap();

        let Outcome::Completed {
            encoder,
            thumbnails,
        } = &outcome
        else {
            panic!("expected completed outcome, got {:?}", outcome);
        };
        assert_eq!(*encoder, ThumbnailEncoder::Png);
        let summary: Vec<_> = thumbnails
            .iter()
            .map(|t| (t.tier, t.key.as_str(), t.width, t.height))
            .collect();
        // source is 1000x600: divisors 10, 4, 2
        assert_eq!(
            summary,
            vec![
                (Tier::Small, "small/cat.png", 100, 60),
                (Tier::Medium, "medium/cat.png", 250, 150),
                (Tier::Large, "large/cat.png", 500, 300),
            ]
        );

        assert_eq!(store.get_upload_count(), 3);
        let stored = store.get_blob_entry(CONTAINER, "medium/cat.png").unwrap();
        assert_eq!(stored.data, b"Png:250x150".to_vec());
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_skipped() {
        let store = MockBlobStore::new();
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);

        let outcome = app
            .handle_event(&created_event("https://host/uploads/notes.txt"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Unsupported {
                blob_name: "notes.txt".to_string()
            }
        );
        assert_eq!(store.get_read_count(), 0);
        assert_eq!(store.get_upload_count(), 0);
        assert_eq!(processor.get_render_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_source_is_a_no_op() {
        let store = MockBlobStore::new();
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);

        let outcome = app
            .handle_event(&created_event("https://host/uploads/gone.jpg"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::MissingInput {
                blob_name: "gone.jpg".to_string()
            }
        );
        assert_eq!(store.get_read_count(), 1);
        assert_eq!(store.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_event_reads_source_from_store() {
        let store = MockBlobStore::new().with_blob("uploads", "a/b/photo.JPEG", b"jpeg".to_vec());
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);

        let outcome = app
            .handle_event(&created_event("https://host/uploads/a/b/photo.JPEG?sig=x"))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Completed {
                encoder: ThumbnailEncoder::Jpeg,
                ..
            }
        ));
        assert_eq!(processor.get_render_count(), 3);
        for key in ["small/a/b/photo.JPEG", "medium/a/b/photo.JPEG", "large/a/b/photo.JPEG"] {
            let stored = store.get_blob_entry(CONTAINER, key).unwrap();
            assert_eq!(stored.content_type, "image/jpeg");
        }
    }

    #[tokio::test]
    async fn test_other_event_types_are_ignored() {
        let store = MockBlobStore::new();
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);
        let event = parse_events(
            r#"{"id": "evt-2", "eventType": "Microsoft.Storage.BlobDeleted", "data": {"url": "https://host/uploads/cat.png"}}"#,
        )
        .unwrap()
        .remove(0);

        let outcome = app.handle_event(&event).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Ignored {
                event_type: "Microsoft.Storage.BlobDeleted".to_string()
            }
        );
        assert_eq!(store.get_read_count(), 0);
    }

    #[tokio::test]
    async fn test_sizing_failure_uploads_nothing() {
        let store = MockBlobStore::new();
        // large tier (500) is not smaller than the 400px source
        let processor = MockThumbnailProcessor::new().with_source_size(400, 300);
        let app = build_test_app(&store, &processor);

        let result = app
            .handle_event_with_input(
                &created_event("https://host/uploads/small.gif"),
                Some(b"gif".to_vec()),
            )
            .await;

        assert!(matches!(
            result,
            Err(Error::Sizing {
                source_width: 400,
                target_width: 500
            })
        ));
        assert_eq!(store.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_render_failure_uploads_nothing() {
        let store = MockBlobStore::new();
        let processor = MockThumbnailProcessor::new().with_failure(true);
        let app = build_test_app(&store, &processor);

        let result = app
            .handle_event_with_input(
                &created_event("https://host/uploads/cat.png"),
                Some(b"corrupt".to_vec()),
            )
            .await;

        assert!(matches!(result, Err(Error::Image(_))));
        assert_eq!(store.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_propagates_without_rollback() {
        let store = MockBlobStore::new().with_failing_upload(CONTAINER, "medium/cat.png");
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);

        let result = app
            .handle_event_with_input(
                &created_event("https://host/uploads/cat.png"),
                Some(b"png".to_vec()),
            )
            .await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(store.get_upload_count(), 3);
        assert!(store.get_blob_entry(CONTAINER, "small/cat.png").is_some());
        assert!(store.get_blob_entry(CONTAINER, "large/cat.png").is_some());
        assert!(store.get_blob_entry(CONTAINER, "medium/cat.png").is_none());
    }

    #[tokio::test]
    async fn test_invalid_event_url_fails() {
        let store = MockBlobStore::new();
        let processor = MockThumbnailProcessor::new();
        let app = build_test_app(&store, &processor);

        let result = app.handle_event(&created_event("https://host/")).await;

        assert!(matches!(result, Err(Error::InvalidEvent(_))));
    }
}
