//! Background processing worker.
//!
//! Claims pending records from the catalog in upload order and runs the
//! processing pass for each: fetch the original, render a thumbnail,
//! score print suitability, then mark the record completed or failed. A
//! failure is recorded on its own record and never aborts the rest of the
//! batch. Claims carry a lease timestamp: other instances skip a claimed
//! record until the lease goes stale, so a crashed worker's records are
//! picked up again while in-flight work is left alone.

use crate::catalog::CatalogStore;
use crate::config::WorkerConfig;
use crate::error::{CatalogError, Result};
use crate::extractor::{ImageCodec, QualityAnalyzer, QualityReport};
use crate::photo::{AiAnalysis, PhotoRecord, StorageVariant, VARIANT_ORIGINAL, VARIANT_THUMBNAIL};
use crate::storage::{object_name, StorageBackend};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Stored thumbnail file name; thumbnails are always re-encoded as JPEG
const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";

pub struct ProcessingWorker {
    store: Arc<CatalogStore>,
    storage: Arc<dyn StorageBackend>,
    codec: Arc<dyn ImageCodec>,
    config: WorkerConfig,
    container: String,
}

impl ProcessingWorker {
    pub fn new(
        store: Arc<CatalogStore>,
        storage: Arc<dyn StorageBackend>,
        codec: Arc<dyn ImageCodec>,
        config: WorkerConfig,
        container: String,
    ) -> Self {
        Self {
            store,
            storage,
            codec,
            config,
            container,
        }
    }

    /// Poll loop. Each iteration claims up to `batch_size` records and
    /// awaits the whole batch before the next claim, so one instance never
    /// has two claims on the same record in flight.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(
            std::time::Duration::from_secs(self.config.poll_interval_secs),
        );
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "Processing worker started"
        );

        loop {
            interval.tick().await;
            match self.poll_once().await {
                Ok(0) => {}
                Ok(processed) => info!(processed, "Processed batch"),
                Err(err) => error!(error = %err, "Worker poll failed"),
            }
        }
    }

    /// Claim and process one batch. Returns how many records were claimed.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<usize> {
        let batch = self
            .store
            .claim_pending(
                self.config.batch_size,
                std::time::Duration::from_secs(self.config.stale_claim_timeout_secs),
            )
            .await?;
        if batch.is_empty() {
            return Ok(0);
        }

        let claimed = batch.len();
        futures::stream::iter(batch)
            .for_each_concurrent(self.config.concurrency, |record| async move {
                self.process_one(record).await;
            })
            .await;

        Ok(claimed)
    }

    /// Process one claimed record end to end and persist the outcome
    async fn process_one(&self, record: PhotoRecord) {
        let started = Instant::now();
        let photo_id = record.id;

        match self.process_record(&record).await {
            Ok((thumbnail, report, analysis)) => {
                if let Err(err) = self
                    .store
                    .complete_processing(photo_id, &thumbnail, &report, &analysis)
                    .await
                {
                    error!(photo_id = %photo_id, error = %err, "Failed to persist processing result");
                }
            }
            Err(err) => {
                warn!(photo_id = %photo_id, error = %err, "Processing failed");
                if let Err(err) = self.store.fail_processing(photo_id, &err.to_string()).await {
                    error!(photo_id = %photo_id, error = %err, "Failed to persist processing failure");
                }
            }
        }

        metrics::histogram!("catalog.processing.duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    /// The processing pass itself: original bytes in, thumbnail variant
    /// and analysis out. Everything here is retryable; persistence happens
    /// in the caller.
    async fn process_record(
        &self,
        record: &PhotoRecord,
    ) -> Result<(StorageVariant, QualityReport, AiAnalysis)> {
        let path = record
            .variant_path(VARIANT_ORIGINAL)
            .ok_or_else(|| CatalogError::Processing("record has no original variant".to_string()))?;

        let bytes = self
            .storage
            .fetch(path, &record.storage.container)
            .await?
            .ok_or_else(|| {
                CatalogError::Processing("original object missing from storage".to_string())
            })?;

        let thumbnail_bytes = self.render_thumbnail(bytes).await?;

        let thumbnail_path = object_name(
            record.owner_id,
            record.id,
            VARIANT_THUMBNAIL,
            THUMBNAIL_FILE_NAME,
        );
        let stored = self
            .storage
            .store(&thumbnail_bytes, &thumbnail_path, &self.container)
            .await?;

        let report = QualityAnalyzer::analyze(
            record.image_data.width.max(0) as u32,
            record.image_data.height.max(0) as u32,
        );
        let analysis = AiAnalysis {
            scene_types: vec![],
            dominant_colors: vec![],
            face_count: None,
            quality_score: report.quality_score,
        };

        Ok((
            StorageVariant {
                path: stored.path,
                url: stored.url,
            },
            report,
            analysis,
        ))
    }

    /// Thumbnail rendering is CPU-bound; run it off the async runtime
    async fn render_thumbnail(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let codec = Arc::clone(&self.codec);
        let max_edge = self.config.thumbnail_max_edge;

        tokio::task::spawn_blocking(move || codec.render_thumbnail(&bytes, max_edge))
            .await
            .map_err(|e| CatalogError::Processing(format!("thumbnail task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::MockImageCodec;
    use crate::photo::{
        FileInfo, ImageData, Orientation, PhotoFlags, ProcessingInfo, ProcessingStatus,
        StorageInfo,
    };
    use crate::storage::MockStorageBackend;
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn test_store() -> Arc<CatalogStore> {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/catalog_test")
            .unwrap();
        Arc::new(CatalogStore::with_pool(pool))
    }

    fn claimed_record(variants: HashMap<String, StorageVariant>) -> PhotoRecord {
        let now = Utc::now();
        PhotoRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            file_info: FileInfo {
                original_file_name: "IMG_0042.jpg".to_string(),
                file_name: "IMG_0042.jpg".to_string(),
                file_size: 2048,
                content_type: "image/jpeg".to_string(),
                uploaded_at: now,
            },
            storage: StorageInfo {
                provider: "s3".to_string(),
                container: "photos".to_string(),
                variants,
            },
            image_data: ImageData {
                width: 3200,
                height: 2400,
                orientation: Orientation::Landscape,
                aspect_ratio: "4:3".to_string(),
                dpi: 72,
                color_space: "sRGB".to_string(),
                has_transparency: false,
            },
            exif: None,
            processing: ProcessingInfo {
                status: ProcessingStatus::Processing,
                thumbnail_generated: false,
                ai_enhancement_available: false,
                errors: vec![],
                processed_at: None,
            },
            tags: vec![],
            user_notes: String::new(),
            ai_analysis: None,
            flags: PhotoFlags::default(),
            print_history: vec![],
            print_count: 0,
            schema_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn original_variants() -> HashMap<String, StorageVariant> {
        let mut variants = HashMap::new();
        variants.insert(
            VARIANT_ORIGINAL.to_string(),
            StorageVariant {
                path: "photos/a/b/original_IMG_0042.jpg".to_string(),
                url: String::new(),
            },
        );
        variants
    }

    fn worker(storage: MockStorageBackend, codec: MockImageCodec) -> ProcessingWorker {
        ProcessingWorker::new(
            test_store(),
            Arc::new(storage),
            Arc::new(codec),
            WorkerConfig::default(),
            "photos".to_string(),
        )
    }

    #[tokio::test]
    async fn test_process_record_stores_thumbnail_variant() {
        let mut storage = MockStorageBackend::new();
        storage
            .expect_fetch()
            .returning(|_, _| Ok(Some(vec![0xFF, 0xD8, 0xFF])));
        storage
            .expect_store()
            .withf(|_, name, _| name.contains("thumbnail_thumbnail.jpg"))
            .returning(|bytes, name, _| {
                Ok(crate::storage::StoredObject {
                    path: name.to_string(),
                    url: format!("https://example.com/{}", name),
                    size: bytes.len(),
                })
            });

        let mut codec = MockImageCodec::new();
        codec
            .expect_render_thumbnail()
            .returning(|_, _| Ok(vec![1, 2, 3]));

        let worker = worker(storage, codec);
        let record = claimed_record(original_variants());
        let (thumbnail, report, analysis) = worker.process_record(&record).await.unwrap();

        assert!(thumbnail.path.contains(VARIANT_THUMBNAIL));
        // 3200x2400 crosses the 3000x2400 pixel-count tier
        assert!(report.quality_score >= 8.0);
        assert_eq!(analysis.quality_score, report.quality_score);
    }

    #[tokio::test]
    async fn test_missing_original_object_fails_processing() {
        let mut storage = MockStorageBackend::new();
        storage.expect_fetch().returning(|_, _| Ok(None));

        let worker = worker(storage, MockImageCodec::new());
        let record = claimed_record(original_variants());
        let err = worker.process_record(&record).await.unwrap_err();
        assert!(matches!(err, CatalogError::Processing(_)));
    }

    #[tokio::test]
    async fn test_record_without_original_variant_fails_processing() {
        let worker = worker(MockStorageBackend::new(), MockImageCodec::new());
        let record = claimed_record(HashMap::new());
        let err = worker.process_record(&record).await.unwrap_err();
        assert!(matches!(err, CatalogError::Processing(_)));
    }
}
