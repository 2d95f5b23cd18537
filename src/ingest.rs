//! Upload intake: validate, extract, store, catalog.
//!
//! Files in a batch succeed or fail independently. Validation and metadata
//! failures reject only the offending file; database failures abort the
//! request because they mean the catalog itself is unhealthy. A record is
//! only inserted after its original bytes are safely in storage, so the
//! catalog never references an object that was not written.

use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::extractor::MetadataExtractor;
use crate::photo::{
    normalize_tags, sanitize_file_name, FileInfo, PhotoFlags, PhotoRecord, ProcessingInfo,
    ProcessingStatus, StorageInfo, StorageVariant, VARIANT_ORIGINAL,
};
use crate::storage::{object_name, StorageBackend};
use crate::validator::{UploadFile, UploadValidator};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Outcome for one file in an upload batch
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Position of the file within the batch
    pub index: usize,
    pub file_name: String,
    /// Catalog id when the file was accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<Uuid>,
    /// Rejection reason when it was not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn accepted(index: usize, file_name: String, photo_id: Uuid) -> Self {
        Self {
            index,
            file_name,
            photo_id: Some(photo_id),
            error: None,
        }
    }

    fn rejected(index: usize, file_name: String, reason: String) -> Self {
        Self {
            index,
            file_name,
            photo_id: None,
            error: Some(reason),
        }
    }
}

/// Initial metadata applied to every accepted file in a batch
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub tags: Vec<String>,
    pub user_notes: String,
    pub is_private: bool,
}

/// Outcome for a whole upload batch
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub files: Vec<FileOutcome>,
}

/// Drives the intake path for upload batches
pub struct IngestionOrchestrator {
    store: Arc<CatalogStore>,
    storage: Arc<dyn StorageBackend>,
    extractor: MetadataExtractor,
    validator: UploadValidator,
    container: String,
}

impl IngestionOrchestrator {
    pub fn new(
        store: Arc<CatalogStore>,
        storage: Arc<dyn StorageBackend>,
        extractor: MetadataExtractor,
        validator: UploadValidator,
        container: String,
    ) -> Self {
        Self {
            store,
            storage,
            extractor,
            validator,
            container,
        }
    }

    /// Ingest an upload batch for one owner.
    ///
    /// Batch-shape violations (empty batch, too many files) fail the whole
    /// request before any file is touched. After that, each file is
    /// validated, decoded, stored and cataloged on its own; new records
    /// enter the pipeline in `uploaded` state for the background worker.
    #[instrument(skip(self, files, options), fields(owner_id = %owner_id, batch_size = files.len()))]
    pub async fn ingest(
        &self,
        owner_id: Uuid,
        files: Vec<UploadFile>,
        options: UploadOptions,
    ) -> Result<UploadOutcome> {
        let validations = self.validator.validate_batch(&files)?;
        let tags = normalize_tags(&options.tags);

        let mut outcomes = Vec::with_capacity(files.len());
        for (file, validation) in files.iter().zip(validations) {
            if let Some(error) = validation.error {
                metrics::counter!("catalog.uploads.rejected").increment(1);
                outcomes.push(FileOutcome::rejected(
                    validation.index,
                    validation.file_name,
                    error.to_string(),
                ));
                continue;
            }

            let outcome = self
                .ingest_file(owner_id, validation.index, file, &tags, &options)
                .await?;
            outcomes.push(outcome);
        }

        let accepted = outcomes.iter().filter(|o| o.photo_id.is_some()).count();
        let rejected = outcomes.len() - accepted;

        metrics::counter!("catalog.uploads.accepted").increment(accepted as u64);
        info!(accepted, rejected, "Upload batch ingested");

        Ok(UploadOutcome {
            accepted,
            rejected,
            files: outcomes,
        })
    }

    /// Store and catalog one validated file. Metadata and storage failures
    /// reject the file; database failures propagate.
    async fn ingest_file(
        &self,
        owner_id: Uuid,
        index: usize,
        file: &UploadFile,
        tags: &[String],
        options: &UploadOptions,
    ) -> Result<FileOutcome> {
        // Full-resolution decode is CPU-bound; keep it off the request runtime
        let (image_data, exif) = match self.extractor.extract_blocking(file.data.clone()).await {
            Ok(extracted) => extracted,
            Err(err) => {
                warn!(file_name = %file.file_name, error = %err, "Metadata extraction failed");
                metrics::counter!("catalog.uploads.rejected").increment(1);
                return Ok(FileOutcome::rejected(
                    index,
                    file.file_name.clone(),
                    err.to_string(),
                ));
            }
        };

        let photo_id = Uuid::new_v4();
        let path = object_name(owner_id, photo_id, VARIANT_ORIGINAL, &file.file_name);

        let stored = match self.storage.store(&file.data, &path, &self.container).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(file_name = %file.file_name, error = %err, "Failed to store original");
                metrics::counter!("catalog.uploads.rejected").increment(1);
                return Ok(FileOutcome::rejected(
                    index,
                    file.file_name.clone(),
                    err.to_string(),
                ));
            }
        };

        let now = Utc::now();
        let mut variants = HashMap::new();
        variants.insert(
            VARIANT_ORIGINAL.to_string(),
            StorageVariant {
                path: stored.path,
                url: stored.url,
            },
        );

        let record = PhotoRecord {
            id: photo_id,
            owner_id,
            file_info: FileInfo {
                original_file_name: file.file_name.clone(),
                file_name: sanitize_file_name(&file.file_name),
                file_size: file.data.len() as i64,
                content_type: file.content_type.to_ascii_lowercase(),
                uploaded_at: now,
            },
            storage: StorageInfo {
                provider: self.storage.provider().to_string(),
                container: self.container.clone(),
                variants,
            },
            image_data,
            exif,
            processing: ProcessingInfo {
                status: ProcessingStatus::Uploaded,
                thumbnail_generated: false,
                ai_enhancement_available: false,
                errors: vec![],
                processed_at: None,
            },
            tags: tags.to_vec(),
            user_notes: options.user_notes.clone(),
            ai_analysis: None,
            flags: PhotoFlags {
                is_private: options.is_private,
                ..PhotoFlags::default()
            },
            print_history: vec![],
            print_count: 0,
            schema_version: 1,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&record).await?;

        Ok(FileOutcome::accepted(index, file.file_name.clone(), photo_id))
    }
}
