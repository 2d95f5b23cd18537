//! Postgres-backed catalog store.
//!
//! Every owner-facing read and write is scoped by `owner_id` and excludes
//! soft-deleted rows; a missing row and a row owned by someone else are
//! indistinguishable to callers. Single-row updates are atomic; there is no
//! multi-record transaction, so batch operations are sequences of
//! independent per-record updates.

use crate::config::DatabaseConfig;
use crate::error::{CatalogError, Result};
use crate::extractor::QualityReport;
use crate::photo::{
    AiAnalysis, ExifData, FileInfo, ImageData, Orientation, PhotoFlags, PhotoRecord,
    ProcessingInfo, ProcessingStatus, PrintRecord, StorageInfo, StorageVariant,
    VARIANT_THUMBNAIL,
};
use crate::query::{push_filters, push_order_and_page, GalleryPage, GalleryQuery};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Column list shared by every SELECT so row decoding never drifts
const PHOTO_COLUMNS: &str = "id, owner_id, original_file_name, file_name, file_size, \
     content_type, uploaded_at, storage_provider, storage_container, variants, \
     width, height, orientation, aspect_ratio, dpi, color_space, has_transparency, \
     exif, status, thumbnail_generated, ai_enhancement_available, processing_errors, \
     processed_at, tags, user_notes, ai_analysis, is_deleted, is_favorite, is_private, \
     reported_content, print_history, print_count, schema_version, created_at, updated_at";

/// Claim statement for the background worker. Eligible rows are either
/// freshly uploaded or carry a stale lease; a fresh `claimed_at` shields
/// in-flight work from concurrent pollers.
fn claim_sql() -> String {
    format!(
        r#"
        UPDATE photos SET status = 'processing', claimed_at = NOW(), updated_at = NOW()
        WHERE id IN (
            SELECT id FROM photos
            WHERE (status = 'uploaded'
                   OR (status = 'processing'
                       AND (claimed_at IS NULL
                            OR claimed_at < NOW() - make_interval(secs => $2))))
              AND processed_at IS NULL
              AND is_deleted = FALSE
            ORDER BY uploaded_at ASC, id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {PHOTO_COLUMNS}
        "#
    )
}

/// Flat row shape as stored in Postgres
#[derive(Debug, FromRow)]
struct PhotoRow {
    id: Uuid,
    owner_id: Uuid,
    original_file_name: String,
    file_name: String,
    file_size: i64,
    content_type: String,
    uploaded_at: DateTime<Utc>,
    storage_provider: String,
    storage_container: String,
    variants: Json<HashMap<String, StorageVariant>>,
    width: i32,
    height: i32,
    orientation: String,
    aspect_ratio: String,
    dpi: i32,
    color_space: String,
    has_transparency: bool,
    exif: Option<Json<ExifData>>,
    status: String,
    thumbnail_generated: bool,
    ai_enhancement_available: bool,
    processing_errors: Json<Vec<String>>,
    processed_at: Option<DateTime<Utc>>,
    tags: Vec<String>,
    user_notes: String,
    ai_analysis: Option<Json<AiAnalysis>>,
    is_deleted: bool,
    is_favorite: bool,
    is_private: bool,
    reported_content: bool,
    print_history: Json<Vec<PrintRecord>>,
    print_count: i32,
    schema_version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PhotoRow> for PhotoRecord {
    type Error = CatalogError;

    fn try_from(row: PhotoRow) -> Result<Self> {
        let status = ProcessingStatus::parse(&row.status)
            .ok_or_else(|| CatalogError::CorruptRecord(format!("unknown status {}", row.status)))?;
        let orientation = Orientation::parse(&row.orientation).ok_or_else(|| {
            CatalogError::CorruptRecord(format!("unknown orientation {}", row.orientation))
        })?;

        Ok(PhotoRecord {
            id: row.id,
            owner_id: row.owner_id,
            file_info: FileInfo {
                original_file_name: row.original_file_name,
                file_name: row.file_name,
                file_size: row.file_size,
                content_type: row.content_type,
                uploaded_at: row.uploaded_at,
            },
            storage: StorageInfo {
                provider: row.storage_provider,
                container: row.storage_container,
                variants: row.variants.0,
            },
            image_data: ImageData {
                width: row.width,
                height: row.height,
                orientation,
                aspect_ratio: row.aspect_ratio,
                dpi: row.dpi,
                color_space: row.color_space,
                has_transparency: row.has_transparency,
            },
            exif: row.exif.map(|e| e.0),
            processing: ProcessingInfo {
                status,
                thumbnail_generated: row.thumbnail_generated,
                ai_enhancement_available: row.ai_enhancement_available,
                errors: row.processing_errors.0,
                processed_at: row.processed_at,
            },
            tags: row.tags,
            user_notes: row.user_notes,
            ai_analysis: row.ai_analysis.map(|a| a.0),
            flags: PhotoFlags {
                is_deleted: row.is_deleted,
                is_favorite: row.is_favorite,
                is_private: row.is_private,
                reported_content: row.reported_content,
            },
            print_history: row.print_history.0,
            print_count: row.print_count,
            schema_version: row.schema_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Owner-editable fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PhotoUpdate {
    pub tags: Option<Vec<String>>,
    pub user_notes: Option<String>,
    pub is_favorite: Option<bool>,
    pub is_private: Option<bool>,
}

impl PhotoUpdate {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none()
            && self.user_notes.is_none()
            && self.is_favorite.is_none()
            && self.is_private.is_none()
    }
}

/// Catalog store handle. Cloned/shared via `Arc`; never a global.
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// Connect a new store with pool options from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
            .connect(&config.url)
            .await?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, embedding)
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;

        info!("Database migrations completed");
        Ok(())
    }

    /// The connection pool (for readiness checks)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Persist a freshly ingested record
    #[instrument(skip(self, record), fields(photo_id = %record.id, owner_id = %record.owner_id))]
    pub async fn insert(&self, record: &PhotoRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO photos (
                id, owner_id, original_file_name, file_name, file_size,
                content_type, uploaded_at, storage_provider, storage_container,
                variants, width, height, orientation, aspect_ratio, dpi,
                color_space, has_transparency, exif, status, thumbnail_generated,
                ai_enhancement_available, processing_errors, processed_at, tags,
                user_notes, ai_analysis, is_deleted, is_favorite, is_private,
                reported_content, print_history, print_count, schema_version,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34, $35
            )
            "#,
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.file_info.original_file_name)
        .bind(&record.file_info.file_name)
        .bind(record.file_info.file_size)
        .bind(&record.file_info.content_type)
        .bind(record.file_info.uploaded_at)
        .bind(&record.storage.provider)
        .bind(&record.storage.container)
        .bind(Json(&record.storage.variants))
        .bind(record.image_data.width)
        .bind(record.image_data.height)
        .bind(record.image_data.orientation.as_str())
        .bind(&record.image_data.aspect_ratio)
        .bind(record.image_data.dpi)
        .bind(&record.image_data.color_space)
        .bind(record.image_data.has_transparency)
        .bind(record.exif.as_ref().map(Json))
        .bind(record.processing.status.as_str())
        .bind(record.processing.thumbnail_generated)
        .bind(record.processing.ai_enhancement_available)
        .bind(Json(&record.processing.errors))
        .bind(record.processing.processed_at)
        .bind(&record.tags)
        .bind(&record.user_notes)
        .bind(record.ai_analysis.as_ref().map(Json))
        .bind(record.flags.is_deleted)
        .bind(record.flags.is_favorite)
        .bind(record.flags.is_private)
        .bind(record.flags.reported_content)
        .bind(Json(&record.print_history))
        .bind(record.print_count)
        .bind(record.schema_version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        metrics::counter!("catalog.photos.created").increment(1);
        debug!(photo_id = %record.id, "Photo record created");

        Ok(())
    }

    /// Fetch a record the caller owns. Missing, deleted, and foreign rows
    /// all surface as [`CatalogError::NotFound`].
    pub async fn get_owned(&self, owner_id: Uuid, photo_id: Uuid) -> Result<PhotoRecord> {
        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos \
             WHERE id = $1 AND owner_id = $2 AND is_deleted = FALSE"
        ))
        .bind(photo_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(CatalogError::NotFound)?.try_into()
    }

    /// Fetch by id regardless of soft deletion. Used by print-history
    /// lookups from the order subsystem, never by owner-facing queries.
    pub async fn find_any(&self, photo_id: Uuid) -> Result<Option<PhotoRecord>> {
        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1"
        ))
        .bind(photo_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PhotoRecord::try_from).transpose()
    }

    /// Gallery listing. Count and page read through the same predicate
    /// fragment so they agree on the matching set.
    #[instrument(skip(self, query), fields(owner_id = %owner_id))]
    pub async fn list_gallery(
        &self,
        owner_id: Uuid,
        query: &GalleryQuery,
    ) -> Result<GalleryPage<PhotoRecord>> {
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM photos");
        push_filters(&mut count_builder, owner_id, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut list_builder = QueryBuilder::new(format!("SELECT {PHOTO_COLUMNS} FROM photos"));
        push_filters(&mut list_builder, owner_id, query);
        push_order_and_page(&mut list_builder, query);

        let rows: Vec<PhotoRow> = list_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(PhotoRecord::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(GalleryPage::new(items, total, query.page(), query.page_size()))
    }

    /// Apply owner edits. Refreshes `updated_at` and returns the fresh
    /// record.
    #[instrument(skip(self, update), fields(photo_id = %photo_id, owner_id = %owner_id))]
    pub async fn update_details(
        &self,
        owner_id: Uuid,
        photo_id: Uuid,
        update: &PhotoUpdate,
    ) -> Result<PhotoRecord> {
        if update.is_empty() {
            return self.get_owned(owner_id, photo_id).await;
        }

        let mut builder = QueryBuilder::new("UPDATE photos SET updated_at = NOW()");

        if let Some(tags) = &update.tags {
            builder.push(", tags = ");
            builder.push_bind(crate::photo::normalize_tags(tags));
        }
        if let Some(notes) = &update.user_notes {
            builder.push(", user_notes = ");
            builder.push_bind(notes.clone());
        }
        if let Some(favorite) = update.is_favorite {
            builder.push(", is_favorite = ");
            builder.push_bind(favorite);
        }
        if let Some(private) = update.is_private {
            builder.push(", is_private = ");
            builder.push_bind(private);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(photo_id);
        builder.push(" AND owner_id = ");
        builder.push_bind(owner_id);
        builder.push(" AND is_deleted = FALSE");

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        self.get_owned(owner_id, photo_id).await
    }

    /// Soft delete: hide from owner-facing queries, retain the row and its
    /// print history permanently.
    #[instrument(skip(self), fields(photo_id = %photo_id, owner_id = %owner_id))]
    pub async fn soft_delete(&self, owner_id: Uuid, photo_id: Uuid) -> Result<()> {
        let modified = self.mark_deleted(owner_id, photo_id).await?;
        if modified {
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }

    /// Claim the oldest pending records for processing, FIFO by upload
    /// time. Claiming stamps `claimed_at` as a lease: an in-flight record
    /// is skipped by other pollers until the lease goes stale, at which
    /// point it counts as abandoned by a crashed worker and becomes
    /// claimable again. `SKIP LOCKED` covers the claim statement itself.
    #[instrument(skip(self))]
    pub async fn claim_pending(&self, limit: i64, stale_after: Duration) -> Result<Vec<PhotoRecord>> {
        let rows: Vec<PhotoRow> = sqlx::query_as(&claim_sql())
            .bind(limit)
            .bind(stale_after.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(PhotoRecord::try_from).collect()
    }

    /// Record a successful processing pass: thumbnail variant, analysis
    /// results, `completed` status and completion timestamp.
    #[instrument(skip(self, thumbnail, report, analysis), fields(photo_id = %photo_id))]
    pub async fn complete_processing(
        &self,
        photo_id: Uuid,
        thumbnail: &StorageVariant,
        report: &QualityReport,
        analysis: &AiAnalysis,
    ) -> Result<()> {
        let mut new_variants = HashMap::new();
        new_variants.insert(VARIANT_THUMBNAIL.to_string(), thumbnail.clone());

        let result = sqlx::query(
            r#"
            UPDATE photos SET
                status = 'completed',
                thumbnail_generated = TRUE,
                ai_enhancement_available = $2,
                ai_analysis = $3,
                variants = variants || $4,
                processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(photo_id)
        .bind(report.enhancement_recommended)
        .bind(Json(analysis))
        .bind(Json(&new_variants))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::Processing(
                "record is no longer in processing state".to_string(),
            ));
        }

        metrics::counter!("catalog.photos.processed").increment(1);
        Ok(())
    }

    /// Record a failed processing pass: append the error, set `failed`.
    /// Other records in the worker's batch are unaffected.
    #[instrument(skip(self), fields(photo_id = %photo_id))]
    pub async fn fail_processing(&self, photo_id: Uuid, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE photos SET
                status = 'failed',
                processing_errors = processing_errors || $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(photo_id)
        .bind(Json(vec![message.to_string()]))
        .execute(&self.pool)
        .await?;

        metrics::counter!("catalog.photos.failed").increment(1);
        Ok(())
    }

    /// Re-queue a failed record (the explicit retry edge of the state
    /// machine). Any other current status is an illegal retry.
    #[instrument(skip(self), fields(photo_id = %photo_id, owner_id = %owner_id))]
    pub async fn retry_processing(&self, owner_id: Uuid, photo_id: Uuid) -> Result<PhotoRecord> {
        let record = self.get_owned(owner_id, photo_id).await?;

        if record.processing.status != ProcessingStatus::Failed {
            return Err(CatalogError::InvalidTransition {
                from: record.processing.status,
                to: ProcessingStatus::Processing,
            });
        }

        // Clearing the lease makes the record claimable on the next poll
        sqlx::query(
            "UPDATE photos SET status = 'processing', claimed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'failed'",
        )
        .bind(photo_id)
        .execute(&self.pool)
        .await?;

        metrics::counter!("catalog.photos.retried").increment(1);
        self.get_owned(owner_id, photo_id).await
    }

    /// Merge tags into one owned record. Returns whether a row was touched.
    pub async fn merge_tags(&self, owner_id: Uuid, photo_id: Uuid, tags: &[String]) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE photos SET
                tags = ARRAY(SELECT DISTINCT t FROM unnest(tags || $3::text[]) AS t),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND is_deleted = FALSE
            "#,
        )
        .bind(photo_id)
        .bind(owner_id)
        .bind(tags)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the privacy flag on one owned record
    pub async fn set_privacy(&self, owner_id: Uuid, photo_id: Uuid, private: bool) -> Result<bool> {
        self.set_flag(owner_id, photo_id, "is_private", private).await
    }

    /// Set the favorite flag on one owned record
    pub async fn set_favorite(&self, owner_id: Uuid, photo_id: Uuid, favorite: bool) -> Result<bool> {
        self.set_flag(owner_id, photo_id, "is_favorite", favorite).await
    }

    /// Soft-delete one owned record. Returns whether a row was touched.
    pub async fn mark_deleted(&self, owner_id: Uuid, photo_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE photos SET is_deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 AND is_deleted = FALSE",
        )
        .bind(photo_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_flag(
        &self,
        owner_id: Uuid,
        photo_id: Uuid,
        column: &'static str,
        value: bool,
    ) -> Result<bool> {
        // Column names come from the two callers above, never from input.
        let result = sqlx::query(&format!(
            "UPDATE photos SET {column} = $3, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 AND is_deleted = FALSE"
        ))
        .bind(photo_id)
        .bind(owner_id)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append one print-history entry and bump the print counter. Invoked
    /// by the order subsystem; reaches soft-deleted rows by design so the
    /// history stays complete.
    #[instrument(skip(self, entry), fields(photo_id = %photo_id, order_id = %entry.order_id))]
    pub async fn append_print_record(&self, photo_id: Uuid, entry: &PrintRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE photos SET
                print_history = print_history || $2,
                print_count = print_count + $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(photo_id)
        .bind(Json(vec![entry.clone()]))
        .bind(entry.quantity as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    /// All completed, non-deleted records whose pixel dimensions meet the
    /// given print-size minimums
    pub async fn list_print_eligible(
        &self,
        owner_id: Uuid,
        min_width: i32,
        min_height: i32,
    ) -> Result<Vec<PhotoRecord>> {
        let rows: Vec<PhotoRow> = sqlx::query_as(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos \
             WHERE owner_id = $1 AND is_deleted = FALSE AND status = 'completed' \
               AND width >= $2 AND height >= $3 \
             ORDER BY uploaded_at DESC, id ASC"
        ))
        .bind(owner_id)
        .bind(min_width)
        .bind(min_height)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PhotoRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> PhotoRow {
        PhotoRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            original_file_name: "IMG_0042.jpg".to_string(),
            file_name: "IMG_0042.jpg".to_string(),
            file_size: 2048,
            content_type: "image/jpeg".to_string(),
            uploaded_at: Utc::now(),
            storage_provider: "s3".to_string(),
            storage_container: "photos".to_string(),
            variants: Json(HashMap::new()),
            width: 3000,
            height: 2000,
            orientation: "landscape".to_string(),
            aspect_ratio: "3:2".to_string(),
            dpi: 72,
            color_space: "sRGB".to_string(),
            has_transparency: false,
            exif: None,
            status: "uploaded".to_string(),
            thumbnail_generated: false,
            ai_enhancement_available: false,
            processing_errors: Json(vec![]),
            processed_at: None,
            tags: vec!["beach".to_string()],
            user_notes: String::new(),
            ai_analysis: None,
            is_deleted: false,
            is_favorite: false,
            is_private: false,
            reported_content: false,
            print_history: Json(vec![]),
            print_count: 0,
            schema_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let row = sample_row();
        let id = row.id;
        let record = PhotoRecord::try_from(row).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.processing.status, ProcessingStatus::Uploaded);
        assert_eq!(record.image_data.orientation, Orientation::Landscape);
        assert_eq!(record.tags, vec!["beach"]);
    }

    #[test]
    fn test_row_conversion_rejects_unknown_status() {
        let mut row = sample_row();
        row.status = "exploded".to_string();
        assert!(matches!(
            PhotoRecord::try_from(row),
            Err(CatalogError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_photo_update_is_empty() {
        assert!(PhotoUpdate::default().is_empty());
        let update = PhotoUpdate {
            is_favorite: Some(true),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_claim_skips_fresh_leases() {
        // An in-flight record holds a fresh lease and must not be handed
        // to a second poller; only uploaded records, lease-less records
        // and stale leases are claimable.
        let sql = claim_sql();
        assert!(sql.contains("status = 'uploaded'"));
        assert!(sql.contains("claimed_at IS NULL"));
        assert!(sql.contains("claimed_at < NOW() - make_interval(secs => $2)"));
        assert!(!sql.contains("status IN ('uploaded', 'processing')"));
    }

    #[test]
    fn test_claim_is_fifo_and_lock_free() {
        let sql = claim_sql();
        assert!(sql.contains("ORDER BY uploaded_at ASC, id ASC"));
        assert!(sql.contains("FOR UPDATE SKIP LOCKED"));
        assert!(sql.contains("processed_at IS NULL"));
        assert!(sql.contains("is_deleted = FALSE"));
    }

    #[test]
    fn test_photo_columns_match_row_fields() {
        // The shared column list drives every SELECT; keep it at the same
        // arity as the insert statement (35 columns).
        assert_eq!(PHOTO_COLUMNS.split(',').count(), 35);
    }
}
