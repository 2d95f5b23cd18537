//! HTTP API for the photo catalog.
//!
//! Every owner-scoped route reads the caller's id from the `X-Owner-Id`
//! header; the gateway in front of this service sets it after
//! authentication. Missing or foreign records produce the same 404 body so
//! the API never confirms another user's photo exists.

use crate::bulk::{BulkMutator, BulkOperation, BulkOutcome};
use crate::catalog::{CatalogStore, PhotoUpdate};
use crate::config::{ApiConfig, UploadConfig};
use crate::download::DownloadLinkIssuer;
use crate::error::CatalogError;
use crate::ingest::{IngestionOrchestrator, UploadOptions, UploadOutcome};
use crate::photo::{PhotoRecord, VARIANT_THUMBNAIL};
use crate::print_sizes;
use crate::query::{GalleryPage, GalleryQuery, SortDirection, SortField};
use crate::validator::UploadFile;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CatalogStore>,
    pub ingestion: Arc<IngestionOrchestrator>,
    pub bulk: Arc<BulkMutator>,
    pub downloads: Arc<DownloadLinkIssuer>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

/// Map a pipeline error onto an HTTP status and stable error code
fn map_error(err: CatalogError) -> ApiError {
    match err {
        CatalogError::Validation { .. } => {
            api_error(StatusCode::BAD_REQUEST, err.to_string(), "VALIDATION_ERROR")
        }
        CatalogError::NotFound => {
            api_error(StatusCode::NOT_FOUND, "Photo not found", "NOT_FOUND")
        }
        CatalogError::InvalidTransition { .. } => {
            api_error(StatusCode::CONFLICT, err.to_string(), "INVALID_TRANSITION")
        }
        CatalogError::Storage(_) | CatalogError::Processing(_) => {
            error!(error = %err, "Backend failure");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
                "BACKEND_ERROR",
            )
        }
        CatalogError::CorruptRecord(_) | CatalogError::Database(_) => {
            error!(error = %err, "Catalog failure");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
                "INTERNAL_ERROR",
            )
        }
    }
}

/// Pull the authenticated owner id from the gateway-set header
fn owner_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get("x-owner-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                "Missing or invalid X-Owner-Id header",
                "UNAUTHORIZED",
            )
        })
}

/// One file in an upload request, bytes as base64
#[derive(Debug, Deserialize)]
pub struct UploadFilePayload {
    pub file_name: String,
    pub content_type: String,
    /// Base64-encoded file bytes
    pub data: String,
}

/// Upload batch request. Tags, notes, and privacy apply to every accepted
/// file in the batch.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<UploadFilePayload>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// Photo in API responses
#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub width: i32,
    pub height: i32,
    pub orientation: String,
    pub aspect_ratio: String,
    pub status: String,
    pub progress_percent: u8,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub user_notes: String,
    pub is_favorite: bool,
    pub is_private: bool,
    pub print_count: i32,
    pub quality_score: Option<f32>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<PhotoRecord> for PhotoResponse {
    fn from(record: PhotoRecord) -> Self {
        let thumbnail_url = record
            .storage
            .variants
            .get(VARIANT_THUMBNAIL)
            .map(|v| v.url.clone());

        Self {
            id: record.id,
            file_name: record.file_info.file_name,
            original_file_name: record.file_info.original_file_name,
            content_type: record.file_info.content_type,
            file_size: record.file_info.file_size,
            uploaded_at: record.file_info.uploaded_at,
            width: record.image_data.width,
            height: record.image_data.height,
            orientation: record.image_data.orientation.as_str().to_string(),
            aspect_ratio: record.image_data.aspect_ratio,
            status: record.processing.status.as_str().to_string(),
            progress_percent: record.processing.status.progress_percent(),
            thumbnail_url,
            tags: record.tags,
            user_notes: record.user_notes,
            is_favorite: record.flags.is_favorite,
            is_private: record.flags.is_private,
            print_count: record.print_count,
            quality_score: record.ai_analysis.map(|a| a.quality_score),
            processed_at: record.processing.processed_at,
        }
    }
}

/// Gallery listing query parameters. `tags` is comma-separated.
#[derive(Debug, Deserialize)]
pub struct PhotoListQuery {
    pub search: Option<String>,
    pub tags: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort_field: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<PhotoListQuery> for GalleryQuery {
    fn from(params: PhotoListQuery) -> Self {
        let defaults = GalleryQuery::default();
        GalleryQuery {
            search: params.search,
            tags: params
                .tags
                .map(|t| t.split(',').map(str::to_string).collect()),
            date_from: params.date_from,
            date_to: params.date_to,
            sort_field: params.sort_field.unwrap_or(defaults.sort_field),
            sort_direction: params.sort_direction.unwrap_or(defaults.sort_direction),
            page: params.page.unwrap_or(defaults.page),
            page_size: params.page_size.unwrap_or(defaults.page_size),
        }
    }
}

/// Processing status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: Uuid,
    pub status: String,
    pub progress_percent: u8,
    pub thumbnail_generated: bool,
    pub errors: Vec<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Bulk mutation request
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub photo_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub operation: BulkOperation,
}

/// Print-size eligibility response
#[derive(Debug, Serialize)]
pub struct PrintEligibleResponse {
    pub size: String,
    pub min_width: i32,
    pub min_height: i32,
    pub photos: Vec<PhotoResponse>,
}

/// Request body ceiling for the largest valid upload batch. Files travel
/// base64-encoded inside a JSON envelope, so the raw byte budget grows by
/// 4/3 plus a little headroom for the envelope itself. Oversized individual
/// files still fail per-file validation; this only keeps axum's default
/// limit from rejecting legal batches before the handler runs.
fn upload_body_limit(upload: &UploadConfig) -> usize {
    let raw = upload.max_files_per_batch * upload.max_file_size_bytes;
    raw / 3 * 4 + 1024 * 1024
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig, upload: &UploadConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/v1/photos", post(upload_photos).get(list_photos))
        .route(
            "/api/v1/photos/:photo_id",
            get(get_photo).patch(update_photo).delete(delete_photo),
        )
        .route("/api/v1/photos/bulk", post(bulk_mutate))
        .route("/api/v1/photos/:photo_id/status", get(get_status))
        .route("/api/v1/photos/:photo_id/retry", post(retry_photo))
        .route("/api/v1/photos/:photo_id/download-url", get(get_download_url))
        .route("/api/v1/print-sizes/:size/photos", get(list_print_eligible))
        .layer(DefaultBodyLimit::max(upload_body_limit(upload)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "catalog-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(state.store.pool()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Upload a batch of photos
#[instrument(skip(state, headers, request))]
async fn upload_photos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadOutcome>), ApiError> {
    let owner = owner_id(&headers)?;

    let options = UploadOptions {
        tags: request.tags,
        user_notes: request.user_notes.unwrap_or_default(),
        is_private: request.is_private.unwrap_or(false),
    };

    let mut files = Vec::with_capacity(request.files.len());
    for payload in request.files {
        let data = BASE64.decode(&payload.data).map_err(|_| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("File {} is not valid base64", payload.file_name),
                "INVALID_ENCODING",
            )
        })?;
        files.push(UploadFile {
            file_name: payload.file_name,
            content_type: payload.content_type,
            data,
        });
    }

    let outcome = state
        .ingestion
        .ingest(owner, files, options)
        .await
        .map_err(map_error)?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Gallery listing with filtering, sorting and pagination
#[instrument(skip(state, headers))]
async fn list_photos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PhotoListQuery>,
) -> Result<Json<GalleryPage<PhotoResponse>>, ApiError> {
    let owner = owner_id(&headers)?;
    let query: GalleryQuery = params.into();

    let page = state
        .store
        .list_gallery(owner, &query)
        .await
        .map_err(map_error)?;

    Ok(Json(GalleryPage {
        items: page.items.into_iter().map(PhotoResponse::from).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
        has_previous_page: page.has_previous_page,
        has_next_page: page.has_next_page,
    }))
}

/// Get a single photo
#[instrument(skip(state, headers))]
async fn get_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(photo_id): Path<Uuid>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let record = state
        .store
        .get_owned(owner, photo_id)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

/// Update owner-editable details
#[instrument(skip(state, headers, update))]
async fn update_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(photo_id): Path<Uuid>,
    Json(update): Json<PhotoUpdate>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let record = state
        .store
        .update_details(owner, photo_id, &update)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

/// Soft-delete a photo
#[instrument(skip(state, headers))]
async fn delete_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(photo_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let owner = owner_id(&headers)?;
    state
        .store
        .soft_delete(owner, photo_id)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a bulk mutation across a set of photos
#[instrument(skip(state, headers, request))]
async fn bulk_mutate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkOutcome>, ApiError> {
    let owner = owner_id(&headers)?;
    let outcome = state
        .bulk
        .apply(owner, &request.photo_ids, &request.operation)
        .await
        .map_err(map_error)?;
    Ok(Json(outcome))
}

/// Processing status for one photo
#[instrument(skip(state, headers))]
async fn get_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(photo_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let record = state
        .store
        .get_owned(owner, photo_id)
        .await
        .map_err(map_error)?;

    Ok(Json(StatusResponse {
        id: record.id,
        status: record.processing.status.as_str().to_string(),
        progress_percent: record.processing.status.progress_percent(),
        thumbnail_generated: record.processing.thumbnail_generated,
        errors: record.processing.errors,
        processed_at: record.processing.processed_at,
    }))
}

/// Re-queue a failed photo for processing
#[instrument(skip(state, headers))]
async fn retry_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(photo_id): Path<Uuid>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let record = state
        .store
        .retry_processing(owner, photo_id)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

/// Mint an expiring download link for the original
#[instrument(skip(state, headers))]
async fn get_download_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = owner_id(&headers)?;
    let link = state
        .downloads
        .issue(owner, photo_id)
        .await
        .map_err(map_error)?;

    match link {
        Some(link) => Ok(Json(link)),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            "Photo not found",
            "NOT_FOUND",
        )),
    }
}

/// Photos eligible for a given print size
#[instrument(skip(state, headers))]
async fn list_print_eligible(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(size): Path<String>,
) -> Result<Json<PrintEligibleResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let threshold = print_sizes::resolve(&size);

    let records = state
        .store
        .list_print_eligible(owner, threshold.min_width, threshold.min_height)
        .await
        .map_err(map_error)?;

    Ok(Json(PrintEligibleResponse {
        size: threshold.size.to_string(),
        min_width: threshold.min_width,
        min_height: threshold.min_height,
        photos: records.into_iter().map(PhotoResponse::from).collect(),
    }))
}

/// Bind and serve the API
pub async fn start_api_server(
    state: AppState,
    config: &ApiConfig,
    upload: &UploadConfig,
) -> Result<()> {
    let router = create_router(state, config, upload);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting catalog API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_owner_id_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(owner_id(&headers).is_err());

        headers.insert("x-owner-id", HeaderValue::from_static("not-a-uuid"));
        assert!(owner_id(&headers).is_err());

        let id = Uuid::new_v4();
        headers.insert(
            "x-owner-id",
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(owner_id(&headers).unwrap(), id);
    }

    #[test]
    fn test_error_mapping() {
        let (status, body) = map_error(CatalogError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");

        let (status, body) =
            map_error(CatalogError::validation("files", "too many files in batch"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION_ERROR");

        let (status, body) = map_error(CatalogError::InvalidTransition {
            from: crate::photo::ProcessingStatus::Completed,
            to: crate::photo::ProcessingStatus::Processing,
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "INVALID_TRANSITION");
    }

    #[test]
    fn test_list_query_conversion_splits_tags() {
        let params = PhotoListQuery {
            search: None,
            tags: Some("beach,Family".to_string()),
            date_from: None,
            date_to: None,
            sort_field: None,
            sort_direction: None,
            page: None,
            page_size: None,
        };
        let query: GalleryQuery = params.into();
        assert_eq!(
            query.tags,
            Some(vec!["beach".to_string(), "Family".to_string()])
        );
        assert_eq!(query.sort_field, SortField::UploadDate);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_bulk_request_flattens_operation() {
        let request: BulkRequest = serde_json::from_str(
            r#"{
                "photo_ids": ["5f3a8e46-2e2a-4f6e-9c8e-0a2b1c3d4e5f"],
                "action": "set_favorite",
                "favorite": true
            }"#,
        )
        .unwrap();
        assert_eq!(request.photo_ids.len(), 1);
        assert_eq!(request.operation, BulkOperation::SetFavorite { favorite: true });
    }

    #[test]
    fn test_body_limit_covers_a_full_base64_batch() {
        let upload = UploadConfig::default();
        let raw_batch = upload.max_files_per_batch * upload.max_file_size_bytes;
        // Base64 inflates payloads by 4/3; the limit has to clear that
        // plus the JSON envelope around the file entries.
        assert!(upload_body_limit(&upload) > raw_batch / 3 * 4);

        let single = UploadConfig {
            max_files_per_batch: 1,
            max_file_size_bytes: 25 * 1024 * 1024,
            ..Default::default()
        };
        assert!(upload_body_limit(&single) > 25 * 1024 * 1024 * 4 / 3);
    }

    fn test_state() -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/catalog_test")
            .unwrap();
        let store = Arc::new(CatalogStore::with_pool(pool));
        let storage: Arc<dyn crate::storage::StorageBackend> =
            Arc::new(crate::storage::MockStorageBackend::new());
        let codec: Arc<dyn crate::extractor::ImageCodec> =
            Arc::new(crate::extractor::MockImageCodec::new());
        AppState {
            store: store.clone(),
            ingestion: Arc::new(IngestionOrchestrator::new(
                store.clone(),
                storage.clone(),
                crate::extractor::MetadataExtractor::new(codec),
                crate::validator::UploadValidator::new(UploadConfig::default()),
                "photos".to_string(),
            )),
            bulk: Arc::new(BulkMutator::new(store.clone())),
            downloads: Arc::new(DownloadLinkIssuer::new(
                store,
                storage,
                std::time::Duration::from_secs(3600),
            )),
        }
    }

    #[tokio::test]
    async fn test_multi_megabyte_upload_body_reaches_validation() {
        use tower::ServiceExt;

        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_enabled: false,
            cors_origins: vec![],
        };
        let router = create_router(test_state(), &config, &UploadConfig::default());

        // Well past axum's 2 MiB default body limit, but a legal batch.
        // The bytes carry no image signature, so the file is rejected by
        // validation, which proves the handler actually ran.
        let payload = serde_json::json!({
            "files": [{
                "file_name": "big.jpg",
                "content_type": "image/jpeg",
                "data": BASE64.encode(vec![0u8; 3 * 1024 * 1024]),
            }]
        });
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/photos")
            .header("content-type", "application/json")
            .header("x-owner-id", Uuid::new_v4().to_string())
            .body(axum::body::Body::from(payload.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_ne!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let outcome: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(outcome["accepted"], 0);
        assert_eq!(outcome["rejected"], 1);
    }
}
