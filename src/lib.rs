//! Shutterpress Catalog Service
//!
//! Photo ingestion and catalog backend for the Shutterpress photo printing
//! platform. The service validates upload batches, stores originals in blob
//! storage, indexes metadata in PostgreSQL, and runs a background worker
//! that generates thumbnails and scores each photo's print suitability.
//! The catalog backs the customer gallery and feeds the print order flow.
//!
//! ## Features
//!
//! - **Upload Intake**: Per-file validation (size, type, image signature)
//!   with partial-batch acceptance
//! - **Pluggable Blob Storage**: S3 (or MinIO) and filesystem backends
//!   behind one trait
//! - **Background Processing**: Poll-based worker claims pending photos
//!   with `SKIP LOCKED`, renders thumbnails, and scores print quality
//! - **Gallery Queries**: Search, tag, and date filtering with stable
//!   keyset-friendly sorting and pagination
//! - **Print Integration**: Size-eligibility queries and append-only print
//!   history for the order flow
//! - **Expiring Download Links**: Presigned URLs for original downloads
//!
//! ## Architecture
//!
//! ```text
//! Upload API                  Blob Storage              PostgreSQL
//! ┌──────────────┐           ┌──────────────┐          ┌──────────────┐
//! │ Validator    │           │ photos/      │          │ photos       │
//! │ + Extractor  │──────────▶│   {owner}/   │          │              │
//! └──────────────┘           │   {photo}/   │          └──────────────┘
//!        │                   │   {variant}  │                 ▲
//!        │                   └──────────────┘                 │
//!        ▼                          ▲                         │
//! ┌──────────────┐                  │                         │
//! │ Catalog      │◀─────────────────┼─────────────────────────┘
//! │ Store        │                  │
//! └──────────────┘                  │
//!        │                          │
//!        ▼                          │
//! ┌──────────────┐           ┌──────────────┐
//! │ Processing   │──────────▶│ Thumbnails + │
//! │ Worker       │           │ Quality      │
//! └──────────────┘           └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │ Gallery /    │
//! │ Download API │
//! └──────────────┘
//! ```

pub mod api;
pub mod bulk;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod photo;
pub mod print_sizes;
pub mod query;
pub mod storage;
pub mod validator;
pub mod worker;

pub use api::AppState;
pub use bulk::{BulkMutator, BulkOperation, BulkOutcome, BulkTarget};
pub use catalog::{CatalogStore, PhotoUpdate};
pub use config::Config;
pub use download::{DownloadLink, DownloadLinkIssuer};
pub use error::{CatalogError, Result};
pub use extractor::{DefaultCodec, ImageCodec, MetadataExtractor, QualityAnalyzer};
pub use ingest::{IngestionOrchestrator, UploadOptions, UploadOutcome};
pub use photo::{PhotoRecord, ProcessingStatus};
pub use query::{GalleryPage, GalleryQuery};
pub use storage::{FsStorage, S3Storage, StorageBackend};
pub use validator::{UploadFile, UploadValidator};
pub use worker::ProcessingWorker;
