//! Expiring download links for original photos.
//!
//! Links are minted on demand and never persisted; expiry is enforced by
//! the storage backend, not the catalog. Every missing case (unknown
//! photo, foreign owner, record without an original variant, object gone
//! from storage) collapses to `None` so callers cannot distinguish them.

use crate::catalog::CatalogStore;
use crate::error::{CatalogError, Result};
use crate::photo::{PhotoRecord, VARIANT_ORIGINAL};
use crate::storage::{StorageBackend, TemporaryUrl};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A minted link and when it stops working
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl From<TemporaryUrl> for DownloadLink {
    fn from(t: TemporaryUrl) -> Self {
        Self {
            url: t.url,
            expires_at: t.expires_at,
        }
    }
}

/// Mints expiring URLs for the original variant of owned photos
pub struct DownloadLinkIssuer {
    store: Arc<CatalogStore>,
    storage: Arc<dyn StorageBackend>,
    ttl: Duration,
}

impl DownloadLinkIssuer {
    pub fn new(store: Arc<CatalogStore>, storage: Arc<dyn StorageBackend>, ttl: Duration) -> Self {
        Self { store, storage, ttl }
    }

    /// Mint a link for a photo the caller owns
    #[instrument(skip(self), fields(photo_id = %photo_id, owner_id = %owner_id))]
    pub async fn issue(&self, owner_id: Uuid, photo_id: Uuid) -> Result<Option<DownloadLink>> {
        let record = match self.store.get_owned(owner_id, photo_id).await {
            Ok(record) => record,
            Err(CatalogError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };

        self.issue_for_record(&record).await
    }

    /// Mint a link for an already-fetched record
    pub async fn issue_for_record(&self, record: &PhotoRecord) -> Result<Option<DownloadLink>> {
        let Some(path) = record.variant_path(VARIANT_ORIGINAL) else {
            debug!(photo_id = %record.id, "Record has no original variant");
            return Ok(None);
        };

        let minted = self
            .storage
            .temporary_url(path, &record.storage.container, self.ttl)
            .await?;

        if minted.is_some() {
            metrics::counter!("catalog.download_links.issued").increment(1);
        }

        Ok(minted.map(DownloadLink::from))
    }
}
