//! Bulk mutations over owner-selected photo sets.
//!
//! The operation set is a closed enum: adding an action means adding a
//! variant here and an arm in the executor, not registering a handler at
//! runtime. Each record is mutated by its own single-row update, so a batch
//! is not transactional; records that are missing, deleted, or owned by
//! someone else are skipped silently and simply don't count as modified.

use crate::catalog::CatalogStore;
use crate::error::{CatalogError, Result};
use crate::photo::normalize_tags;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-record store operations a bulk action is allowed to perform. Each
/// returns whether a row was actually touched; the store's owner and
/// soft-delete scoping decides that, not the mutator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BulkTarget: Send + Sync {
    async fn merge_tags(&self, owner_id: Uuid, photo_id: Uuid, tags: &[String]) -> Result<bool>;
    async fn set_privacy(&self, owner_id: Uuid, photo_id: Uuid, private: bool) -> Result<bool>;
    async fn set_favorite(&self, owner_id: Uuid, photo_id: Uuid, favorite: bool) -> Result<bool>;
    async fn mark_deleted(&self, owner_id: Uuid, photo_id: Uuid) -> Result<bool>;
}

#[async_trait]
impl BulkTarget for CatalogStore {
    async fn merge_tags(&self, owner_id: Uuid, photo_id: Uuid, tags: &[String]) -> Result<bool> {
        CatalogStore::merge_tags(self, owner_id, photo_id, tags).await
    }

    async fn set_privacy(&self, owner_id: Uuid, photo_id: Uuid, private: bool) -> Result<bool> {
        CatalogStore::set_privacy(self, owner_id, photo_id, private).await
    }

    async fn set_favorite(&self, owner_id: Uuid, photo_id: Uuid, favorite: bool) -> Result<bool> {
        CatalogStore::set_favorite(self, owner_id, photo_id, favorite).await
    }

    async fn mark_deleted(&self, owner_id: Uuid, photo_id: Uuid) -> Result<bool> {
        CatalogStore::mark_deleted(self, owner_id, photo_id).await
    }
}

/// One action applied uniformly to every photo in the request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkOperation {
    /// Merge the given tags into each photo's tag set
    AddTags { tags: Vec<String> },
    /// Set the privacy flag
    SetPrivacy { private: bool },
    /// Set the favorite flag
    SetFavorite { favorite: bool },
    /// Soft-delete the photos
    Delete,
}

impl BulkOperation {
    /// Stable name for logs and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTags { .. } => "add_tags",
            Self::SetPrivacy { .. } => "set_privacy",
            Self::SetFavorite { .. } => "set_favorite",
            Self::Delete => "delete",
        }
    }
}

/// Result of one bulk request
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    /// Photos actually modified; requested minus skipped
    pub modified: u64,
    /// Photos requested
    pub requested: usize,
}

/// Applies one [`BulkOperation`] across a list of photo ids
pub struct BulkMutator {
    store: Arc<dyn BulkTarget>,
}

impl BulkMutator {
    pub fn new(store: Arc<dyn BulkTarget>) -> Self {
        Self { store }
    }

    /// Run the operation for each id in turn. Tags are normalized once for
    /// the whole batch; an `add_tags` with no usable tags is rejected
    /// before any record is touched.
    #[instrument(skip(self, operation), fields(owner_id = %owner_id, action = operation.name()))]
    pub async fn apply(
        &self,
        owner_id: Uuid,
        photo_ids: &[Uuid],
        operation: &BulkOperation,
    ) -> Result<BulkOutcome> {
        if photo_ids.is_empty() {
            return Err(CatalogError::validation(
                "photo_ids",
                "at least one photo id is required",
            ));
        }

        let normalized = match operation {
            BulkOperation::AddTags { tags } => {
                let normalized = normalize_tags(tags);
                if normalized.is_empty() {
                    return Err(CatalogError::validation(
                        "tags",
                        "at least one non-empty tag is required",
                    ));
                }
                Some(normalized)
            }
            _ => None,
        };

        let mut modified = 0u64;
        for &photo_id in photo_ids {
            let touched = match operation {
                BulkOperation::AddTags { .. } => {
                    let tags = normalized.as_deref().unwrap_or_default();
                    self.store.merge_tags(owner_id, photo_id, tags).await?
                }
                BulkOperation::SetPrivacy { private } => {
                    self.store.set_privacy(owner_id, photo_id, *private).await?
                }
                BulkOperation::SetFavorite { favorite } => {
                    self.store.set_favorite(owner_id, photo_id, *favorite).await?
                }
                BulkOperation::Delete => self.store.mark_deleted(owner_id, photo_id).await?,
            };
            if touched {
                modified += 1;
            }
        }

        metrics::counter!("catalog.bulk.operations", "action" => operation.name())
            .increment(1);
        metrics::counter!("catalog.bulk.photos_modified").increment(modified);
        info!(
            action = operation.name(),
            requested = photo_ids.len(),
            modified,
            "Bulk operation applied"
        );

        Ok(BulkOutcome {
            modified,
            requested: photo_ids.len(),
        })
    }
}
