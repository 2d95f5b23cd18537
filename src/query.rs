//! Gallery query engine: filter, sort, and paginate owner-scoped photo
//! listings.
//!
//! The count and list queries are built from the same predicate fragment,
//! so they can never disagree on which records match.

use crate::photo::normalize_tags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Hard upper bound on page size
pub const MAX_PAGE_SIZE: i64 = 100;
/// Default page size
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Sortable gallery fields
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    UploadDate,
    Filename,
    FileSize,
    PrintCount,
    ProcessingStatus,
}

impl SortField {
    /// Whitelisted column name; sort input never reaches SQL as raw text
    fn column(&self) -> &'static str {
        match self {
            Self::UploadDate => "uploaded_at",
            Self::Filename => "file_name",
            Self::FileSize => "file_size",
            Self::PrintCount => "print_count",
            Self::ProcessingStatus => "status",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Gallery filter/sort/pagination parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GalleryQuery {
    /// Free-text term matched case-insensitively against filename, notes,
    /// or any tag
    pub search: Option<String>,
    /// All listed tags must be present on a matching record
    pub tags: Option<Vec<String>>,
    /// Inclusive lower bound on upload time
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on upload time, extended to end of day
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default = "default_sort_field")]
    pub sort_field: SortField,
    #[serde(default = "default_sort_direction")]
    pub sort_direction: SortDirection,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_sort_field() -> SortField {
    SortField::UploadDate
}

fn default_sort_direction() -> SortDirection {
    SortDirection::Desc
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for GalleryQuery {
    fn default() -> Self {
        Self {
            search: None,
            tags: None,
            date_from: None,
            date_to: None,
            sort_field: default_sort_field(),
            sort_direction: default_sort_direction(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl GalleryQuery {
    /// Page number clamped to >= 1
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// Page size clamped to 1..=100
    pub fn page_size(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows skipped before this page
    pub fn skip(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

/// Append the shared WHERE predicate: owner scope, soft-delete exclusion,
/// then the optional filters. Used verbatim by both the count and the list
/// query.
pub fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, query: &GalleryQuery) {
    builder.push(" WHERE owner_id = ");
    builder.push_bind(owner_id);
    builder.push(" AND is_deleted = FALSE");

    if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(term.trim());
        builder.push(" AND (file_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR user_notes ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ");
        builder.push_bind(pattern);
        builder.push("))");
    }

    if let Some(tags) = &query.tags {
        let normalized = normalize_tags(tags);
        if !normalized.is_empty() {
            // Containment: every requested tag must be present.
            builder.push(" AND tags @> ");
            builder.push_bind(normalized);
        }
    }

    if let Some(from) = query.date_from {
        builder.push(" AND uploaded_at >= ");
        builder.push_bind(from);
    }

    if let Some(to) = query.date_to {
        builder.push(" AND uploaded_at <= ");
        builder.push_bind(end_of_day(to));
    }
}

/// Append ORDER BY / LIMIT / OFFSET. The record id is the deterministic
/// tie-break so pagination stays stable for equal sort keys.
pub fn push_order_and_page(builder: &mut QueryBuilder<'_, Postgres>, query: &GalleryQuery) {
    builder.push(" ORDER BY ");
    builder.push(query.sort_field.column());
    builder.push(" ");
    builder.push(query.sort_direction.sql());
    builder.push(", id ASC LIMIT ");
    builder.push_bind(query.page_size());
    builder.push(" OFFSET ");
    builder.push_bind(query.skip());
}

/// Escape LIKE metacharacters and wrap in wildcards
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Extend an inclusive upper bound to the end of its UTC day
pub fn end_of_day(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .date_naive()
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .expect("valid end-of-day time")
        .and_utc()
}

/// One page of gallery results with derived pagination fields
#[derive(Debug, Clone, Serialize)]
pub struct GalleryPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl<T> GalleryPage<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
            has_previous_page: page > 1,
            has_next_page: page < total_pages,
        }
    }
}
