//! Traits describing the upstream services and shared request/response types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{BoundingBox, GeoEvent, LocationRecord, PhotoQuery, TimeWindow};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to upstream services.
pub enum PortError {
    /// Network layer failed or the upstream answered with an error status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream payload did not have the expected shape.
    #[error("Malformed upstream payload: {0}")]
    Malformed(String),
    /// Internal pipeline error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Geographic predicate sent to the places directory.
pub enum GeoFilter {
    /// Places whose geometry intersects the rectangle.
    Rect(BoundingBox),
    /// Places lying within the rectangle.
    Within(BoundingBox),
}

#[derive(Debug, Clone, PartialEq)]
/// Query descriptor for the places directory, without pagination.
pub struct PlaceQuery {
    /// Geographic predicate.
    pub geo: GeoFilter,
    /// Only places whose category set includes this id.
    pub category: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Offset/limit slice of a paginated query.
pub struct PageRequest {
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return.
    pub limit: u32,
    /// Whether the upstream should report `total_row_count`.
    pub include_count: bool,
}

#[derive(Debug, Clone)]
/// One page of places.
pub struct Page {
    /// Records on this page.
    pub data: Vec<LocationRecord>,
    /// Number of records the upstream says it included.
    pub included_rows: u64,
    /// Total matching rows reported by the upstream.
    pub total_row_count: u64,
}

#[async_trait]
/// Offset-paginated places directory.
pub trait PlacesPort: Send + Sync {
    /// Fetch one page of places matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the payload is malformed.
    async fn page(&self, query: &PlaceQuery, page: PageRequest) -> Result<Page, PortError>;
}

#[async_trait]
/// Timestamp-paginated photo search.
pub trait PhotosPort: Send + Sync {
    /// Fetch up to `count` geotagged photos around `query` created within `window`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the payload is malformed.
    async fn search(
        &self,
        query: &PhotoQuery,
        window: TimeWindow,
        count: u32,
    ) -> Result<Vec<GeoEvent>, PortError>;
}
