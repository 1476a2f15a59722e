//! High-level service facade used by the HTTP layer.

use std::sync::Arc;

use chrono::Weekday;
use futures::stream::BoxStream;

use crate::hours::filter_open_during;
use crate::model::{BoundingBox, Feature, FeatureCollection, GeoEvent, PhotoQuery, TimeRange};
use crate::paging::{DEFAULT_PAGE_SIZE, DEFAULT_ROW_CAP, PagedFetcher};
use crate::ports::{GeoFilter, PhotosPort, PlaceQuery, PlacesPort, PortError};
use crate::schedule::{
    DEFAULT_CONCURRENCY, DEFAULT_LOOKBACK_SECS, DEFAULT_WINDOW_SECS, WindowScheduler,
};
use crate::window::{DEFAULT_CHUNK_SIZE, WindowWalker};

/// Directory category counted by [`GeoTallyService::count_open_retail`] by default.
pub const DEFAULT_RETAIL_CATEGORY: u32 = 123;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Tunables for the aggregation pipeline.
pub struct PipelineSettings {
    /// Rows per places page.
    pub places_page_size: u32,
    /// Ceiling on the places total; `None` walks everything the upstream reports.
    pub places_row_cap: Option<u64>,
    /// Items per photo chunk.
    pub photos_page_size: u32,
    /// Length of one photo window in seconds.
    pub photos_window_secs: i64,
    /// Total photo lookback in seconds.
    pub photos_lookback_secs: i64,
    /// Photo windows swept at once.
    pub photos_concurrency: usize,
    /// Category used for the retail count.
    pub retail_category: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            places_page_size: DEFAULT_PAGE_SIZE,
            places_row_cap: Some(DEFAULT_ROW_CAP),
            photos_page_size: DEFAULT_CHUNK_SIZE,
            photos_window_secs: DEFAULT_WINDOW_SECS,
            photos_lookback_secs: DEFAULT_LOOKBACK_SECS,
            photos_concurrency: DEFAULT_CONCURRENCY,
            retail_category: DEFAULT_RETAIL_CATEGORY,
        }
    }
}

/// Public entry point combining both upstreams with the pipeline.
pub struct GeoTallyService {
    places: Arc<dyn PlacesPort>,
    photos: Arc<dyn PhotosPort>,
    fetcher: PagedFetcher,
    scheduler: WindowScheduler,
    retail_category: u32,
}

impl GeoTallyService {
    /// Create a new service bound to the given upstreams.
    #[must_use]
    pub fn new(
        places: Arc<dyn PlacesPort>,
        photos: Arc<dyn PhotosPort>,
        settings: PipelineSettings,
    ) -> Self {
        let walker = WindowWalker::new(settings.photos_page_size);
        Self {
            places,
            photos,
            fetcher: PagedFetcher::new(settings.places_page_size, settings.places_row_cap),
            scheduler: WindowScheduler::new(
                walker,
                settings.photos_lookback_secs,
                settings.photos_window_secs,
                settings.photos_concurrency,
            ),
            retail_category: settings.retail_category,
        }
    }

    /// All places of `category` intersecting `bbox`, as GeoJSON.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if any page request fails.
    pub async fn places_geojson(
        &self,
        bbox: BoundingBox,
        category: u32,
    ) -> Result<FeatureCollection, PortError> {
        let query = PlaceQuery {
            geo: GeoFilter::Rect(bbox),
            category,
        };
        let features = self
            .fetcher
            .fetch_all(self.places.as_ref(), &query, |records| {
                records.into_iter().map(Feature::from).collect()
            })
            .await?;
        Ok(FeatureCollection::new(features))
    }

    /// Number of retail places within `bbox` open during `range` on `day`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if any page request fails.
    pub async fn count_open_retail(
        &self,
        bbox: BoundingBox,
        day: Weekday,
        range: TimeRange,
    ) -> Result<usize, PortError> {
        let query = PlaceQuery {
            geo: GeoFilter::Within(bbox),
            category: self.retail_category,
        };
        let open = self
            .fetcher
            .fetch_all(self.places.as_ref(), &query, |records| {
                filter_open_during(records, day, range)
            })
            .await?;
        Ok(open.len())
    }

    /// Stream of photo events around `query` over the configured lookback ending at `now`.
    ///
    /// Each item holds one window's events; windows arrive in completion order.
    #[must_use]
    pub fn photo_history(
        &self,
        query: PhotoQuery,
        now: i64,
    ) -> BoxStream<'static, Result<Vec<GeoEvent>, PortError>> {
        self.scheduler
            .collect_history(Arc::clone(&self.photos), query, now)
    }
}
