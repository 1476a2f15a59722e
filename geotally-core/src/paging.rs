//! Exhaustive retrieval from the offset-paginated places directory.

use tracing::{debug, warn};

use crate::model::LocationRecord;
use crate::ports::{PageRequest, PlaceQuery, PlacesPort, PortError};

/// Rows requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Ceiling applied to the upstream-reported total unless configured otherwise.
pub const DEFAULT_ROW_CAP: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Position of a paginated walk.
pub struct PageCursor {
    /// Offset of the next page.
    pub offset: u64,
    /// Records kept so far, after filtering.
    pub collected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Walks every page of a places query.
pub struct PagedFetcher {
    page_size: u32,
    row_cap: Option<u64>,
}

impl Default for PagedFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, Some(DEFAULT_ROW_CAP))
    }
}

impl PagedFetcher {
    /// Create a fetcher requesting `page_size` rows per page and stopping at
    /// `row_cap` rows when set.
    #[must_use]
    pub fn new(page_size: u32, row_cap: Option<u64>) -> Self {
        Self {
            page_size: page_size.max(1),
            row_cap,
        }
    }

    /// Fetch every page of `query`, passing each page through `filter`.
    ///
    /// The total is captured from the first page and capped at the row cap.
    /// A page that includes no rows ends the walk early.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] raised by the port; partial results are dropped.
    pub async fn fetch_all<T, F>(
        &self,
        port: &dyn PlacesPort,
        query: &PlaceQuery,
        mut filter: F,
    ) -> Result<Vec<T>, PortError>
    where
        F: FnMut(Vec<LocationRecord>) -> Vec<T> + Send,
        T: Send,
    {
        let mut cursor = PageCursor {
            offset: 0,
            collected: 0,
        };
        let mut total: Option<u64> = None;
        let mut matches = Vec::new();

        loop {
            let request = PageRequest {
                offset: cursor.offset,
                limit: self.page_size,
                include_count: true,
            };
            let page = port.page(query, request).await?;

            let bound = *total.get_or_insert_with(|| match self.row_cap {
                Some(cap) => page.total_row_count.min(cap),
                None => page.total_row_count,
            });

            cursor.offset += page.included_rows;
            let kept = filter(page.data);
            cursor.collected += kept.len();
            matches.extend(kept);

            debug!(
                offset = cursor.offset,
                included_rows = page.included_rows,
                total = bound,
                collected = cursor.collected,
                "places_page"
            );

            if cursor.offset >= bound {
                break;
            }
            if page.included_rows == 0 {
                warn!(
                    offset = cursor.offset,
                    total = bound,
                    "places upstream returned an empty page before the reported total; stopping"
                );
                break;
            }
        }

        Ok(matches)
    }

    /// Fetch every record of `query` without filtering.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] raised by the port.
    pub async fn fetch_records(
        &self,
        port: &dyn PlacesPort,
        query: &PlaceQuery,
    ) -> Result<Vec<LocationRecord>, PortError> {
        self.fetch_all(port, query, |records| records).await
    }
}
