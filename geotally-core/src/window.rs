//! Backward sweep of one time window against the photo search.
//!
//! The upstream returns at most `page_size` newest items inside the requested
//! bounds. Each chunk moves the upper bound to one second before the oldest
//! item seen, until a chunk comes back with at most one item or the oldest
//! timestamp stops moving.
//!
//! The walk also ends once the oldest item sits on the window start, since
//! the next request would have its bounds reversed.

use tracing::{debug, warn};

use crate::model::{GeoEvent, PhotoQuery, TimeWindow};
use crate::ports::{PhotosPort, PortError};

/// Items requested per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Collects every event of a window by walking backwards in time.
pub struct WindowWalker {
    page_size: u32,
}

impl Default for WindowWalker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl WindowWalker {
    /// Create a walker requesting `page_size` items per chunk.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Collect all events in `window` around `query`.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] raised by the port.
    pub async fn collect_window(
        &self,
        port: &dyn PhotosPort,
        window: TimeWindow,
        query: &PhotoQuery,
    ) -> Result<Vec<GeoEvent>, PortError> {
        let mut events = Vec::new();
        let mut upper = window.stop;
        let mut previous_min: Option<i64> = None;

        loop {
            let bounds = TimeWindow {
                start: window.start,
                stop: upper,
            };
            let chunk = port.search(query, bounds, self.page_size).await?;
            debug!(
                start = bounds.start,
                stop = bounds.stop,
                count = chunk.len(),
                "photos_chunk"
            );

            let chunk_len = chunk.len();
            let chunk_min = chunk.iter().map(|event| event.timestamp).min();
            events.extend(chunk);

            let Some(min) = chunk_min.filter(|_| chunk_len > 1) else {
                break;
            };
            if previous_min == Some(min) {
                warn!(
                    start = window.start,
                    stop = window.stop,
                    min,
                    "photos cursor stopped moving; ending window"
                );
                break;
            }
            previous_min = Some(min);

            // Nothing older than the window start can be requested.
            if min <= window.start {
                break;
            }
            upper = min - 1;
        }

        debug!(
            start = window.start,
            stop = window.stop,
            events = events.len(),
            "window done"
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    fn event(timestamp: i64) -> GeoEvent {
        GeoEvent::new(timestamp, 37.0, -122.0).unwrap()
    }

    fn query() -> PhotoQuery {
        PhotoQuery {
            lat: 37.0,
            lng: -122.0,
            distance: Some(1_000.0),
        }
    }

    /// Answers from a store of timestamps, newest first, honouring bounds and count.
    struct StorePhotos {
        timestamps: Vec<i64>,
        requests: Mutex<Vec<TimeWindow>>,
    }

    #[async_trait]
    impl PhotosPort for StorePhotos {
        async fn search(
            &self,
            _query: &PhotoQuery,
            window: TimeWindow,
            count: u32,
        ) -> Result<Vec<GeoEvent>, PortError> {
            self.requests.lock().unwrap().push(window);
            let mut matching: Vec<i64> = self
                .timestamps
                .iter()
                .copied()
                .filter(|ts| (window.start..=window.stop).contains(ts))
                .collect();
            matching.sort_unstable_by(|a, b| b.cmp(a));
            matching.truncate(count as usize);
            Ok(matching.into_iter().map(event).collect())
        }
    }

    /// Replays canned chunks regardless of the request.
    struct ScriptedPhotos {
        chunks: Mutex<VecDeque<Result<Vec<i64>, PortError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedPhotos {
        fn new(chunks: Vec<Result<Vec<i64>, PortError>>) -> Self {
            Self {
                chunks: Mutex::new(chunks.into()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl PhotosPort for ScriptedPhotos {
        async fn search(
            &self,
            _query: &PhotoQuery,
            _window: TimeWindow,
            _count: u32,
        ) -> Result<Vec<GeoEvent>, PortError> {
            *self.calls.lock().unwrap() += 1;
            let next = self.chunks.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
                .map(|chunk| chunk.into_iter().map(event).collect())
        }
    }

    #[tokio::test]
    async fn walks_back_until_chunk_is_nearly_empty() {
        let port = StorePhotos {
            timestamps: (1_000..1_450).collect(),
            requests: Mutex::new(Vec::new()),
        };
        let walker = WindowWalker::new(200);
        let window = TimeWindow {
            start: 900,
            stop: 2_000,
        };

        let events = walker.collect_window(&port, window, &query()).await.unwrap();

        assert_eq!(events.len(), 450);
        let unique: HashSet<i64> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(unique.len(), 450);
        let stops: Vec<i64> = port.requests.lock().unwrap().iter().map(|w| w.stop).collect();
        assert_eq!(stops, vec![2_000, 1_249, 1_049, 999]);
        assert!(port.requests.lock().unwrap().iter().all(|w| w.start == 900));
    }

    #[tokio::test]
    async fn stops_when_minimum_repeats() {
        let port = ScriptedPhotos::new(vec![
            Ok(vec![500, 400, 300]),
            Ok(vec![299, 250, 200]),
            Ok(vec![260, 200]),
            Ok(vec![150, 100]),
        ]);
        let walker = WindowWalker::default();
        let window = TimeWindow { start: 0, stop: 600 };

        let events = walker.collect_window(&port, window, &query()).await.unwrap();

        assert_eq!(*port.calls.lock().unwrap(), 3);
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn single_item_chunk_ends_window() {
        let port = ScriptedPhotos::new(vec![Ok(vec![500, 400]), Ok(vec![399]), Ok(vec![10, 5])]);
        let walker = WindowWalker::default();
        let window = TimeWindow { start: 0, stop: 600 };

        let events = walker.collect_window(&port, window, &query()).await.unwrap();

        assert_eq!(*port.calls.lock().unwrap(), 2);
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn empty_first_chunk_yields_nothing() {
        let port = ScriptedPhotos::new(vec![Ok(Vec::new())]);
        let walker = WindowWalker::default();
        let window = TimeWindow { start: 0, stop: 600 };

        let events = walker.collect_window(&port, window, &query()).await.unwrap();

        assert!(events.is_empty());
        assert_eq!(*port.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn chunk_reaching_window_start_ends_window() {
        let port = ScriptedPhotos::new(vec![Ok(vec![50, 0]), Ok(vec![40, 30])]);
        let walker = WindowWalker::default();
        let window = TimeWindow { start: 0, stop: 600 };

        let events = walker.collect_window(&port, window, &query()).await.unwrap();

        assert_eq!(*port.calls.lock().unwrap(), 1);
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let port = ScriptedPhotos::new(vec![
            Ok(vec![500, 400]),
            Err(PortError::Malformed("bad".to_owned())),
        ]);
        let walker = WindowWalker::default();
        let window = TimeWindow { start: 0, stop: 600 };

        let result = walker.collect_window(&port, window, &query()).await;

        assert!(matches!(result, Err(PortError::Malformed(_))));
    }
}
