//! Fan-out of window sweeps over a historical lookback.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};

use crate::model::{GeoEvent, PhotoQuery, TimeWindow};
use crate::ports::{PhotosPort, PortError};
use crate::window::WindowWalker;

/// Length of one window unless configured otherwise: six hours.
pub const DEFAULT_WINDOW_SECS: i64 = 6 * 60 * 60;

/// Total lookback unless configured otherwise: 112 windows, four weeks.
pub const DEFAULT_LOOKBACK_SECS: i64 = 112 * DEFAULT_WINDOW_SECS;

/// Windows swept at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Splits a lookback into windows and sweeps them with bounded concurrency.
pub struct WindowScheduler {
    walker: WindowWalker,
    lookback_secs: i64,
    window_secs: i64,
    concurrency: usize,
}

impl Default for WindowScheduler {
    fn default() -> Self {
        Self::new(
            WindowWalker::default(),
            DEFAULT_LOOKBACK_SECS,
            DEFAULT_WINDOW_SECS,
            DEFAULT_CONCURRENCY,
        )
    }
}

impl WindowScheduler {
    /// Create a scheduler. Window size and concurrency are clamped to at least one.
    #[must_use]
    pub fn new(
        walker: WindowWalker,
        lookback_secs: i64,
        window_secs: i64,
        concurrency: usize,
    ) -> Self {
        Self {
            walker,
            lookback_secs: lookback_secs.max(0),
            window_secs: window_secs.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Contiguous windows ending at `now`, newest first.
    ///
    /// Window `i` covers `[now - (i + 1) * size + 1, now - i * size]`. A
    /// lookback that is not a multiple of the window size gets one extra window.
    #[must_use]
    pub fn plan(&self, now: i64) -> Vec<TimeWindow> {
        let size = self.window_secs;
        let count = self.lookback_secs.div_euclid(size)
            + i64::from(self.lookback_secs.rem_euclid(size) != 0);
        (0..count)
            .map(|index| {
                let stop = now - index * size;
                TimeWindow {
                    start: stop - size + 1,
                    stop,
                }
            })
            .collect()
    }

    /// Sweep every window ending at `now`, yielding each window's events as it completes.
    ///
    /// Windows finish in arbitrary order. The stream yields an error for the
    /// first failed window; consumers are expected to stop there.
    #[must_use]
    pub fn collect_history(
        &self,
        port: Arc<dyn PhotosPort>,
        query: PhotoQuery,
        now: i64,
    ) -> BoxStream<'static, Result<Vec<GeoEvent>, PortError>> {
        let walker = self.walker;
        stream::iter(self.plan(now))
            .map(move |window| {
                let port = Arc::clone(&port);
                async move { walker.collect_window(port.as_ref(), window, &query).await }
            })
            .buffer_unordered(self.concurrency)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    const HOUR: i64 = 60 * 60;

    fn query() -> PhotoQuery {
        PhotoQuery {
            lat: 37.0,
            lng: -122.0,
            distance: None,
        }
    }

    /// Returns one event at the window's stop, tracking calls in flight.
    #[derive(Default)]
    struct GaugedPhotos {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        fail_on_stop: Option<i64>,
    }

    #[async_trait]
    impl PhotosPort for GaugedPhotos {
        async fn search(
            &self,
            _query: &PhotoQuery,
            window: TimeWindow,
            _count: u32,
        ) -> Result<Vec<GeoEvent>, PortError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_on_stop == Some(window.stop) {
                return Err(PortError::Internal("window failed".to_owned()));
            }
            Ok(GeoEvent::new(window.stop, 0.0, 0.0).into_iter().collect())
        }
    }

    #[test]
    fn plans_four_windows_for_a_day_of_six_hour_buckets() {
        let scheduler = WindowScheduler::new(WindowWalker::default(), 24 * HOUR, 6 * HOUR, 2);
        let now = 1_000_000;

        let windows = scheduler.plan(now);

        assert_eq!(windows.len(), 4);
        assert_eq!(windows.first().map(|w| w.stop), Some(now));
        for pair in windows.windows(2) {
            let [newer, older] = pair else { unreachable!() };
            assert_eq!(older.stop + 1, newer.start);
            assert_eq!(newer.stop - newer.start + 1, 6 * HOUR);
        }
        assert_eq!(windows.last().map(|w| w.start), Some(now - 24 * HOUR + 1));
    }

    #[test]
    fn default_plan_covers_four_weeks() {
        assert_eq!(WindowScheduler::default().plan(0).len(), 112);
    }

    #[test]
    fn partial_lookback_gets_an_extra_window() {
        let scheduler = WindowScheduler::new(WindowWalker::default(), 7 * HOUR, 6 * HOUR, 1);
        assert_eq!(scheduler.plan(0).len(), 2);
        let empty = WindowScheduler::new(WindowWalker::default(), 0, 6 * HOUR, 1);
        assert!(empty.plan(0).is_empty());
    }

    #[tokio::test]
    async fn caps_windows_in_flight() {
        let port = Arc::new(GaugedPhotos::default());
        let scheduler = WindowScheduler::new(WindowWalker::default(), 24 * HOUR, 6 * HOUR, 2);
        let now = 1_000_000;

        let batches: Vec<_> = scheduler
            .collect_history(Arc::clone(&port) as Arc<dyn PhotosPort>, query(), now)
            .collect()
            .await;

        assert_eq!(port.calls.load(Ordering::SeqCst), 4);
        assert!(port.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(port.peak.load(Ordering::SeqCst), 2);
        let stops: HashSet<i64> = batches
            .into_iter()
            .flat_map(Result::unwrap)
            .map(|event| event.timestamp)
            .collect();
        let expected: HashSet<i64> = scheduler.plan(now).into_iter().map(|w| w.stop).collect();
        assert_eq!(stops, expected);
    }

    #[tokio::test]
    async fn failed_window_surfaces_as_error() {
        let now = 1_000_000;
        let port = Arc::new(GaugedPhotos {
            fail_on_stop: Some(now - 6 * HOUR),
            ..GaugedPhotos::default()
        });
        let scheduler = WindowScheduler::new(WindowWalker::default(), 24 * HOUR, 6 * HOUR, 1);

        let results: Vec<_> = scheduler
            .collect_history(port, query(), now)
            .collect()
            .await;

        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }
}
