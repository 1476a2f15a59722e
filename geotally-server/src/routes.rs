//! HTTP routes for the mapping client.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Utc, Weekday};
use futures::{StreamExt, TryStreamExt, future, stream};
use geotally_core::{
    BoundingBox, FeatureCollection, GeoEvent, GeoTallyService, PhotoQuery, PortError, TimeRange,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ApiError;

/// First line of every photo CSV.
pub const CSV_HEADER: &str = "lat,lng,ts,day,hour\n";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<GeoTallyService>,
}

impl AppState {
    /// Wrap the service for use by the router.
    #[must_use]
    pub fn new(service: Arc<GeoTallyService>) -> Self {
        Self { service }
    }
}

/// Build the router with all API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/places.geojson", get(places_geojson))
        .route("/api/places/count/retail", get(count_retail))
        .route("/api/photos.csv", get(photos_csv))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Parameters arrive as raw strings so that bad input ends up as a 500 like
// any other failure instead of the extractor's 400.

#[derive(Debug, Deserialize)]
struct PlacesParams {
    bbox: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetailParams {
    bbox: Option<String>,
    day: Option<String>,
    beg: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoParams {
    lat: Option<String>,
    lng: Option<String>,
    distance: Option<String>,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: usize,
}

/// GET /api/places.geojson?bbox=W,S,E,N&category=123
async fn places_geojson(
    State(state): State<AppState>,
    Query(params): Query<PlacesParams>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let bbox: BoundingBox = required(params.bbox.as_deref(), "bbox")?;
    let category: u32 = required(params.category.as_deref(), "category")?;

    let collection = state.service.places_geojson(bbox, category).await?;
    info!(category, features = collection.features.len(), "places_geojson");
    Ok(Json(collection))
}

/// GET /api/places/count/retail?bbox=W,S,E,N&day=monday&beg=12&end=14
async fn count_retail(
    State(state): State<AppState>,
    Query(params): Query<RetailParams>,
) -> Result<Json<CountResponse>, ApiError> {
    let bbox: BoundingBox = required(params.bbox.as_deref(), "bbox")?;
    let day: Weekday = required(params.day.as_deref(), "day")?;
    let range = TimeRange::new(
        required(params.beg.as_deref(), "beg")?,
        required(params.end.as_deref(), "end")?,
    );

    let count = state.service.count_open_retail(bbox, day, range).await?;
    info!(%day, begin = range.begin, end = range.end, count, "count_retail");
    Ok(Json(CountResponse { count }))
}

/// GET /api/photos.csv?lat=37.77&lng=-122.42&distance=1000
///
/// The header is sent right away and rows follow as windows complete. A
/// failing window ends the body early; the status is already 200 by then.
async fn photos_csv(
    State(state): State<AppState>,
    Query(params): Query<PhotoParams>,
) -> Result<Response, ApiError> {
    let query = PhotoQuery {
        lat: required(params.lat.as_deref(), "lat")?,
        lng: required(params.lng.as_deref(), "lng")?,
        distance: optional(params.distance.as_deref(), "distance")?,
    };

    let now = Utc::now().timestamp();
    info!(lat = query.lat, lng = query.lng, now, "photos_csv");

    let rows = state
        .service
        .photo_history(query, now)
        .map_ok(|events| csv_rows(&events))
        .try_filter(|chunk| future::ready(!chunk.is_empty()))
        .inspect_err(|err: &PortError| error!(error = %err, "photo history aborted mid-stream"));
    let body = stream::once(future::ready(Ok(CSV_HEADER.to_owned()))).chain(rows);

    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

/// One CSV line per event, ISO 8601 timestamps.
#[must_use]
pub fn csv_rows(events: &[GeoEvent]) -> String {
    events
        .iter()
        .map(|event| {
            format!(
                "{},{},{},{},{}\n",
                event.latitude,
                event.longitude,
                event.iso_timestamp(),
                event.weekday,
                event.hour
            )
        })
        .collect()
}

fn required<T>(raw: Option<&str>, name: &'static str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(raw, name)?.ok_or_else(|| ApiError::invalid(name, "missing"))
}

fn optional<T>(raw: Option<&str>, name: &'static str) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|err| ApiError::invalid(name, format!("{value:?}: {err}")))
    })
    .transpose()
}
