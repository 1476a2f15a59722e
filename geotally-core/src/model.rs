//! Domain data structures for places, geotagged photo events, and query shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier assigned to a place by the places directory.
pub struct PlaceId(pub String);

impl fmt::Display for PlaceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One `[open, close]` pair of a daily schedule, both `"HH:MM"` strings.
pub struct OpenSpan {
    /// Opening time as reported upstream.
    pub open: String,
    /// Closing time as reported upstream.
    pub close: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Weekly opening hours keyed by lowercase day name (`"monday"`, ...).
pub struct WeeklyHours(pub BTreeMap<String, Vec<OpenSpan>>);

impl WeeklyHours {
    /// Spans listed for the given day, if the day is present.
    #[must_use]
    pub fn spans_on(&self, day: Weekday) -> Option<&[OpenSpan]> {
        self.0.get(day_key(day)).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Place returned from the places directory.
pub struct LocationRecord {
    /// Directory identifier.
    pub id: PlaceId,
    /// Street address, when the directory knows one.
    pub address: Option<String>,
    /// Display name.
    pub name: String,
    /// Latitude in degrees; the directory leaves it out for some rows.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Directory category identifiers.
    pub category_ids: Vec<u32>,
    /// Weekly opening hours; `None` when absent or unparseable.
    pub hours: Option<WeeklyHours>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Hour-of-day range `[begin, end]`. `begin < end` is not guaranteed.
pub struct TimeRange {
    /// First hour of the range.
    pub begin: i32,
    /// Last hour of the range.
    pub end: i32,
}

impl TimeRange {
    /// Construct a range without reordering or clamping.
    #[must_use]
    pub fn new(begin: i32, end: i32) -> Self {
        Self { begin, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Rectangular geographic filter. Corner ordering is the caller's concern.
pub struct BoundingBox {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid bounding box {0:?}: expected W,S,E,N")]
/// Returned when a `W,S,E,N` string cannot be parsed.
pub struct BoundingBoxParseError(pub String);

impl FromStr for BoundingBox {
    type Err = BoundingBoxParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || BoundingBoxParseError(raw.to_owned());
        let mut coords = raw.split(',').map(|part| part.trim().parse::<f64>());
        let mut next = || coords.next().and_then(Result::ok).ok_or_else(invalid);
        let bbox = Self {
            west: next()?,
            south: next()?,
            east: next()?,
            north: next()?,
        };
        if coords.next().is_some() {
            return Err(invalid());
        }
        Ok(bbox)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Geotagged photo, reduced to when and where it was taken.
pub struct GeoEvent {
    /// Creation time in epoch seconds.
    pub timestamp: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Day of week in UTC, Sunday = 0.
    pub weekday: u32,
    /// Hour of day in UTC.
    pub hour: u32,
}

impl GeoEvent {
    /// Build an event, deriving day-of-week and hour from the timestamp.
    ///
    /// Returns `None` when the timestamp is outside the representable range.
    #[must_use]
    pub fn new(timestamp: i64, latitude: f64, longitude: f64) -> Option<Self> {
        let at = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
        Some(Self {
            timestamp,
            latitude,
            longitude,
            weekday: at.weekday().num_days_from_sunday(),
            hour: at.hour(),
        })
    }

    /// Timestamp as ISO 8601 with millisecond precision, e.g. `2015-03-02T14:05:00.000Z`.
    #[must_use]
    pub fn iso_timestamp(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Inclusive epoch-second bounds of one backward sweep.
pub struct TimeWindow {
    /// Earliest timestamp (inclusive).
    pub start: i64,
    /// Latest timestamp (inclusive).
    pub stop: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Point and radius the photo search is centred on.
pub struct PhotoQuery {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Search radius in metres; the upstream default applies when absent.
    pub distance: Option<f64>,
}

/// Lowercase English day name used as the hours key.
#[must_use]
pub fn day_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum FeatureKind {
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum CollectionKind {
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum GeometryKind {
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Properties carried on each GeoJSON feature.
pub struct FeatureProperties {
    /// Street address.
    pub address: Option<String>,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// GeoJSON point geometry.
pub struct PointGeometry {
    #[serde(rename = "type")]
    kind: GeometryKind,
    /// `[longitude, latitude]`, each `null` when the directory has none.
    pub coordinates: [Option<f64>; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// GeoJSON feature for one place.
pub struct Feature {
    #[serde(rename = "type")]
    kind: FeatureKind,
    /// Directory identifier.
    pub id: PlaceId,
    /// Address and name.
    pub properties: FeatureProperties,
    /// Point at the place's coordinates.
    pub geometry: PointGeometry,
}

impl From<LocationRecord> for Feature {
    fn from(record: LocationRecord) -> Self {
        Self {
            kind: FeatureKind::Feature,
            id: record.id,
            properties: FeatureProperties {
                address: record.address,
                name: record.name,
            },
            geometry: PointGeometry {
                kind: GeometryKind::Point,
                coordinates: [record.longitude, record.latitude],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// GeoJSON feature collection.
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionKind,
    /// Features in upstream order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Wrap the given features.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionKind::FeatureCollection,
            features,
        }
    }
}
