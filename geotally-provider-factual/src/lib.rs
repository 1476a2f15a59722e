//! Places provider backed by the Factual `places-us` table.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use geotally_core::{
    model::{LocationRecord, OpenSpan, PlaceId, WeeklyHours},
    ports::{GeoFilter, Page, PageRequest, PlaceQuery, PlacesPort, PortError},
};

/// Public Factual API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.v3.factual.com";

const TABLE_PATH: &str = "/t/places-us";

/// Envelope around every Factual read response.
#[derive(Debug, Deserialize)]
struct Envelope {
    response: PageBody,
}

/// Body of a `/t/{table}` read.
#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    data: Vec<PlaceRow>,
    #[serde(default)]
    included_rows: u64,
    // only present when include_count=true
    #[serde(default)]
    total_row_count: u64,
}

/// Single row of `places-us`; many more columns exist, we ignore them.
#[derive(Debug, Deserialize)]
struct PlaceRow {
    factual_id: String,
    #[serde(default)]
    name: String,
    address: Option<String>,
    // null or missing on some rows
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    category_ids: Vec<u32>,
    hours: Option<Value>,
}

impl From<PlaceRow> for LocationRecord {
    fn from(row: PlaceRow) -> Self {
        Self {
            id: PlaceId(row.factual_id),
            address: row.address,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            category_ids: row.category_ids,
            hours: row.hours.and_then(decode_hours),
        }
    }
}

/// Places port talking to Factual with a read key.
pub struct FactualPlacesPort {
    client: Client,
    base_url: String,
    key: String,
}

impl FactualPlacesPort {
    /// Create a new places port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl PlacesPort for FactualPlacesPort {
    async fn page(&self, query: &PlaceQuery, page: PageRequest) -> Result<Page, PortError> {
        let params = query_params(query, page);
        let req = self
            .client
            .get(format!("{}{TABLE_PATH}", self.base_url))
            .query(&params)
            .query(&[("KEY", self.key.as_str())]);

        let body = fetch_json::<Envelope>(req).await?.response;

        Ok(Page {
            data: body.data.into_iter().map(LocationRecord::from).collect(),
            included_rows: body.included_rows,
            total_row_count: body.total_row_count,
        })
    }
}

/// Build the places port for the Factual directory.
#[must_use]
pub fn places_port(client: Client, base_url: &str, key: &str) -> Arc<dyn PlacesPort> {
    Arc::new(FactualPlacesPort::new(client, base_url, key))
}

/// Encode a query and page as Factual read parameters.
fn query_params(query: &PlaceQuery, page: PageRequest) -> Vec<(&'static str, String)> {
    vec![
        ("geo", geo_param(&query.geo).to_string()),
        (
            "filters",
            json!({ "category_ids": { "$includes": query.category } }).to_string(),
        ),
        ("offset", page.offset.to_string()),
        ("limit", page.limit.to_string()),
        ("include_count", page.include_count.to_string()),
    ]
}

fn geo_param(geo: &GeoFilter) -> Value {
    match *geo {
        GeoFilter::Rect(bbox) => json!({
            "$rect": [[bbox.north, bbox.west], [bbox.south, bbox.east]]
        }),
        // corner order as the retail count has always sent it
        GeoFilter::Within(bbox) => json!({
            "$within": { "$rect": [[bbox.north, bbox.east], [bbox.south, bbox.west]] }
        }),
    }
}

/// Decode the `hours` column, which is either an object or a JSON string of one.
///
/// Anything unexpected yields `None`, which the hours filter treats as closed.
fn decode_hours(raw: Value) -> Option<WeeklyHours> {
    let value = match raw {
        Value::String(text) => serde_json::from_str(&text).ok()?,
        other => other,
    };
    let days = serde_json::from_value::<BTreeMap<String, Vec<(String, String)>>>(value).ok()?;
    Some(WeeklyHours(
        days.into_iter()
            .map(|(day, spans)| {
                let spans = spans
                    .into_iter()
                    .map(|(open, close)| OpenSpan { open, close })
                    .collect();
                (day.to_lowercase(), spans)
            })
            .collect(),
    ))
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(PortError::from)
}
