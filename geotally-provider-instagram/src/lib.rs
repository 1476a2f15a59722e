//! Photo provider backed by the Instagram `/v1/media/search` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use geotally_core::{
    model::{GeoEvent, PhotoQuery, TimeWindow},
    ports::{PhotosPort, PortError},
};

/// Public Instagram API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.instagram.com";

const SEARCH_PATH: &str = "/v1/media/search";

/// Response from /v1/media/search
#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<MediaItem>,
    // "meta" and "pagination" exist, no need to model them
}

/// Single media item; we only need when and where.
#[derive(Debug, Deserialize)]
struct MediaItem {
    created_time: CreatedTime,
    location: Option<MediaLocation>,
}

/// `created_time` is documented as a string of epoch seconds but is not always quoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreatedTime {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct MediaLocation {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<MediaItem> for GeoEvent {
    type Error = PortError;

    fn try_from(item: MediaItem) -> Result<Self, Self::Error> {
        let timestamp = match item.created_time {
            CreatedTime::Number(seconds) => seconds,
            CreatedTime::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_err| PortError::Malformed(format!("created_time {text:?}")))?,
        };
        let location = item
            .location
            .ok_or_else(|| PortError::Malformed(format!("media at {timestamp} has no location")))?;
        GeoEvent::new(timestamp, location.latitude, location.longitude)
            .ok_or_else(|| PortError::Malformed(format!("created_time {timestamp} out of range")))
    }
}

/// Credentials for the media search.
#[derive(Debug, Clone)]
pub struct InstagramCredentials {
    /// Registered client id.
    pub client_id: String,
    /// OAuth access token.
    pub access_token: String,
}

/// Photo port querying Instagram's geographic media search.
pub struct InstagramPhotosPort {
    client: Client,
    base_url: String,
    credentials: InstagramCredentials,
}

impl InstagramPhotosPort {
    /// Create a new photo port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, credentials: InstagramCredentials) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            credentials,
        }
    }
}

#[async_trait]
impl PhotosPort for InstagramPhotosPort {
    async fn search(
        &self,
        query: &PhotoQuery,
        window: TimeWindow,
        count: u32,
    ) -> Result<Vec<GeoEvent>, PortError> {
        let mut req = self
            .client
            .get(format!("{}{SEARCH_PATH}", self.base_url))
            .query(&[("lat", query.lat), ("lng", query.lng)])
            .query(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .query(&[("min_timestamp", window.start), ("max_timestamp", window.stop)])
            .query(&[("count", count)]);

        if let Some(distance) = query.distance {
            req = req.query(&[("distance", distance)]);
        }

        let response = fetch_json::<SearchResponse>(req).await?;
        decode_items(response)
    }
}

/// Build the photo port for Instagram.
#[must_use]
pub fn photos_port(
    client: Client,
    base_url: &str,
    credentials: InstagramCredentials,
) -> Arc<dyn PhotosPort> {
    Arc::new(InstagramPhotosPort::new(client, base_url, credentials))
}

fn decode_items(response: SearchResponse) -> Result<Vec<GeoEvent>, PortError> {
    response.data.into_iter().map(GeoEvent::try_from).collect()
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
