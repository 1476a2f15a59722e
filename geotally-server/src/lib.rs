//! HTTP front-end for geotally: places GeoJSON, open-retail counts, and photo
//! history CSV over the core pipeline.

/// Command line and environment configuration.
pub mod config;
/// Request failures and their HTTP mapping.
pub mod error;
/// Route handlers and router construction.
pub mod routes;
/// Log subscriber setup.
pub mod telemetry;

pub use routes::{AppState, router};
