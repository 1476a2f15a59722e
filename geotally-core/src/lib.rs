//! Core types and pipeline for the geotally places and photo aggregator.

/// Opening-hours filter for place records.
pub mod hours;
/// Domain models shared by the providers and the HTTP layer.
pub mod model;
/// Exhaustive walk over the offset-paginated places directory.
pub mod paging;
/// Traits describing the upstream interfaces.
pub mod ports;
/// Bounded fan-out of photo windows over a lookback.
pub mod schedule;
/// High-level service facade used by clients.
pub mod service;
/// Backward sweep of a single photo window.
pub mod window;

pub use model::*;
pub use ports::*;
pub use service::*;
