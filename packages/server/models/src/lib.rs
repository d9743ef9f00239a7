#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! API request and response types for the fleet map server.
//!
//! These types are serialized to JSON for the REST API. They are
//! separate from the heatmap core types to allow independent evolution
//! of the API contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server considers itself healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Query parameters accepted by every heatmap endpoint.
///
/// All parameters are optional and independently overridable; the
/// server fills in the defaults (`end` = now, `start` = `end` - 24h,
/// `tauHours` = 24). Unparseable timestamps are rejected during query
/// deserialization, before any aggregation runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapQueryParams {
    /// Start of the event selection window (RFC 3339).
    pub start: Option<DateTime<Utc>>,
    /// End of the event selection window (RFC 3339).
    pub end: Option<DateTime<Utc>>,
    /// Decay time constant in hours.
    pub tau_hours: Option<f64>,
    /// State-of-charge threshold; only honored by the low-battery
    /// endpoint.
    pub threshold: Option<f64>,
}
