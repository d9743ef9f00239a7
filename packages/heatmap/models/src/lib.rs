#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heatmap query and output types.
//!
//! A heatmap is a sparse list of weighted cell-center points plus the
//! metadata describing the query window it was computed for. These
//! types are serialized straight to JSON for the map frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters shared by every heatmap aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapQuery {
    /// Start of the event selection window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the event selection window (inclusive); also the decay
    /// reference time.
    pub end: DateTime<Utc>,
    /// Decay time constant in hours.
    pub tau_hours: f64,
}

/// One weighted cell-center point in a heatmap layer.
///
/// The weight is strictly positive for most layers; the net-inflow
/// accumulator produces negative (deficit) weights internally, but
/// those are filtered before reaching the API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint {
    /// Latitude of the cell center.
    pub lat: f64,
    /// Longitude of the cell center.
    pub lng: f64,
    /// Accumulated (decayed) weight for the cell.
    pub weight: f64,
}

/// Metadata describing how a heatmap layer was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapMeta {
    /// Start of the event selection window.
    pub start: DateTime<Utc>,
    /// End of the event selection window.
    pub end: DateTime<Utc>,
    /// Decay time constant in hours.
    pub tau_hours: f64,
    /// Which layer this is (`"demand-gap"`, `"low-battery"`,
    /// `"net-inflow"`, `"pickups"`).
    pub layer: String,
    /// State-of-charge threshold; only set for the low-battery layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// A computed heatmap layer: sparse weighted points plus query metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    /// Non-trivially weighted cell centers.
    pub points: Vec<WeightedPoint>,
    /// Query window and layer semantics.
    pub meta: HeatmapMeta,
}
