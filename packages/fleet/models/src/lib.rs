#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Domain types for bike-share fleet telemetry and ride records.
//!
//! These types represent the shapes of data as produced by the fleet:
//! ride/search request logs, completed ride records, and per-bike
//! telemetry snapshots. They are read-only inputs to the heatmap
//! aggregation pipeline and are distinct from the API response types in
//! `fleet_map_server_models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new point from the given coordinates.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// The kind of spatial event a record represents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A rider searched for or requested a bike.
    RideRequest,
    /// A ride started (bike picked up).
    Pickup,
    /// A ride ended (bike dropped off).
    Dropoff,
}

/// A single timestamped spatial event from the fleet logs.
///
/// The location is optional: upstream records occasionally arrive
/// without coordinates (GPS loss, redacted logs), and the aggregation
/// pipeline skips those rather than failing the whole query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialEvent {
    /// Where the event occurred, if known.
    pub location: Option<GeoPoint>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Optional event magnitude; defaults to 1 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
}

/// Operational status of a bike.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BikeStatus {
    /// Parked and rentable.
    Available,
    /// Currently on a ride.
    OnRide,
    /// Pulled from service for maintenance.
    Maintenance,
}

/// Latest known telemetry snapshot for one bike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeState {
    /// Fleet-wide bike identifier.
    pub id: String,
    /// Last reported position, if the bike has ever reported one.
    pub location: Option<GeoPoint>,
    /// Battery state of charge, 0-100 percent.
    pub state_of_charge: f64,
    /// Operational status.
    pub status: BikeStatus,
    /// When the bike last reported telemetry.
    pub last_seen: DateTime<Utc>,
}

/// A completed ride record.
///
/// Either endpoint location may be missing on degraded records; the
/// pickup/dropoff event derivation drops the affected endpoint only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    /// Ride identifier.
    pub id: String,
    /// Where the ride started.
    pub start_location: Option<GeoPoint>,
    /// Where the ride ended.
    pub end_location: Option<GeoPoint>,
    /// When the ride started.
    pub started_at: DateTime<Utc>,
    /// When the ride ended.
    pub ended_at: DateTime<Utc>,
}
