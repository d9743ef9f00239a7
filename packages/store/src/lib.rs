#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fleet data access contract and snapshot-backed store.
//!
//! [`FleetStore`] is the seam between the heatmap aggregation pipeline
//! and whatever actually holds the fleet data. The pipeline only ever
//! asks for finite in-memory batches scoped to a time window; storage,
//! indexing, and query performance are this side's problem.
//!
//! [`InMemoryFleetStore`] is the bundled implementation: it serves a
//! point-in-time snapshot (loadable from a JSON file) and derives
//! pickup/dropoff events from completed ride records on demand. It
//! backs the server binary and the aggregation tests.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_map_fleet_models::{BikeState, BikeStatus, EventKind, Ride, SpatialEvent};
use thiserror::Error;

/// Errors that can occur during fleet data access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading a snapshot file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be parsed.
    #[error("Snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backing service reported a failure.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of what went wrong.
        message: String,
    },
}

/// Read-only query contract over the fleet's event logs and bike state.
///
/// All window bounds are inclusive on both ends.
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Returns events of `kind` with `timestamp` within `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing service fails.
    async fn events(
        &self,
        kind: EventKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SpatialEvent>, StoreError>;

    /// Returns bikes currently available for rental.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing service fails.
    async fn available_bikes(&self) -> Result<Vec<BikeState>, StoreError>;

    /// Returns bikes with `state_of_charge <= max_charge` that reported
    /// telemetry within `[start, end]` and are not in maintenance.
    ///
    /// This is a coarse fetch-time filter; callers compute exact charge
    /// deficits themselves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing service fails.
    async fn low_charge_bikes(
        &self,
        max_charge: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BikeState>, StoreError>;
}

/// A point-in-time snapshot of fleet data.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    /// Ride/search request log entries.
    #[serde(default)]
    pub requests: Vec<SpatialEvent>,
    /// Completed ride records.
    #[serde(default)]
    pub rides: Vec<Ride>,
    /// Latest per-bike telemetry.
    #[serde(default)]
    pub bikes: Vec<BikeState>,
}

/// [`FleetStore`] backed by an in-memory [`FleetSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryFleetStore {
    snapshot: FleetSnapshot,
}

impl InMemoryFleetStore {
    /// Creates a store over the given snapshot.
    #[must_use]
    pub const fn new(snapshot: FleetSnapshot) -> Self {
        Self { snapshot }
    }

    /// Loads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: FleetSnapshot = serde_json::from_str(&contents)?;
        log::info!(
            "Loaded fleet snapshot from {}: {} requests, {} rides, {} bikes",
            path.display(),
            snapshot.requests.len(),
            snapshot.rides.len(),
            snapshot.bikes.len()
        );
        Ok(Self::new(snapshot))
    }
}

/// The pickup event for a ride, if its start location is known.
fn pickup_event(ride: &Ride) -> Option<SpatialEvent> {
    ride.start_location.map(|location| SpatialEvent {
        location: Some(location),
        timestamp: ride.started_at,
        magnitude: None,
    })
}

/// The dropoff event for a ride, if its end location is known.
fn dropoff_event(ride: &Ride) -> Option<SpatialEvent> {
    ride.end_location.map(|location| SpatialEvent {
        location: Some(location),
        timestamp: ride.ended_at,
        magnitude: None,
    })
}

fn in_window(timestamp: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    timestamp >= start && timestamp <= end
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn events(
        &self,
        kind: EventKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SpatialEvent>, StoreError> {
        let events = match kind {
            EventKind::RideRequest => self
                .snapshot
                .requests
                .iter()
                .filter(|event| in_window(event.timestamp, start, end))
                .copied()
                .collect(),
            EventKind::Pickup => self
                .snapshot
                .rides
                .iter()
                .filter_map(pickup_event)
                .filter(|event| in_window(event.timestamp, start, end))
                .collect(),
            EventKind::Dropoff => self
                .snapshot
                .rides
                .iter()
                .filter_map(dropoff_event)
                .filter(|event| in_window(event.timestamp, start, end))
                .collect(),
        };
        Ok(events)
    }

    async fn available_bikes(&self) -> Result<Vec<BikeState>, StoreError> {
        Ok(self
            .snapshot
            .bikes
            .iter()
            .filter(|bike| bike.status == BikeStatus::Available)
            .cloned()
            .collect())
    }

    async fn low_charge_bikes(
        &self,
        max_charge: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BikeState>, StoreError> {
        Ok(self
            .snapshot
            .bikes
            .iter()
            .filter(|bike| {
                bike.state_of_charge <= max_charge
                    && bike.status != BikeStatus::Maintenance
                    && in_window(bike.last_seen, start, end)
            })
            .cloned()
            .collect())
    }
}
