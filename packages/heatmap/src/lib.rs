#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid-binned, time-decayed demand/supply heatmap aggregation.
//!
//! Each aggregation is a single-pass, request-scoped computation: fetch
//! a bounded window of fleet events from a [`fleet_map_store::FleetStore`],
//! bin them into fixed-size grid cells, accumulate exponentially decayed
//! weights per cell, and project to a sparse weighted point list. Four
//! layers share the pipeline: demand-gap, low-battery, net-inflow, and
//! pickups.

pub mod aggregate;
pub mod decay;
pub mod grid;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while computing a heatmap layer.
#[derive(Debug, Error)]
pub enum HeatmapError {
    /// The query window is inverted. The bounds are never swapped or
    /// clamped on the caller's behalf.
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange {
        /// Requested window start.
        start: DateTime<Utc>,
        /// Requested window end.
        end: DateTime<Utc>,
    },

    /// Fetching fleet data failed. No partial results are produced.
    #[error("Store error: {0}")]
    Store(#[from] fleet_map_store::StoreError),
}
