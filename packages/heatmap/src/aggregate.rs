//! The four heatmap aggregation layers.
//!
//! Every layer follows the same shape: fetch events of a kind within
//! the query window, compute a cell id and a weight decayed relative to
//! the window end for each one, accumulate per cell, then project the
//! accumulator to a point list through a layer-specific filter. The
//! epsilon filters prune near-zero floating-point noise before the
//! points go over the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleet_map_fleet_models::{EventKind, GeoPoint, SpatialEvent};
use fleet_map_heatmap_models::{Heatmap, HeatmapMeta, HeatmapQuery, WeightedPoint};
use fleet_map_store::FleetStore;

use crate::{HeatmapError, decay, grid};

/// Minimum demand surplus for a cell to appear in the demand-gap layer.
pub const GAP_EPSILON: f64 = 0.05;

/// Minimum absolute net flow for a cell to survive noise pruning in the
/// net-inflow layer.
pub const NET_FLOW_EPSILON: f64 = 0.01;

/// Default state-of-charge threshold (percent) for the low-battery
/// layer.
pub const DEFAULT_CHARGE_THRESHOLD: f64 = 25.0;

/// Extra state-of-charge headroom added to the threshold when fetching
/// candidate bikes. The fetch filter is deliberately coarse; the exact
/// deficit is computed per bike afterwards.
pub const LOW_CHARGE_FETCH_CUSHION: f64 = 30.0;

/// Per-request running weight sums, keyed by cell id.
type Accumulator = BTreeMap<String, f64>;

fn validate(query: &HeatmapQuery) -> Result<(), HeatmapError> {
    if query.start > query.end {
        return Err(HeatmapError::InvalidTimeRange {
            start: query.start,
            end: query.end,
        });
    }
    Ok(())
}

/// Adds `weight` to the cell containing `location`. Records without a
/// location are skipped; they never abort the aggregation.
fn accumulate(acc: &mut Accumulator, location: Option<GeoPoint>, weight: f64) {
    let Some(point) = location else {
        log::debug!("Skipping record without coordinates");
        return;
    };
    *acc.entry(grid::cell_id(point.lat, point.lng, grid::DEFAULT_CELL_SIZE_DEG))
        .or_insert(0.0) += weight;
}

/// Accumulates a batch of events, each decayed relative to `reference`
/// and signed by `sign`. An event's magnitude (default 1) is the decay
/// base.
fn accumulate_events(
    acc: &mut Accumulator,
    events: &[SpatialEvent],
    reference: DateTime<Utc>,
    tau_hours: f64,
    sign: f64,
) {
    for event in events {
        let base = event.magnitude.unwrap_or(1.0);
        let weight = decay::decayed_weight(event.timestamp, reference, tau_hours, base);
        accumulate(acc, event.location, sign * weight);
    }
}

/// Projects the accumulator to cell-center points, keeping only weights
/// accepted by `keep`.
fn project(acc: Accumulator, keep: impl Fn(f64) -> bool) -> Vec<WeightedPoint> {
    acc.into_iter()
        .filter(|&(_, weight)| keep(weight))
        .filter_map(|(id, weight)| {
            grid::cell_center(&id, grid::DEFAULT_CELL_SIZE_DEG)
                .map(|(lat, lng)| WeightedPoint { lat, lng, weight })
        })
        .collect()
}

fn meta(query: &HeatmapQuery, layer: &str, threshold: Option<f64>) -> HeatmapMeta {
    HeatmapMeta {
        start: query.start,
        end: query.end,
        tau_hours: query.tau_hours,
        layer: layer.to_string(),
        threshold,
    }
}

/// Cells where decayed ride-request demand exceeds current bike supply.
///
/// Requests contribute their decayed magnitude; each available bike
/// subtracts an undecayed unit from its cell. Only cells with a gap
/// above [`GAP_EPSILON`] are returned.
///
/// # Errors
///
/// Returns [`HeatmapError::InvalidTimeRange`] if the window is inverted
/// and [`HeatmapError::Store`] if fetching fleet data fails.
pub async fn demand_gap(
    store: &dyn FleetStore,
    query: &HeatmapQuery,
) -> Result<Heatmap, HeatmapError> {
    validate(query)?;

    let mut acc = Accumulator::new();

    let requests = store
        .events(EventKind::RideRequest, query.start, query.end)
        .await?;
    accumulate_events(&mut acc, &requests, query.end, query.tau_hours, 1.0);

    let bikes = store.available_bikes().await?;
    for bike in &bikes {
        accumulate(&mut acc, bike.location, -1.0);
    }

    let points = project(acc, |weight| weight > GAP_EPSILON);
    Ok(Heatmap {
        points,
        meta: meta(query, "demand-gap", None),
    })
}

/// Cells holding bikes whose charge sits below `threshold`, weighted by
/// the summed per-bike deficit `threshold - state_of_charge`.
///
/// Candidates are fetched with [`LOW_CHARGE_FETCH_CUSHION`] of headroom
/// above the threshold, then the exact deficit is computed here; bikes
/// at or above the threshold contribute nothing. No time decay is
/// applied, the deficit is a present-state quantity.
///
/// # Errors
///
/// Returns [`HeatmapError::InvalidTimeRange`] if the window is inverted
/// and [`HeatmapError::Store`] if fetching fleet data fails.
pub async fn low_battery(
    store: &dyn FleetStore,
    query: &HeatmapQuery,
    threshold: f64,
) -> Result<Heatmap, HeatmapError> {
    validate(query)?;

    let bikes = store
        .low_charge_bikes(threshold + LOW_CHARGE_FETCH_CUSHION, query.start, query.end)
        .await?;

    let mut acc = Accumulator::new();
    for bike in &bikes {
        let deficit = (threshold - bike.state_of_charge).max(0.0);
        accumulate(&mut acc, bike.location, deficit);
    }

    let points = project(acc, |weight| weight > 0.0);
    Ok(Heatmap {
        points,
        meta: meta(query, "low-battery", Some(threshold)),
    })
}

/// Cells accumulating bikes: decayed dropoffs minus decayed pickups.
///
/// Cells below [`NET_FLOW_EPSILON`] in magnitude are pruned as noise.
/// The pickup-heavy (negative) cells are computed but not exposed; the
/// layer reports accumulation surplus only.
///
/// # Errors
///
/// Returns [`HeatmapError::InvalidTimeRange`] if the window is inverted
/// and [`HeatmapError::Store`] if fetching fleet data fails.
pub async fn net_inflow(
    store: &dyn FleetStore,
    query: &HeatmapQuery,
) -> Result<Heatmap, HeatmapError> {
    validate(query)?;

    let mut acc = Accumulator::new();

    let dropoffs = store
        .events(EventKind::Dropoff, query.start, query.end)
        .await?;
    accumulate_events(&mut acc, &dropoffs, query.end, query.tau_hours, 1.0);

    let pickups = store
        .events(EventKind::Pickup, query.start, query.end)
        .await?;
    accumulate_events(&mut acc, &pickups, query.end, query.tau_hours, -1.0);

    let mut points = project(acc, |weight| weight.abs() > NET_FLOW_EPSILON);
    points.retain(|point| point.weight > 0.0);

    Ok(Heatmap {
        points,
        meta: meta(query, "net-inflow", None),
    })
}

/// Cells where rides started, weighted by decayed pickup counts.
///
/// # Errors
///
/// Returns [`HeatmapError::InvalidTimeRange`] if the window is inverted
/// and [`HeatmapError::Store`] if fetching fleet data fails.
pub async fn pickups(
    store: &dyn FleetStore,
    query: &HeatmapQuery,
) -> Result<Heatmap, HeatmapError> {
    validate(query)?;

    let mut acc = Accumulator::new();

    let events = store
        .events(EventKind::Pickup, query.start, query.end)
        .await?;
    accumulate_events(&mut acc, &events, query.end, query.tau_hours, 1.0);

    let points = project(acc, |weight| weight > 0.0);
    Ok(Heatmap {
        points,
        meta: meta(query, "pickups", None),
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone as _};
    use fleet_map_fleet_models::{BikeState, BikeStatus, Ride};
    use fleet_map_store::{FleetSnapshot, InMemoryFleetStore, StoreError};

    use super::*;

    /// Store whose every query fails, for exercising error propagation.
    struct UnreachableStore;

    impl UnreachableStore {
        fn error() -> StoreError {
            StoreError::Backend {
                message: "telemetry service unavailable".to_string(),
            }
        }
    }

    #[async_trait]
    impl FleetStore for UnreachableStore {
        async fn events(
            &self,
            _kind: EventKind,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<SpatialEvent>, StoreError> {
            Err(Self::error())
        }

        async fn available_bikes(&self) -> Result<Vec<BikeState>, StoreError> {
            Err(Self::error())
        }

        async fn low_charge_bikes(
            &self,
            _max_charge: f64,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<BikeState>, StoreError> {
            Err(Self::error())
        }
    }

    fn window_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn query() -> HeatmapQuery {
        HeatmapQuery {
            start: window_end() - Duration::hours(24),
            end: window_end(),
            tau_hours: 24.0,
        }
    }

    fn request(lat: f64, lng: f64, magnitude: Option<f64>) -> SpatialEvent {
        SpatialEvent {
            location: Some(GeoPoint::new(lat, lng)),
            timestamp: window_end(),
            magnitude,
        }
    }

    fn bike(id: &str, lat: f64, lng: f64, soc: f64) -> BikeState {
        BikeState {
            id: id.to_string(),
            location: Some(GeoPoint::new(lat, lng)),
            state_of_charge: soc,
            status: BikeStatus::Available,
            last_seen: window_end(),
        }
    }

    fn ride(start: Option<GeoPoint>, end: Option<GeoPoint>, at: DateTime<Utc>) -> Ride {
        Ride {
            id: "r".to_string(),
            start_location: start,
            end_location: end,
            started_at: at,
            ended_at: at,
        }
    }

    #[tokio::test]
    async fn demand_gap_keeps_cells_above_epsilon() {
        let store = InMemoryFleetStore::new(FleetSnapshot {
            requests: vec![
                request(41.8781, -87.6298, Some(0.9)),
                request(40.7128, -74.0060, Some(0.03)),
            ],
            ..FleetSnapshot::default()
        });

        let heatmap = demand_gap(&store, &query()).await.unwrap();
        assert_eq!(heatmap.points.len(), 1);
        assert!((heatmap.points[0].weight - 0.9).abs() < 1e-9);
        assert_eq!(heatmap.meta.layer, "demand-gap");
    }

    #[tokio::test]
    async fn demand_gap_subtracts_undecayed_supply() {
        let store = InMemoryFleetStore::new(FleetSnapshot {
            requests: vec![
                request(41.8781, -87.6298, Some(3.0)),
                request(40.7128, -74.0060, Some(1.0)),
            ],
            bikes: vec![
                bike("b-1", 41.8781, -87.6298, 80.0),
                bike("b-2", 40.7128, -74.0060, 80.0),
            ],
            ..FleetSnapshot::default()
        });

        let heatmap = demand_gap(&store, &query()).await.unwrap();
        // 3 - 1 = 2 survives; 1 - 1 = 0 does not clear the epsilon.
        assert_eq!(heatmap.points.len(), 1);
        assert!((heatmap.points[0].weight - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn demand_gap_excludes_supply_only_cells() {
        let store = InMemoryFleetStore::new(FleetSnapshot {
            bikes: vec![bike("b-1", 41.8781, -87.6298, 80.0)],
            ..FleetSnapshot::default()
        });

        let heatmap = demand_gap(&store, &query()).await.unwrap();
        assert!(heatmap.points.is_empty());
    }

    #[tokio::test]
    async fn low_battery_weights_by_charge_deficit() {
        let store = InMemoryFleetStore::new(FleetSnapshot {
            bikes: vec![
                bike("b-1", 41.8781, -87.6298, 10.0),
                bike("b-2", 40.7128, -74.0060, 30.0),
            ],
            ..FleetSnapshot::default()
        });

        let heatmap = low_battery(&store, &query(), 25.0).await.unwrap();
        // soc 10 => deficit 15; soc 30 is above threshold and excluded.
        assert_eq!(heatmap.points.len(), 1);
        assert!((heatmap.points[0].weight - 15.0).abs() < 1e-9);
        assert_eq!(heatmap.meta.threshold, Some(25.0));
    }

    #[tokio::test]
    async fn low_battery_sums_deficits_per_cell() {
        let store = InMemoryFleetStore::new(FleetSnapshot {
            bikes: vec![
                bike("b-1", 41.8781, -87.6298, 10.0),
                bike("b-2", 41.8782, -87.6299, 20.0),
            ],
            ..FleetSnapshot::default()
        });

        let heatmap = low_battery(&store, &query(), 25.0).await.unwrap();
        assert_eq!(heatmap.points.len(), 1);
        assert!((heatmap.points[0].weight - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn net_inflow_reports_dropoff_surplus_only() {
        let dropoff_cell = GeoPoint::new(41.8781, -87.6298);
        let pickup_cell = GeoPoint::new(40.7128, -74.0060);
        let store = InMemoryFleetStore::new(FleetSnapshot {
            rides: vec![ride(Some(pickup_cell), Some(dropoff_cell), window_end())],
            ..FleetSnapshot::default()
        });

        let heatmap = net_inflow(&store, &query()).await.unwrap();
        // The pickup cell accumulates -1 but negative cells are dropped.
        assert_eq!(heatmap.points.len(), 1);
        assert!((heatmap.points[0].lat - (41.8775 + 0.00125)).abs() < 1e-9);
        assert!((heatmap.points[0].weight - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn net_inflow_cancels_within_one_cell() {
        let here = GeoPoint::new(41.8781, -87.6298);
        let store = InMemoryFleetStore::new(FleetSnapshot {
            rides: vec![ride(Some(here), Some(here), window_end())],
            ..FleetSnapshot::default()
        });

        let heatmap = net_inflow(&store, &query()).await.unwrap();
        assert!(heatmap.points.is_empty());
    }

    #[tokio::test]
    async fn pickups_sum_decayed_weights_linearly() {
        let here = GeoPoint::new(41.8781, -87.6298);
        let first = window_end() - Duration::hours(2);
        let second = window_end() - Duration::hours(7);
        let store = InMemoryFleetStore::new(FleetSnapshot {
            rides: vec![
                ride(Some(here), None, first),
                ride(Some(here), None, second),
            ],
            ..FleetSnapshot::default()
        });

        let heatmap = pickups(&store, &query()).await.unwrap();
        let expected = decay::decayed_weight(first, window_end(), 24.0, 1.0)
            + decay::decayed_weight(second, window_end(), 24.0, 1.0);
        assert_eq!(heatmap.points.len(), 1);
        assert!((heatmap.points[0].weight - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn records_without_coordinates_are_skipped() {
        let mut no_location = request(0.0, 0.0, None);
        no_location.location = None;
        let store = InMemoryFleetStore::new(FleetSnapshot {
            requests: vec![no_location, request(41.8781, -87.6298, None)],
            ..FleetSnapshot::default()
        });

        let heatmap = demand_gap(&store, &query()).await.unwrap();
        assert_eq!(heatmap.points.len(), 1);
    }

    #[tokio::test]
    async fn empty_windows_yield_empty_point_lists() {
        let store = InMemoryFleetStore::new(FleetSnapshot::default());
        let q = query();

        assert!(demand_gap(&store, &q).await.unwrap().points.is_empty());
        assert!(
            low_battery(&store, &q, DEFAULT_CHARGE_THRESHOLD)
                .await
                .unwrap()
                .points
                .is_empty()
        );
        assert!(net_inflow(&store, &q).await.unwrap().points.is_empty());
        assert!(pickups(&store, &q).await.unwrap().points.is_empty());
    }

    #[tokio::test]
    async fn inverted_windows_are_rejected_not_swapped() {
        let store = InMemoryFleetStore::new(FleetSnapshot::default());
        let inverted = HeatmapQuery {
            start: window_end(),
            end: window_end() - Duration::hours(1),
            tau_hours: 24.0,
        };

        let result = pickups(&store, &inverted).await;
        assert!(matches!(
            result,
            Err(HeatmapError::InvalidTimeRange { .. })
        ));
    }

    #[tokio::test]
    async fn store_failures_propagate_with_no_partial_result() {
        let q = query();

        for result in [
            demand_gap(&UnreachableStore, &q).await,
            low_battery(&UnreachableStore, &q, DEFAULT_CHARGE_THRESHOLD).await,
            net_inflow(&UnreachableStore, &q).await,
            pickups(&UnreachableStore, &q).await,
        ] {
            assert!(matches!(result, Err(HeatmapError::Store(_))));
        }
    }

    #[tokio::test]
    async fn meta_echoes_the_query_window() {
        let store = InMemoryFleetStore::new(FleetSnapshot::default());
        let q = query();

        let heatmap = pickups(&store, &q).await.unwrap();
        assert_eq!(heatmap.meta.start, q.start);
        assert_eq!(heatmap.meta.end, q.end);
        assert!((heatmap.meta.tau_hours - 24.0).abs() < f64::EPSILON);
        assert_eq!(heatmap.meta.layer, "pickups");
        assert_eq!(heatmap.meta.threshold, None);
    }
}
