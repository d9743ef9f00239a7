//! HTTP handler functions for the fleet map API.

use actix_web::{HttpResponse, web};
use chrono::{Duration, Utc};
use fleet_map_heatmap::{HeatmapError, aggregate};
use fleet_map_heatmap_models::{Heatmap, HeatmapQuery};
use fleet_map_server_models::{ApiHealth, HeatmapQueryParams};

use crate::AppState;

/// Default event selection window, in hours.
const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Default decay time constant, in hours.
const DEFAULT_TAU_HOURS: f64 = 24.0;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/heatmap/demand-gap`
///
/// Cells where decayed ride-request demand exceeds available bike
/// supply.
pub async fn demand_gap(
    state: web::Data<AppState>,
    params: web::Query<HeatmapQueryParams>,
) -> HttpResponse {
    let query = parse_time_range(&params);
    to_response(aggregate::demand_gap(state.store.as_ref(), &query).await)
}

/// `GET /api/heatmap/low-battery`
///
/// Cells holding bikes below the state-of-charge threshold, weighted
/// by summed charge deficit.
pub async fn low_battery(
    state: web::Data<AppState>,
    params: web::Query<HeatmapQueryParams>,
) -> HttpResponse {
    let query = parse_time_range(&params);
    let threshold = params
        .threshold
        .unwrap_or(aggregate::DEFAULT_CHARGE_THRESHOLD);
    to_response(aggregate::low_battery(state.store.as_ref(), &query, threshold).await)
}

/// `GET /api/heatmap/net-inflow`
///
/// Cells accumulating bikes (dropoff surplus over pickups).
pub async fn net_inflow(
    state: web::Data<AppState>,
    params: web::Query<HeatmapQueryParams>,
) -> HttpResponse {
    let query = parse_time_range(&params);
    to_response(aggregate::net_inflow(state.store.as_ref(), &query).await)
}

/// `GET /api/heatmap/pickups`
///
/// Cells where rides started, weighted by decayed pickup counts.
pub async fn pickups(
    state: web::Data<AppState>,
    params: web::Query<HeatmapQueryParams>,
) -> HttpResponse {
    let query = parse_time_range(&params);
    to_response(aggregate::pickups(state.store.as_ref(), &query).await)
}

/// Resolves the query window and decay constant, defaulting `end` to
/// now, `start` to `end` minus 24 hours, and `tauHours` to 24. Each is
/// independently overridable.
fn parse_time_range(params: &HeatmapQueryParams) -> HeatmapQuery {
    let end = params.end.unwrap_or_else(Utc::now);
    let start = params
        .start
        .unwrap_or_else(|| end - Duration::hours(DEFAULT_WINDOW_HOURS));
    HeatmapQuery {
        start,
        end,
        tau_hours: params.tau_hours.unwrap_or(DEFAULT_TAU_HOURS),
    }
}

/// Maps an aggregation outcome to an HTTP response: invalid windows are
/// the caller's fault, store failures are ours.
fn to_response(result: Result<Heatmap, HeatmapError>) -> HttpResponse {
    match result {
        Ok(heatmap) => HttpResponse::Ok().json(heatmap),
        Err(e @ HeatmapError::InvalidTimeRange { .. }) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": e.to_string()
            }))
        }
        Err(e) => {
            log::error!("Heatmap aggregation failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Heatmap aggregation failed"
            }))
        }
    }
}
