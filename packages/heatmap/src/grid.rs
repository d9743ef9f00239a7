//! Fixed-resolution spatial grid indexing.
//!
//! Coordinates are floor-quantized into square cells of
//! [`DEFAULT_CELL_SIZE_DEG`] degrees per side and identified by a string
//! key. The round-trip through [`cell_id`] and [`cell_center`] is lossy
//! by design: only cell membership survives, and the center of the cell
//! comes back, not the original point.

/// Grid cell edge length in degrees (~277 m north-south at the equator).
pub const DEFAULT_CELL_SIZE_DEG: f64 = 0.0025;

/// Returns the cell identifier for a coordinate at the given grid size.
///
/// Both axes are quantized by flooring `coordinate / size`, scaled back,
/// formatted to 4 decimal places, and joined with a comma. Every point
/// inside one cell maps to the same id.
#[must_use]
pub fn cell_id(lat: f64, lng: f64, size: f64) -> String {
    let cell_lat = (lat / size).floor() * size;
    let cell_lng = (lng / size).floor() * size;
    format!("{cell_lat:.4},{cell_lng:.4}")
}

/// Returns the center coordinate of the cell identified by `id`.
///
/// Returns `None` if the id is not two comma-separated floats.
#[must_use]
pub fn cell_center(id: &str, size: f64) -> Option<(f64, f64)> {
    let (lat_str, lng_str) = id.split_once(',')?;
    let lat: f64 = lat_str.parse().ok()?;
    let lng: f64 = lng_str.parse().ok()?;
    Some((lat + size / 2.0, lng + size / 2.0))
}
