//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::PI;

use reproj_common::{Coordinate, Extent};

/// Sphere radius used by Web Mercator (WGS84 semi-major axis).
pub const RADIUS: f64 = 6378137.0;

/// Half the world width in meters.
pub const HALF_SIZE: f64 = PI * RADIUS;

/// Projected extent of the whole world.
pub fn extent() -> Extent {
    Extent::new(-HALF_SIZE, -HALF_SIZE, HALF_SIZE, HALF_SIZE)
}

/// Geographic extent covered by the projection (latitude ~±85.06°).
pub fn world_extent() -> Extent {
    Extent::new(-180.0, -85.0, 180.0, 85.0)
}

/// Convert lon/lat degrees to Web Mercator meters.
///
/// Latitudes at or beyond the poles clamp to the edge of the square world.
pub fn from_lon_lat(coord: Coordinate) -> Coordinate {
    let x = RADIUS * PI * coord[0] / 180.0;
    let y = RADIUS * (PI * (coord[1] + 90.0) / 360.0).tan().ln();
    let y = if y.is_nan() { y } else { y.clamp(-HALF_SIZE, HALF_SIZE) };
    [x, y]
}

/// Convert Web Mercator meters to lon/lat degrees.
pub fn to_lon_lat(coord: Coordinate) -> Coordinate {
    let lon = 180.0 * coord[0] / HALF_SIZE;
    let lat = 360.0 * (coord[1] / RADIUS).exp().atan() / PI - 90.0;
    [lon, lat]
}
