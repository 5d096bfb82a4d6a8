//! Resolution estimation across projections.
//!
//! A target resolution only has a fixed ground size at a given point, so the
//! matching source resolution is estimated at the centre of the target view.

use reproj_common::{Coordinate, Projection, ProjectionCode, Units};

use crate::registry::ProjectionRegistry;

/// Mean earth radius used for great-circle distances.
pub const EARTH_RADIUS: f64 = 6371008.8;

/// Great-circle (haversine) distance in meters between two lon/lat points.
pub fn get_distance(c1: Coordinate, c2: Coordinate) -> f64 {
    let lat1 = c1[1].to_radians();
    let lat2 = c2[1].to_radians();
    let delta_lat_by_2 = (lat2 - lat1) / 2.0;
    let delta_lon_by_2 = (c2[0] - c1[0]).to_radians() / 2.0;
    let a = delta_lat_by_2.sin() * delta_lat_by_2.sin()
        + delta_lon_by_2.sin() * delta_lon_by_2.sin() * lat1.cos() * lat2.cos();
    2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Resolution of `projection` at `point`, in the projection's own units.
///
/// Degrees pass through. Projections with no transform to EPSG:4326 scale by
/// their meters-per-unit. Everything else measures a one-pixel cross around
/// `point` on the sphere.
pub fn get_point_resolution(
    registry: &ProjectionRegistry,
    projection: &Projection,
    resolution: f64,
    point: Coordinate,
) -> f64 {
    if projection.units == Units::Degrees {
        return resolution;
    }

    let geographic = registry
        .get(&ProjectionCode::Epsg4326)
        .cloned();
    let to_geographic = geographic
        .as_ref()
        .and_then(|g| registry.transform_fn(projection, g));

    let point_resolution = match to_geographic {
        Some(transform) if !transform.is_identity() => {
            let half = resolution / 2.0;
            let left = transform.apply([point[0] - half, point[1]]);
            let right = transform.apply([point[0] + half, point[1]]);
            let bottom = transform.apply([point[0], point[1] - half]);
            let top = transform.apply([point[0], point[1] + half]);
            let width = get_distance(left, right);
            let height = get_distance(bottom, top);
            (width + height) / 2.0
        }
        _ => return resolution * projection.meters_per_unit().unwrap_or(1.0),
    };

    match projection.meters_per_unit() {
        Some(mpu) => point_resolution / mpu,
        None => point_resolution,
    }
}

/// Estimate the source resolution matching `target_resolution` at `target_center`.
pub fn calculate_source_resolution(
    registry: &ProjectionRegistry,
    source: &Projection,
    target: &Projection,
    target_center: Coordinate,
    target_resolution: f64,
) -> f64 {
    let source_center = registry
        .transform_fn(target, source)
        .map(|t| t.apply(target_center))
        .unwrap_or(target_center);

    let mut source_resolution = get_point_resolution(registry, target, target_resolution, target_center);

    if let Some(mpu) = target.meters_per_unit() {
        source_resolution *= mpu;
    }
    if let Some(mpu) = source.meters_per_unit() {
        source_resolution /= mpu;
    }

    let center_in_source = registry
        .bounds_of(source)
        .map(|e| e.contains_coordinate(source_center))
        .unwrap_or(true);
    if center_in_source {
        let compensation =
            get_point_resolution(registry, source, source_resolution, source_center) / source_resolution;
        if compensation.is_finite() && compensation > 0.0 {
            source_resolution /= compensation;
        }
    }

    source_resolution
}
