//! Spatial query utilities for distance calculations.
//!
//! Uses Haversine formula for accurate distances on Earth's surface.

use geo::{HaversineDistance, Point};

/// Slightly below the mean radius `geo` measures with, so bounding boxes
/// derived from it always contain every point the exact filter accepts.
const BOUNDING_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    if !(p1.x().is_finite() && p1.y().is_finite() && p2.x().is_finite() && p2.y().is_finite()) {
        return f64::INFINITY;
    }
    p1.haversine_distance(&p2)
}

/// Longitude/latitude box guaranteed to contain every point within
/// `radius_m` of `center`.
///
/// Returns `None` when the circle reaches a pole or the antimeridian, in
/// which case callers fall back to scanning everything.
pub fn bounding_box(center: Point, radius_m: f64) -> Option<([f64; 2], [f64; 2])> {
    let angular = radius_m / BOUNDING_EARTH_RADIUS_M * 1.0001;
    if angular >= std::f64::consts::FRAC_PI_2 {
        return None;
    }

    let delta_lat = angular.to_degrees();
    if center.y() - delta_lat <= -90.0 || center.y() + delta_lat >= 90.0 {
        return None;
    }

    // Widest longitude offset a great circle of this radius reaches
    let sin_lon = angular.sin() / center.y().to_radians().cos();
    if sin_lon >= 1.0 {
        return None;
    }
    let delta_lon = sin_lon.asin().to_degrees();
    if center.x() - delta_lon < -180.0 || center.x() + delta_lon > 180.0 {
        return None;
    }

    Some((
        [center.x() - delta_lon, center.y() - delta_lat],
        [center.x() + delta_lon, center.y() + delta_lat],
    ))
}

/// Default query radius in meters for a web-map zoom level
pub fn range_for_zoom(zoom: u8) -> f64 {
    5e6 / 2f64.powi(zoom as i32)
}
