//! Spherical distance and web-mercator projection helpers.
//!
//! Projected coordinates are normalized to the unit square: x grows east from
//! the antimeridian, y grows south from the top of the mercator world.

use std::f64::consts::PI;

use crate::models::LatLng;

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Latitude at which the square mercator world is cut off.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A coordinate is usable when both components are present, finite, in range
/// and non-zero. Zero is how the catalogue stores "not geocoded yet".
pub fn valid_coordinate(lat: Option<f64>, lng: Option<f64>) -> Option<LatLng> {
    let (lat, lng) = (lat?, lng?);
    if !lat.is_finite() || !lng.is_finite() {
        return None;
    }
    if lat == 0.0 || lng == 0.0 {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(LatLng::new(lat, lng))
}

/// Great-circle distance in miles (haversine).
pub fn haversine_miles(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

pub fn lng_to_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

pub fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    // Poles project to +/- infinity
    if y.is_nan() {
        return if lat > 0.0 { 0.0 } else { 1.0 };
    }
    y.clamp(0.0, 1.0)
}

pub fn x_to_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_to_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Width of the whole world in pixels at `zoom` for tiles of `extent` pixels.
pub fn world_size(zoom: f64, extent: f64) -> f64 {
    extent * 2f64.powf(zoom)
}

/// Wrap a longitude into [-180, 180).
pub fn wrap_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed longitude delta from `from` to `to` along the shorter way round.
pub fn lng_delta(from: f64, to: f64) -> f64 {
    let d = wrap_lng(to - from);
    // A half-turn is ambiguous; keep travelling east
    if d == -180.0 {
        180.0
    } else {
        d
    }
}
