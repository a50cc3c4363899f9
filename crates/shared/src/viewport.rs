use serde::{Deserialize, Serialize};

use crate::cluster::SpatialIndex;
use crate::geo::{lat_to_y, lng_to_x, world_size, x_to_lng, y_to_lat};
use crate::models::{BBox, LatLng, MapFeature, ViewState};

/// Pixel size of the whole world at zoom 0.
pub const TILE_SIZE: f64 = 512.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

/// Screen position of `coord` relative to the top-left of the map canvas.
/// Longitude is wrapped so points just across the antimeridian land next to
/// the view instead of a world away.
pub fn project(coord: LatLng, view: &ViewState, size: ScreenSize) -> (f64, f64) {
    let world = world_size(view.zoom, TILE_SIZE);
    let mut dx = lng_to_x(coord.lng) - lng_to_x(view.lng);
    dx -= dx.round();
    let dy = lat_to_y(coord.lat) - lat_to_y(view.lat);
    (size.width / 2.0 + dx * world, size.height / 2.0 + dy * world)
}

pub fn unproject(px: f64, py: f64, view: &ViewState, size: ScreenSize) -> LatLng {
    let world = world_size(view.zoom, TILE_SIZE);
    let x = lng_to_x(view.lng) + (px - size.width / 2.0) / world;
    let y = (lat_to_y(view.lat) + (py - size.height / 2.0) / world).clamp(0.0, 1.0);
    LatLng::new(y_to_lat(y), x_to_lng(x))
}

/// Visible bounds of a view. West/east are left unwrapped; the clusterer
/// handles boxes that cross or span the antimeridian.
pub fn bounds_for_view(view: &ViewState, size: ScreenSize) -> BBox {
    let world = world_size(view.zoom, TILE_SIZE);
    let half_w = size.width / 2.0 / world;
    let half_h = size.height / 2.0 / world;
    let cx = lng_to_x(view.lng);
    let cy = lat_to_y(view.lat);
    BBox {
        west: x_to_lng(cx - half_w),
        east: x_to_lng(cx + half_w),
        north: y_to_lat((cy - half_h).clamp(0.0, 1.0)),
        south: y_to_lat((cy + half_h).clamp(0.0, 1.0)),
    }
}

/// Cluster marker diameter in px, growing with the share of all points it
/// holds.
pub fn marker_diameter(point_count: usize, total_points: usize) -> f64 {
    if total_points == 0 {
        return 40.0;
    }
    (40.0 + point_count as f64 / total_points as f64 * 30.0).min(70.0)
}

/// Memoized viewport query. Re-running with the same bbox and integer zoom
/// returns the cached feature set without touching the index.
#[derive(Debug, Default)]
pub struct ViewportQuery {
    key: Option<(BBox, i64)>,
    features: Vec<MapFeature>,
}

impl ViewportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query<I: SpatialIndex>(&mut self, index: &I, bbox: BBox, zoom: f64) -> &[MapFeature] {
        let key = (bbox, zoom.floor() as i64);
        if self.key != Some(key) {
            self.features = index.query(&bbox, zoom.floor());
            self.key = Some(key);
        }
        &self.features
    }

    /// Drop the cached result, e.g. after the index was rebuilt.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.features.clear();
    }

    pub fn features(&self) -> &[MapFeature] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterIndex;
    use crate::config::ClusterOptions;
    use crate::models::Point;

    fn point(lat: f64, lng: f64) -> Point {
        Point {
            entity_id: format!("{lat},{lng}"),
            location_id: None,
            lat,
            lng,
            is_primary: true,
        }
    }

    #[test]
    fn test_project_center_is_screen_middle() {
        let view = ViewState::new(39.0, -98.0, 4.0);
        let size = ScreenSize::new(800.0, 600.0);
        let (x, y) = project(view.center(), &view, size);
        assert!((x - 400.0).abs() < 1e-9);
        assert!((y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let view = ViewState::new(39.0, -98.0, 6.0);
        let size = ScreenSize::new(800.0, 600.0);
        let c = LatLng::new(40.5, -95.25);
        let (x, y) = project(c, &view, size);
        let back = unproject(x, y, &view, size);
        assert!((back.lat - c.lat).abs() < 1e-9);
        assert!((back.lng - c.lng).abs() < 1e-9);
    }

    #[test]
    fn test_unproject_keeps_lat_and_lng_apart() {
        let view = ViewState::new(-33.87, 151.21, 8.0);
        let size = ScreenSize::new(640.0, 480.0);
        let center = unproject(320.0, 240.0, &view, size);
        assert!((center.lat - -33.87).abs() < 1e-9);
        assert!((center.lng - 151.21).abs() < 1e-9);

        // Up and left of center is north and west
        let corner = unproject(0.0, 0.0, &view, size);
        assert!(corner.lat > center.lat);
        assert!(corner.lng < center.lng);
    }

    #[test]
    fn test_project_wraps_across_antimeridian() {
        let view = ViewState::new(0.0, 179.0, 5.0);
        let size = ScreenSize::new(800.0, 600.0);
        let (x, _) = project(LatLng::new(0.0, -179.0), &view, size);
        // Two degrees east of center, not a world away
        let expected = 400.0 + 2.0 / 360.0 * world_size(5.0, TILE_SIZE);
        assert!((x - expected).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_contain_center() {
        let view = ViewState::new(39.0, -98.0, 4.0);
        let b = bounds_for_view(&view, ScreenSize::new(1024.0, 768.0));
        assert!(b.west < -98.0 && b.east > -98.0);
        assert!(b.south < 39.0 && b.north > 39.0);
        // 1024px at zoom 4 is 1024 / 8192 of the world
        assert!(((b.east - b.west) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_marker_diameter() {
        assert_eq!(marker_diameter(0, 0), 40.0);
        assert_eq!(marker_diameter(5, 10), 55.0);
        assert_eq!(marker_diameter(10, 10), 70.0);
    }

    #[test]
    fn test_query_is_memoized_per_integer_zoom() {
        let points = vec![point(41.88, -87.63), point(40.71, -74.0)];
        let index = ClusterIndex::new(&points, &ClusterOptions::default());
        let mut q = ViewportQuery::new();

        let first = q.query(&index, BBox::WORLD, 5.2).to_vec();
        let second = q.query(&index, BBox::WORLD, 5.8).to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        q.invalidate();
        assert!(q.features().is_empty());
        assert_eq!(q.query(&index, BBox::WORLD, 5.0), first.as_slice());
    }
}
