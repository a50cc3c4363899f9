use dioxus::html::geometry::WheelDelta;
use geodir_shared::geo::{
    lat_to_y, lng_to_x, world_size, wrap_lng, x_to_lng, y_to_lat, MAX_MERCATOR_LAT,
};
use geodir_shared::models::ViewState;
use geodir_shared::viewport::{ScreenSize, TILE_SIZE};

/// Raster tile source. Tiles are 256 px, so tile zoom runs one level above
/// map zoom.
pub const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const RASTER_TILE_PX: f64 = 256.0;
const MAX_TILE_ZOOM: i32 = 19;

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
) -> (f64, f64) {
    (client_x - rect_left, client_y - rect_top)
}

/// Get the bounding client rect of an element by id.
pub fn element_rect(id: &str) -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(id)?;
    Some(element.get_bounding_client_rect())
}

/// Milliseconds since page load, for animation timing.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
pub fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

fn view_from_world(x: f64, y: f64, zoom: f64) -> ViewState {
    let lat = y_to_lat(y.clamp(0.0, 1.0)).clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    ViewState::new(lat, wrap_lng(x_to_lng(x)), zoom)
}

/// Move the view so the content follows a drag of `(dx, dy)` screen pixels.
pub fn pan_by(view: &ViewState, dx: f64, dy: f64) -> ViewState {
    let world = world_size(view.zoom, TILE_SIZE);
    let x = lng_to_x(view.lng) - dx / world;
    let y = lat_to_y(view.lat) - dy / world;
    view_from_world(x, y, view.zoom)
}

/// Change zoom while keeping the coordinate under `cursor` fixed on screen.
pub fn zoom_at_cursor(
    view: &ViewState,
    size: ScreenSize,
    cursor_x: f64,
    cursor_y: f64,
    new_zoom: f64,
) -> ViewState {
    let off_x = cursor_x - size.width / 2.0;
    let off_y = cursor_y - size.height / 2.0;
    let old_world = world_size(view.zoom, TILE_SIZE);
    let new_world = world_size(new_zoom, TILE_SIZE);

    let anchor_x = lng_to_x(view.lng) + off_x / old_world;
    let anchor_y = lat_to_y(view.lat) + off_y / old_world;
    view_from_world(
        anchor_x - off_x / new_world,
        anchor_y - off_y / new_world,
        new_zoom,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub url: String,
    pub left: f64,
    pub top: f64,
    pub size: f64,
}

/// Raster tiles covering the canvas for `view`, positioned in screen px.
pub fn visible_tiles(view: &ViewState, size: ScreenSize) -> Vec<Tile> {
    let z = ((view.zoom + 1.0).floor() as i32).clamp(0, MAX_TILE_ZOOM);
    let count = 1_i64 << z;
    let tile_px = RASTER_TILE_PX * 2f64.powf(view.zoom + 1.0 - z as f64);

    // Top-left of the canvas in tile space
    let origin_x = lng_to_x(view.lng) * count as f64 - size.width / 2.0 / tile_px;
    let origin_y = lat_to_y(view.lat) * count as f64 - size.height / 2.0 / tile_px;

    let x0 = origin_x.floor() as i64;
    let y0 = (origin_y.floor() as i64).max(0);
    let x1 = (origin_x + size.width / tile_px).ceil() as i64;
    let y1 = ((origin_y + size.height / tile_px).ceil() as i64).min(count);

    let mut tiles = Vec::new();
    for ty in y0..y1 {
        for tx in x0..x1 {
            let wrapped = tx.rem_euclid(count);
            tiles.push(Tile {
                url: TILE_URL
                    .replace("{z}", &z.to_string())
                    .replace("{x}", &wrapped.to_string())
                    .replace("{y}", &ty.to_string()),
                left: (tx as f64 - origin_x) * tile_px,
                top: (ty as f64 - origin_y) * tile_px,
                size: tile_px,
            });
        }
    }
    tiles
}
