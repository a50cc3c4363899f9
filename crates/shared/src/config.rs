use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::ViewState;

/// Parameters of the hierarchical point clusterer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterOptions {
    /// Merge radius in screen pixels.
    pub radius_px: f64,
    /// Tile extent the radius is measured against.
    pub extent: f64,
    pub min_zoom: u8,
    /// Highest zoom that still clusters; above it every point stands alone.
    pub max_zoom: u8,
    /// Smallest group that forms a cluster.
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius_px: 60.0,
            extent: 512.0,
            min_zoom: 0,
            max_zoom: 16,
            min_points: 2,
        }
    }
}

/// Camera choreography and clustering settings for one map instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub cluster: ClusterOptions,
    pub view_min_zoom: f64,
    pub view_max_zoom: f64,
    /// Where the intro spin settles.
    pub home_view: ViewState,
    /// Where the intro spin starts, roughly the far side of the globe.
    pub spin_start_view: ViewState,
    pub spin_duration_ms: u64,
    pub fly_duration_ms: u64,
    /// Zoom used when flying to a single entity.
    pub detail_zoom: f64,
    /// Vertical screen offset so the popup above a marker stays in view.
    pub popup_offset_px: f64,
    /// Zoom used when flying to a geocoded search result.
    pub search_zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterOptions::default(),
            view_min_zoom: 1.0,
            view_max_zoom: 18.0,
            home_view: ViewState::new(39.0, -98.0, 4.0),
            spin_start_view: ViewState::new(39.0, 82.0, 2.0),
            spin_duration_ms: 4000,
            fly_duration_ms: 1500,
            detail_zoom: 10.0,
            popup_offset_px: 150.0,
            search_zoom: 10.0,
        }
    }
}

impl MapConfig {
    pub fn spin_duration(&self) -> Duration {
        Duration::from_millis(self.spin_duration_ms)
    }

    pub fn fly_duration(&self) -> Duration {
        Duration::from_millis(self.fly_duration_ms)
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.view_min_zoom, self.view_max_zoom)
    }
}

/// Proximity search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub radius_miles: f64,
    /// ISO country code passed to the geocoder, if any.
    pub country: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_miles: 100.0,
            country: Some("US".to_string()),
        }
    }
}
