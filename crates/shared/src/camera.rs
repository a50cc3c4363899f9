//! Camera state machine.
//!
//! The controller owns the committed view. Every fly-to is issued as a
//! [`FlyRequest`] tagged with a monotonically increasing sequence number;
//! the render layer animates it and reports completion with that number.
//! Only the most recently issued request may commit, so a superseded
//! animation finishing late is ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::geo::{lat_to_y, lng_delta, world_size, wrap_lng, y_to_lat};
use crate::models::{LatLng, ViewState};
use crate::viewport::TILE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlySeq(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlyKind {
    Spin,
    Cluster,
    Popup,
    Return,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlyRequest {
    pub seq: FlySeq,
    pub kind: FlyKind,
    pub from: ViewState,
    pub to: ViewState,
    pub duration_ms: u64,
}

impl FlyRequest {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Camera position at progress `t` in `[0, 1]`.
    pub fn frame(&self, t: f64) -> ViewState {
        self.frame_from(self.from, t)
    }

    /// Like [`frame`](Self::frame) but starting from wherever the camera
    /// actually is, for a fly that interrupts another one mid-way.
    pub fn frame_from(&self, start: ViewState, t: f64) -> ViewState {
        let e = ease_out_cubic(t.clamp(0.0, 1.0));
        if e >= 1.0 {
            return self.to;
        }
        ViewState {
            lat: start.lat + (self.to.lat - start.lat) * e,
            lng: wrap_lng(start.lng + lng_delta(start.lng, self.to.lng) * e),
            zoom: start.zoom + (self.to.zoom - start.zoom) * e,
        }
    }

    /// Progress after `elapsed` of wall time.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (elapsed.as_secs_f64() * 1000.0 / self.duration_ms as f64).min(1.0)
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraPhase {
    Idle,
    Spinning,
    Settled,
    Flying,
    PopupFlying,
    PopupOpen,
    Returning,
}

#[derive(Debug, Clone)]
pub struct CameraController {
    config: MapConfig,
    view: ViewState,
    next_seq: u64,
    in_flight: Option<FlyRequest>,
    previous_view: Option<ViewState>,
    has_spun: bool,
}

impl CameraController {
    pub fn new(config: MapConfig) -> Self {
        Self {
            view: config.spin_start_view,
            config,
            next_seq: 1,
            in_flight: None,
            previous_view: None,
            has_spun: false,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn in_flight(&self) -> Option<&FlyRequest> {
        self.in_flight.as_ref()
    }

    pub fn previous_view(&self) -> Option<ViewState> {
        self.previous_view
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn phase(&self, popup_open: bool) -> CameraPhase {
        match self.in_flight.map(|f| f.kind) {
            Some(FlyKind::Spin) => CameraPhase::Spinning,
            Some(FlyKind::Cluster | FlyKind::Search) => CameraPhase::Flying,
            Some(FlyKind::Popup) => CameraPhase::PopupFlying,
            Some(FlyKind::Return) => CameraPhase::Returning,
            None if !self.has_spun => CameraPhase::Idle,
            None if popup_open => CameraPhase::PopupOpen,
            None => CameraPhase::Settled,
        }
    }

    fn issue(&mut self, kind: FlyKind, to: ViewState, duration_ms: u64) -> FlyRequest {
        let request = FlyRequest {
            seq: FlySeq(self.next_seq),
            kind,
            from: self.view,
            to: ViewState {
                zoom: self.config.clamp_zoom(to.zoom),
                ..to
            },
            duration_ms,
        };
        self.next_seq += 1;
        if let Some(prev) = self.in_flight.replace(request) {
            tracing::debug!(superseded = prev.seq.0, by = request.seq.0, "Fly superseded");
        }
        request
    }

    /// Intro spin from the far side of the globe to the home view. Only the
    /// first call does anything.
    pub fn start_spin(&mut self) -> Option<FlyRequest> {
        if self.has_spun {
            return None;
        }
        self.has_spun = true;
        self.view = self.config.spin_start_view;
        let home = self.config.home_view;
        Some(self.issue(FlyKind::Spin, home, self.config.spin_duration_ms))
    }

    /// Fly onto a cluster. The zoom never drops below the zoom the cluster
    /// was displayed at and never exceeds the cluster max zoom.
    pub fn fly_to_cluster(&mut self, center: LatLng, expansion_zoom: u8, display_zoom: f64) -> FlyRequest {
        let capped = expansion_zoom.min(self.config.cluster.max_zoom) as f64;
        let zoom = capped.max(display_zoom.floor());
        self.issue(
            FlyKind::Cluster,
            ViewState::new(center.lat, center.lng, zoom),
            self.config.fly_duration_ms,
        )
    }

    /// Fly to a marker at detail zoom, leaving room above it for the popup.
    pub fn fly_to_popup(&mut self, target: LatLng) -> FlyRequest {
        if self.previous_view.is_none() {
            // Mid-return, the real prior view is where the return is heading
            self.previous_view = match self.in_flight {
                Some(f) if f.kind == FlyKind::Return => Some(f.to),
                _ => Some(self.view),
            };
        }
        let zoom = self.config.clamp_zoom(self.config.detail_zoom);
        let world = world_size(zoom, TILE_SIZE);
        let y = (lat_to_y(target.lat) - self.config.popup_offset_px / world).clamp(0.0, 1.0);
        self.issue(
            FlyKind::Popup,
            ViewState::new(y_to_lat(y), target.lng, zoom),
            self.config.fly_duration_ms,
        )
    }

    /// Fly to a searched coordinate at search zoom. Does not touch the
    /// previous-view slot.
    pub fn fly_to_location(&mut self, target: LatLng) -> FlyRequest {
        let zoom = self.config.search_zoom;
        self.issue(
            FlyKind::Search,
            ViewState::new(target.lat, target.lng, zoom),
            self.config.fly_duration_ms,
        )
    }

    /// Fly back to the snapshot taken before the first popup fly, if any,
    /// and clear it.
    pub fn return_to_previous(&mut self) -> Option<FlyRequest> {
        let previous = self.previous_view.take()?;
        Some(self.issue(FlyKind::Return, previous, self.config.fly_duration_ms))
    }

    pub fn discard_previous_view(&mut self) {
        self.previous_view = None;
    }

    /// Commit a finished animation. Returns false for a stale sequence.
    pub fn complete(&mut self, seq: FlySeq) -> bool {
        match self.in_flight {
            Some(f) if f.seq == seq => {
                self.view = f.to;
                self.in_flight = None;
                tracing::debug!(seq = seq.0, kind = ?f.kind, "Fly completed");
                true
            }
            _ => {
                tracing::debug!(seq = seq.0, "Ignoring stale fly completion");
                false
            }
        }
    }

    /// The user panned or zoomed. Any animation in flight is abandoned.
    pub fn user_moved(&mut self, view: ViewState) {
        if let Some(f) = self.in_flight.take() {
            tracing::debug!(seq = f.seq.0, "Fly cancelled by user move");
        }
        self.has_spun = true;
        self.view = ViewState {
            lat: view.lat.clamp(-crate::geo::MAX_MERCATOR_LAT, crate::geo::MAX_MERCATOR_LAT),
            lng: wrap_lng(view.lng),
            zoom: self.config.clamp_zoom(view.zoom),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled() -> CameraController {
        let mut cam = CameraController::new(MapConfig::default());
        let spin = cam.start_spin().unwrap();
        assert!(cam.complete(spin.seq));
        cam
    }

    #[test]
    fn test_spin_runs_once() {
        let mut cam = CameraController::new(MapConfig::default());
        assert_eq!(cam.phase(false), CameraPhase::Idle);

        let spin = cam.start_spin().unwrap();
        assert_eq!(spin.kind, FlyKind::Spin);
        assert_eq!(spin.from, MapConfig::default().spin_start_view);
        assert_eq!(spin.duration(), Duration::from_secs(4));
        assert_eq!(cam.phase(false), CameraPhase::Spinning);
        assert!(cam.start_spin().is_none());

        assert!(cam.complete(spin.seq));
        assert_eq!(cam.view(), MapConfig::default().home_view);
        assert_eq!(cam.phase(false), CameraPhase::Settled);
        assert!(cam.start_spin().is_none());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut cam = settled();
        let a = cam.fly_to_cluster(LatLng::new(41.0, -87.0), 8, 4.0);
        let b = cam.fly_to_location(LatLng::new(34.0, -118.0));
        assert!(b.seq > a.seq);

        assert!(!cam.complete(a.seq));
        assert_eq!(cam.view(), MapConfig::default().home_view);
        assert!(cam.complete(b.seq));
        assert_eq!(cam.view(), b.to);
        assert!(!cam.complete(b.seq));
    }

    #[test]
    fn test_cluster_zoom_bounds() {
        let mut cam = settled();
        assert_eq!(cam.fly_to_cluster(LatLng::new(1.0, 1.0), 20, 4.0).to.zoom, 16.0);
        assert_eq!(cam.fly_to_cluster(LatLng::new(1.0, 1.0), 3, 5.6).to.zoom, 5.0);
        assert_eq!(cam.fly_to_cluster(LatLng::new(1.0, 1.0), 9, 5.6).to.zoom, 9.0);
    }

    #[test]
    fn test_popup_fly_offsets_center_north() {
        let mut cam = settled();
        let target = LatLng::new(40.0, -75.0);
        let fly = cam.fly_to_popup(target);
        assert_eq!(fly.to.zoom, 10.0);
        assert_eq!(fly.to.lng, -75.0);
        assert!(fly.to.lat > target.lat);

        let world = world_size(10.0, TILE_SIZE);
        let shift = (lat_to_y(target.lat) - lat_to_y(fly.to.lat)) * world;
        assert!((shift - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_return_restores_exact_prior_view() {
        let mut cam = settled();
        let v1 = cam.view();

        let open = cam.fly_to_popup(LatLng::new(40.0, -75.0));
        assert_eq!(cam.phase(false), CameraPhase::PopupFlying);
        cam.complete(open.seq);
        assert_eq!(cam.phase(true), CameraPhase::PopupOpen);

        let back = cam.return_to_previous().unwrap();
        assert_eq!(back.to, v1);
        assert_eq!(cam.phase(false), CameraPhase::Returning);
        cam.complete(back.seq);
        assert_eq!(cam.view(), v1);
        assert!(cam.previous_view().is_none());
        assert!(cam.return_to_previous().is_none());
    }

    #[test]
    fn test_second_popup_mid_flight_keeps_first_snapshot() {
        let mut cam = settled();
        let v1 = cam.view();

        let first = cam.fly_to_popup(LatLng::new(40.0, -75.0));
        let second = cam.fly_to_popup(LatLng::new(34.0, -118.0));
        assert!(!cam.complete(first.seq));
        assert!(cam.complete(second.seq));
        assert_eq!(cam.previous_view(), Some(v1));
        assert_eq!(cam.return_to_previous().unwrap().to, v1);
    }

    #[test]
    fn test_popup_during_return_snapshots_return_target() {
        let mut cam = settled();
        let v1 = cam.view();
        let open = cam.fly_to_popup(LatLng::new(40.0, -75.0));
        cam.complete(open.seq);
        cam.return_to_previous().unwrap();

        cam.fly_to_popup(LatLng::new(34.0, -118.0));
        assert_eq!(cam.previous_view(), Some(v1));
    }

    #[test]
    fn test_search_fly_leaves_snapshot_alone() {
        let mut cam = settled();
        let fly = cam.fly_to_location(LatLng::new(34.0, -118.0));
        assert_eq!(fly.to.zoom, 10.0);
        assert_eq!(fly.kind, FlyKind::Search);
        assert!(cam.previous_view().is_none());
        assert_eq!(cam.phase(false), CameraPhase::Flying);
    }

    #[test]
    fn test_user_move_cancels_flight() {
        let mut cam = settled();
        let fly = cam.fly_to_location(LatLng::new(34.0, -118.0));
        cam.user_moved(ViewState::new(35.0, -100.0, 30.0));
        assert!(cam.in_flight().is_none());
        assert_eq!(cam.view().zoom, 18.0);
        assert!(!cam.complete(fly.seq));
        assert_eq!(cam.view().lat, 35.0);
    }

    #[test]
    fn test_frame_endpoints_and_short_way_round() {
        let fly = FlyRequest {
            seq: FlySeq(1),
            kind: FlyKind::Search,
            from: ViewState::new(0.0, 170.0, 2.0),
            to: ViewState::new(10.0, -170.0, 6.0),
            duration_ms: 1000,
        };
        assert_eq!(fly.frame(0.0), fly.from);
        assert_eq!(fly.frame(1.0), fly.to);

        let mid = fly.frame(0.5);
        assert!((mid.lng - -172.5).abs() < 1e-9);
        assert!((mid.zoom - 5.5).abs() < 1e-9);
        assert!((mid.lat - 8.75).abs() < 1e-9);

        assert_eq!(fly.progress(Duration::from_millis(250)), 0.25);
        assert_eq!(fly.progress(Duration::from_secs(3)), 1.0);
    }
}
