//! One owned state object per map instance.
//!
//! UI events go in, [`MapEffect`]s come out. The render layer animates the
//! flies it is handed and reports back through [`MapController::complete_fly`];
//! `Selected` effects are forwarded to whoever listens for selection changes.

use std::cell::RefCell;
use std::sync::Arc;

use crate::camera::{CameraController, CameraPhase, FlyRequest, FlySeq};
use crate::cluster::{ClusterIndex, SpatialIndex};
use crate::config::MapConfig;
use crate::extract::{extract_points, representative_point};
use crate::models::{
    BBox, ClusterId, GeoEntity, LatLng, MapFeature, PointId, PopupState, SelectionState, ViewState,
};
use crate::selection::SelectionSync;
use crate::viewport::{bounds_for_view, ScreenSize, ViewportQuery};

#[derive(Debug, Clone, PartialEq)]
pub enum MapEffect {
    Fly(FlyRequest),
    Selected(Option<GeoEntity>),
}

pub struct MapController<I: SpatialIndex = ClusterIndex> {
    config: MapConfig,
    entities: Arc<Vec<GeoEntity>>,
    index: I,
    viewport: RefCell<ViewportQuery>,
    camera: CameraController,
    selection: SelectionSync,
    size: ScreenSize,
    fly_to_location: Option<LatLng>,
}

impl MapController<ClusterIndex> {
    pub fn new(config: MapConfig) -> Self {
        Self::with_index(config)
    }
}

impl<I: SpatialIndex> MapController<I> {
    pub fn with_index(config: MapConfig) -> Self {
        Self {
            index: I::build(&[], &config.cluster),
            viewport: RefCell::new(ViewportQuery::new()),
            camera: CameraController::new(config.clone()),
            selection: SelectionSync::new(),
            entities: Arc::new(Vec::new()),
            size: ScreenSize::default(),
            fly_to_location: None,
            config,
        }
    }

    /// Replace the entity set. The index is only rebuilt when the set
    /// actually changed. A popup whose entity is no longer in the set is
    /// closed in place.
    pub fn set_entities(&mut self, entities: Arc<Vec<GeoEntity>>) -> Vec<MapEffect> {
        if Arc::ptr_eq(&self.entities, &entities) {
            return Vec::new();
        }
        self.entities = entities;
        let points = extract_points(&self.entities);
        self.index = I::build(&points, &self.config.cluster);
        self.viewport.get_mut().invalidate();
        tracing::info!(
            entities = self.entities.len(),
            points = points.len(),
            "Reindexed map entities"
        );

        let mut effects = Vec::new();
        let orphaned = self
            .selection
            .popup()
            .is_some_and(|p| self.entity(&p.entity_id).is_none());
        if orphaned {
            tracing::debug!("Open popup's entity left the set, closing it");
            self.selection.close();
            self.camera.discard_previous_view();
            effects.push(MapEffect::Selected(None));
        }

        let entities = &self.entities;
        if let Some(popup) = self.selection.retry_external(|id| resolve(entities, id)) {
            effects.push(MapEffect::Fly(self.camera.fly_to_popup(popup.coordinate())));
        }
        effects
    }

    pub fn resize(&mut self, size: ScreenSize) {
        self.size = size;
    }

    /// The map finished loading. Starts the intro spin the first time.
    pub fn map_ready(&mut self) -> Vec<MapEffect> {
        self.camera.start_spin().map(MapEffect::Fly).into_iter().collect()
    }

    pub fn user_moved(&mut self, view: ViewState) {
        self.camera.user_moved(view);
    }

    pub fn marker_clicked(&mut self, id: PointId) -> Vec<MapEffect> {
        let Some(point) = self.index.point(id).cloned() else {
            tracing::debug!(point = id.0, "Click on unknown point");
            return Vec::new();
        };
        let Some(entity) = self.entity(&point.entity_id).cloned() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        if self.selection.marker_clicked(&point).is_some() {
            effects.push(MapEffect::Fly(self.camera.fly_to_popup(point.coordinate())));
        }
        effects.push(MapEffect::Selected(Some(entity)));
        effects
    }

    /// Zoom into a cluster. An open popup is closed on the way without
    /// returning to the view it was opened from.
    pub fn cluster_clicked(&mut self, id: ClusterId) -> Vec<MapEffect> {
        let Some(node) = self.index.cluster(id) else {
            tracing::debug!(cluster = id.0, "Click on unknown cluster");
            return Vec::new();
        };

        let mut effects = Vec::new();
        if self.selection.close().is_some() {
            self.camera.discard_previous_view();
            effects.push(MapEffect::Selected(None));
        }
        let expansion = self.index.expansion_zoom(id);
        let display_zoom = self.camera.view().zoom;
        effects.push(MapEffect::Fly(
            self.camera.fly_to_cluster(node.center(), expansion, display_zoom),
        ));
        effects
    }

    /// A click on the map canvas outside any marker.
    pub fn background_clicked(&mut self) -> Vec<MapEffect> {
        self.close_popup()
    }

    pub fn close_popup(&mut self) -> Vec<MapEffect> {
        if self.selection.close().is_none() {
            return Vec::new();
        }
        let mut effects = vec![MapEffect::Selected(None)];
        effects.extend(self.camera.return_to_previous().map(MapEffect::Fly));
        effects
    }

    /// The surrounding list selected an entity (or cleared its selection).
    pub fn set_external_selection(&mut self, id: Option<&str>) -> Vec<MapEffect> {
        let entities = &self.entities;
        self.selection
            .external_changed(id, |id| resolve(entities, id))
            .map(|popup| vec![MapEffect::Fly(self.camera.fly_to_popup(popup.coordinate()))])
            .unwrap_or_default()
    }

    /// Fly to a coordinate handed in from outside, e.g. a search result.
    pub fn set_fly_to_location(&mut self, target: Option<LatLng>) -> Vec<MapEffect> {
        if self.fly_to_location == target {
            return Vec::new();
        }
        self.fly_to_location = target;
        target
            .map(|t| MapEffect::Fly(self.camera.fly_to_location(t)))
            .into_iter()
            .collect()
    }

    pub fn complete_fly(&mut self, seq: FlySeq) -> bool {
        self.camera.complete(seq)
    }

    /// Features partitioned at the committed view. While a fly is running
    /// the whole world is returned at the committed zoom, so markers along
    /// the path are already placed.
    pub fn features(&self) -> Vec<MapFeature> {
        let view = self.camera.view();
        let bbox = match self.camera.in_flight() {
            Some(_) => BBox::WORLD,
            None => bounds_for_view(&view, self.size),
        };
        self.viewport
            .borrow_mut()
            .query(&self.index, bbox, view.zoom)
            .to_vec()
    }

    pub fn phase(&self) -> CameraPhase {
        self.camera.phase(self.selection.popup().is_some())
    }

    pub fn view(&self) -> ViewState {
        self.camera.view()
    }

    pub fn in_flight(&self) -> Option<&FlyRequest> {
        self.camera.in_flight()
    }

    pub fn popup(&self) -> Option<&PopupState> {
        self.selection.popup()
    }

    pub fn popup_entity(&self) -> Option<&GeoEntity> {
        self.popup().and_then(|p| self.entity(&p.entity_id))
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.selection()
    }

    pub fn entities(&self) -> &Arc<Vec<GeoEntity>> {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Option<&GeoEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn total_points(&self) -> usize {
        self.index.points().len()
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }
}

fn resolve(entities: &[GeoEntity], id: &str) -> Option<crate::models::Point> {
    entities
        .iter()
        .find(|e| e.id == id)
        .and_then(representative_point)
}
