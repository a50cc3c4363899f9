//! Reconciles marker clicks and the externally supplied selected id onto a
//! single popup.

use crate::models::{EntityId, Point, PopupState, SelectionSource, SelectionState};

#[derive(Debug, Clone, Default)]
pub struct SelectionSync {
    selection: SelectionState,
    popup: Option<PopupState>,
    /// Id already acted upon, so the external echo of an internal click
    /// doesn't fly a second time.
    handled: Option<EntityId>,
    /// Last externally supplied id.
    external: Option<EntityId>,
    /// The external id could not be resolved yet.
    pending: bool,
}

impl SelectionSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn popup(&self) -> Option<&PopupState> {
        self.popup.as_ref()
    }

    pub fn handled(&self) -> Option<&str> {
        self.handled.as_deref()
    }

    /// A marker was clicked. Returns the popup to open, or `None` when that
    /// exact popup is already open.
    pub fn marker_clicked(&mut self, point: &Point) -> Option<PopupState> {
        let popup = PopupState::from(point);
        self.handled = Some(point.entity_id.clone());
        self.selection = SelectionState::new(&point.entity_id, SelectionSource::Internal);
        if self.popup.as_ref() == Some(&popup) {
            return None;
        }
        self.popup = Some(popup.clone());
        Some(popup)
    }

    /// The externally supplied id changed. `resolve` maps an entity id to
    /// its representative point. Returns the popup to open, if any.
    pub fn external_changed<F>(&mut self, id: Option<&str>, resolve: F) -> Option<PopupState>
    where
        F: Fn(&str) -> Option<Point>,
    {
        if self.external.as_deref() == id {
            return None;
        }
        self.external = id.map(str::to_string);
        self.apply_external(resolve)
    }

    /// Re-attempt an external id that could not be resolved, e.g. once the
    /// entity it names has been loaded.
    pub fn retry_external<F>(&mut self, resolve: F) -> Option<PopupState>
    where
        F: Fn(&str) -> Option<Point>,
    {
        if !self.pending {
            return None;
        }
        self.apply_external(resolve)
    }

    fn apply_external<F>(&mut self, resolve: F) -> Option<PopupState>
    where
        F: Fn(&str) -> Option<Point>,
    {
        self.pending = false;
        let Some(id) = self.external.clone() else {
            self.handled = None;
            return None;
        };
        if self.handled.as_deref() == Some(id.as_str()) {
            return None;
        }
        let Some(point) = resolve(&id) else {
            self.pending = true;
            return None;
        };
        let popup = PopupState::from(&point);
        self.handled = Some(id.clone());
        self.selection = SelectionState::new(&id, SelectionSource::External);
        self.popup = Some(popup.clone());
        Some(popup)
    }

    /// Close the popup. Returns the popup that was open.
    pub fn close(&mut self) -> Option<PopupState> {
        self.selection = SelectionState::default();
        self.handled = None;
        self.popup.take()
    }
}
