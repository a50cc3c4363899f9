use std::sync::Arc;
use std::time::Duration;

use dioxus::html::input_data::MouseButton;
use dioxus::core::Task;
use dioxus::prelude::*;
use geodir_shared::camera::FlyRequest;
use geodir_shared::config::MapConfig;
use geodir_shared::controller::{MapController, MapEffect};
use geodir_shared::models::{ClusterId, GeoEntity, LatLng, MapFeature, PointId, ViewState};
use geodir_shared::viewport::{marker_diameter, project, ScreenSize};
use gloo_timers::future::TimeoutFuture;

use crate::components::entity_popup::EntityPopup;
use crate::coords;

const MAP_CONTAINER_ID: &str = "directory-map-container";

/// Mouse movement below this many pixels is a click, not a drag.
const DRAG_THRESHOLD: f64 = 3.0;

/// Touch movement below this many pixels is a tap.
const TOUCH_DRAG_THRESHOLD: f64 = 8.0;

/// Zoom change per pixel of wheel delta.
const WHEEL_ZOOM_RATE: f64 = 0.002;

const FRAME_MS: u32 = 16;

/// Diameter of a single-location pin.
const PIN_PX: f64 = 24.0;

#[derive(Debug, Clone, PartialEq)]
enum Marker {
    Cluster {
        id: ClusterId,
        x: f64,
        y: f64,
        diameter: f64,
        count: usize,
    },
    Pin {
        id: PointId,
        x: f64,
        y: f64,
        selected: bool,
        label: String,
    },
}

/// Screen-space markers for `features` rendered at `view`.
fn layout_markers(
    features: &[MapFeature],
    view: &ViewState,
    size: ScreenSize,
    total_points: usize,
    selected_location: Option<(&str, Option<&str>)>,
    label: impl Fn(&str) -> String,
) -> Vec<Marker> {
    features
        .iter()
        .map(|feature| {
            let (x, y) = project(feature.coordinate(), view, size);
            match feature {
                MapFeature::Cluster(node) => Marker::Cluster {
                    id: node.id,
                    x,
                    y,
                    diameter: marker_diameter(node.point_count, total_points),
                    count: node.point_count,
                },
                MapFeature::Point { id, point } => Marker::Pin {
                    id: *id,
                    x,
                    y,
                    selected: selected_location
                        == Some((point.entity_id.as_str(), point.location_id.as_deref())),
                    label: label(&point.entity_id),
                },
            }
        })
        .collect()
}

/// Drive one fly to completion, one frame per tick. Exits quietly once a
/// newer fly or a user move has replaced it.
async fn animate(
    request: FlyRequest,
    start: ViewState,
    mut controller: Signal<MapController>,
    mut display: Signal<ViewState>,
) {
    let began = coords::now_ms();
    loop {
        TimeoutFuture::new(FRAME_MS).await;
        if controller.peek().in_flight().map(|f| f.seq) != Some(request.seq) {
            return;
        }
        let elapsed = Duration::from_secs_f64(((coords::now_ms() - began) / 1000.0).max(0.0));
        let t = request.progress(elapsed);
        display.set(request.frame_from(start, t));
        if t >= 1.0 {
            if controller.write().complete_fly(request.seq) {
                display.set(controller.peek().view());
            }
            return;
        }
    }
}

#[component]
pub fn DirectoryMap(
    config: MapConfig,
    entities: ReadSignal<Arc<Vec<GeoEntity>>>,
    selected_entity_id: ReadSignal<Option<String>>,
    fly_to_location: ReadSignal<Option<LatLng>>,
    on_select: EventHandler<Option<GeoEntity>>,
) -> Element {
    let mut controller = use_signal(|| MapController::new(config.clone()));
    // What is on screen right now; differs from the controller's view mid-fly
    let mut display = use_signal(|| controller.peek().view());
    let mut animation = use_signal(|| None::<Task>);

    let mut dispatch = move |effects: Vec<MapEffect>| {
        for effect in effects {
            match effect {
                MapEffect::Fly(request) => {
                    if let Some(task) = animation.take() {
                        task.cancel();
                    }
                    let start = *display.peek();
                    animation.set(Some(spawn(animate(request, start, controller, display))));
                }
                MapEffect::Selected(entity) => on_select.call(entity),
            }
        }
    };

    let mut user_moved = move |view: ViewState| {
        if let Some(task) = animation.take() {
            task.cancel();
        }
        controller.write().user_moved(view);
        display.set(controller.peek().view());
    };

    use_effect(move || {
        let entities = entities.read().clone();
        let effects = controller.write().set_entities(entities);
        dispatch(effects);
    });

    use_effect(move || {
        let id = selected_entity_id.read().clone();
        let effects = controller.write().set_external_selection(id.as_deref());
        dispatch(effects);
    });

    use_effect(move || {
        let target = *fly_to_location.read();
        let effects = controller.write().set_fly_to_location(target);
        dispatch(effects);
    });

    // Drag state (mouse)
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start = use_signal(|| (0.0_f64, 0.0_f64));
    let mut drag_start_view = use_signal(|| *display.peek());

    // Touch state
    let mut touch_start = use_signal(|| None::<(f64, f64)>);
    let mut touch_did_pan = use_signal(|| false);

    // Partitioned at the committed view only, so clusters hold still mid-fly
    let features = use_memo(move || controller.read().features());

    let view = *display.read();
    let ctrl = controller.read();
    let size = ctrl.size();
    let tiles = coords::visible_tiles(&view, size);
    let selected_location = ctrl
        .popup()
        .map(|p| (p.entity_id.as_str(), p.location_id.as_deref()));
    let markers = layout_markers(
        &features.read(),
        &view,
        size,
        ctrl.total_points(),
        selected_location,
        |id| ctrl.entity(id).map(|e| e.name.clone()).unwrap_or_default(),
    );
    let popup = ctrl.popup().zip(ctrl.popup_entity()).map(|(popup, entity)| {
        let (x, y) = project(popup.coordinate(), &view, size);
        (entity.clone(), popup.location_id.clone(), x, y)
    });
    drop(ctrl);

    let container_class = if *is_dragging.read() && *did_drag.read() {
        "map-container dragging"
    } else {
        "map-container"
    };

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onmounted: move |_| {
                if let Some(rect) = coords::element_rect(MAP_CONTAINER_ID) {
                    controller.write().resize(ScreenSize::new(rect.width(), rect.height()));
                }
                let effects = controller.write().map_ready();
                dispatch(effects);
            },

            onresize: move |evt: Event<ResizeData>| {
                if let Ok(content) = evt.data().get_content_box_size() {
                    controller.write().resize(ScreenSize::new(content.width, content.height));
                }
            },

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let Some(rect) = coords::element_rect(MAP_CONTAINER_ID) else { return };
                let client = evt.data().client_coordinates();
                let (cx, cy) = coords::client_to_container(client.x, client.y, rect.left(), rect.top());

                let current = *display.peek();
                let delta_y = coords::wheel_delta_y(evt.data().delta());
                let zoom = controller.peek().config().clamp_zoom(current.zoom - delta_y * WHEEL_ZOOM_RATE);
                if (zoom - current.zoom).abs() < 1e-9 {
                    return;
                }
                let size = controller.peek().size();
                user_moved(coords::zoom_at_cursor(&current, size, cx, cy, zoom));
            },

            onmousedown: move |evt: Event<MouseData>| {
                // Only track drag/click for left mouse button
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                drag_start.set((client.x, client.y));
                drag_start_view.set(*display.peek());
            },

            onmousemove: move |evt: Event<MouseData>| {
                if !*is_dragging.read() {
                    return;
                }
                let client = evt.client_coordinates();
                let (sx, sy) = *drag_start.read();
                let (dx, dy) = (client.x - sx, client.y - sy);

                if !*did_drag.read() && (dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD) {
                    did_drag.set(true);
                }
                if *did_drag.read() {
                    user_moved(coords::pan_by(&drag_start_view.read(), dx, dy));
                }
            },

            onmouseup: move |_evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                is_dragging.set(false);

                // A mouseup without drag movement = a click on the canvas
                if was_dragging && !was_drag {
                    let effects = controller.write().background_clicked();
                    dispatch(effects);
                }
            },

            onmouseleave: move |_| is_dragging.set(false),

            ontouchstart: move |evt: Event<TouchData>| {
                let touches = evt.touches();
                if let [t] = touches.as_slice() {
                    let c = t.client_coordinates();
                    touch_start.set(Some((c.x, c.y)));
                    touch_did_pan.set(false);
                    drag_start_view.set(*display.peek());
                }
            },

            ontouchmove: move |evt: Event<TouchData>| {
                let Some((sx, sy)) = *touch_start.read() else { return };
                let touches = evt.touches();
                let [t] = touches.as_slice() else { return };
                evt.prevent_default();
                let c = t.client_coordinates();
                let (dx, dy) = (c.x - sx, c.y - sy);
                if !*touch_did_pan.read() && dx.hypot(dy) > TOUCH_DRAG_THRESHOLD {
                    touch_did_pan.set(true);
                }
                if *touch_did_pan.read() {
                    user_moved(coords::pan_by(&drag_start_view.read(), dx, dy));
                }
            },

            ontouchend: move |_evt: Event<TouchData>| {
                let tapped = touch_start.read().is_some() && !*touch_did_pan.read();
                touch_start.set(None);
                if tapped {
                    let effects = controller.write().background_clicked();
                    dispatch(effects);
                }
            },

            div { class: "map-tiles",
                for tile in tiles {
                    img {
                        key: "{tile.url}-{tile.left}",
                        class: "map-tile",
                        src: "{tile.url}",
                        draggable: "false",
                        style: "left:{tile.left}px;top:{tile.top}px;width:{tile.size}px;height:{tile.size}px;",
                    }
                }
            }

            div { class: "map-markers",
                {markers.into_iter().map(move |marker| match marker {
                    Marker::Cluster { id, x, y, diameter, count } => rsx! {
                        div {
                            key: "c{id.0}",
                            class: "cluster-marker",
                            style: "left:{x}px;top:{y}px;width:{diameter}px;height:{diameter}px;line-height:{diameter}px;",
                            onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                            ontouchstart: move |evt: Event<TouchData>| evt.stop_propagation(),
                            onclick: move |evt: Event<MouseData>| {
                                evt.stop_propagation();
                                let effects = controller.write().cluster_clicked(id);
                                dispatch(effects);
                            },
                            "{count}"
                        }
                    },
                    Marker::Pin { id, x, y, selected, label } => rsx! {
                        div {
                            key: "p{id.0}",
                            class: if selected { "pin-marker selected" } else { "pin-marker" },
                            title: "{label}",
                            style: "left:{x}px;top:{y}px;width:{PIN_PX}px;height:{PIN_PX}px;",
                            onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                            ontouchstart: move |evt: Event<TouchData>| evt.stop_propagation(),
                            onclick: move |evt: Event<MouseData>| {
                                evt.stop_propagation();
                                let effects = controller.write().marker_clicked(id);
                                dispatch(effects);
                            },
                        }
                    },
                })}
            }

            if let Some((entity, location_id, x, y)) = popup {
                EntityPopup {
                    entity,
                    location_id,
                    x,
                    y,
                    on_close: move |_| {
                        let effects = controller.write().close_popup();
                        dispatch(effects);
                    },
                }
            }
        }
    }
}
