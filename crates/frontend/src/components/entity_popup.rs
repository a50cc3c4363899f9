use dioxus::prelude::*;
use geodir_shared::models::{GeoEntity, Location};

/// The location a popup describes: the one that was clicked, else the
/// primary, else the first.
pub fn popup_location<'a>(entity: &'a GeoEntity, location_id: Option<&str>) -> Option<&'a Location> {
    location_id
        .and_then(|id| entity.location(id))
        .or_else(|| entity.locations.iter().find(|l| l.is_primary))
        .or_else(|| entity.locations.first())
}

/// "City, Region, Country" from the location, falling back field by field
/// to the entity's own address.
pub fn place_line(entity: &GeoEntity, location: Option<&Location>) -> String {
    let pick = |loc: Option<&Option<String>>, own: &Option<String>| {
        loc.and_then(|v| v.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| own.clone().filter(|v| !v.is_empty()))
    };
    [
        pick(location.map(|l| &l.city), &entity.city),
        pick(location.map(|l| &l.state_region), &entity.state_region),
        pick(location.map(|l| &l.country), &entity.country),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}

#[component]
pub fn EntityPopup(
    entity: GeoEntity,
    location_id: Option<String>,
    x: f64,
    y: f64,
    on_close: EventHandler<()>,
) -> Element {
    let location = popup_location(&entity, location_id.as_deref());
    let label = location.and_then(|l| l.label.clone());
    let place = place_line(&entity, location);
    let count = entity.locations.len();

    rsx! {
        div {
            class: "entity-popup",
            style: "left:{x}px;top:{y}px;",
            onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
            ontouchstart: move |evt: Event<TouchData>| evt.stop_propagation(),
            button {
                class: "popup-close",
                "aria-label": "Close",
                onclick: move |evt: Event<MouseData>| {
                    evt.stop_propagation();
                    on_close.call(());
                },
                "×"
            }
            h3 { "{entity.name}" }
            if let Some(label) = label {
                p { class: "popup-label", "{label}" }
            }
            if count > 1 {
                p { class: "popup-count", "{count} locations" }
            }
            if !place.is_empty() {
                p { class: "popup-place", "{place}" }
            }
        }
    }
}
