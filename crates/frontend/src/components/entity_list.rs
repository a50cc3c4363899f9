use std::sync::Arc;

use dioxus::prelude::*;
use geodir_shared::models::GeoEntity;

use crate::components::entity_popup::{place_line, popup_location};

#[component]
pub fn EntityList(
    entities: Arc<Vec<GeoEntity>>,
    selected_entity_id: Signal<Option<String>>,
    empty_message: String,
) -> Element {
    let selected = selected_entity_id.read().clone();

    rsx! {
        div { class: "panel entity-list",
            if entities.is_empty() {
                p { class: "empty", "{empty_message}" }
            }
            ul {
                for entity in entities.iter() {
                    {
                        let id = entity.id.clone();
                        let is_selected = selected.as_deref() == Some(id.as_str());
                        let place = place_line(entity, popup_location(entity, None));
                        rsx! {
                            li {
                                key: "{id}",
                                class: if is_selected { "entity-card selected" } else { "entity-card" },
                                onclick: move |_| {
                                    // Clicking the selected card again clears it
                                    let next = if is_selected { None } else { Some(id.clone()) };
                                    selected_entity_id.set(next);
                                },
                                h4 { "{entity.name}" }
                                if !place.is_empty() {
                                    p { "{place}" }
                                }
                                if entity.locations.len() > 1 {
                                    p { class: "muted", "{entity.locations.len()} locations" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
