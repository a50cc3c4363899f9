use std::sync::Arc;

use dioxus::prelude::*;
use geodir_shared::config::MapConfig;
use geodir_shared::models::{EntityKind, GeoEntity, LatLng};
use geodir_shared::search::{SearchMode, SearchOutcome};

use crate::api;
use crate::components::country_lookup::CountryLookup;
use crate::components::directory_map::DirectoryMap;
use crate::components::entity_list::EntityList;
use crate::components::search_bar::SearchBar;

/// Entities to show for a search outcome, in catalogue order. No outcome
/// (or an empty query) shows everything.
pub fn visible_entities(all: &[GeoEntity], outcome: Option<&SearchOutcome>) -> Vec<GeoEntity> {
    match outcome {
        Some(o) if o.mode != SearchMode::All => all
            .iter()
            .filter(|e| o.entity_ids.contains(&e.id))
            .cloned()
            .collect(),
        _ => all.to_vec(),
    }
}

pub fn search_summary(outcome: &SearchOutcome, query: &str, noun: &str) -> Option<String> {
    let n = outcome.entity_ids.len();
    let noun = if n == 1 { noun.trim_end_matches('s') } else { noun };
    match outcome.mode {
        SearchMode::All => None,
        SearchMode::Radius => Some(format!("{n} {noun} near \u{201c}{query}\u{201d}")),
        SearchMode::Text => Some(format!("{n} {noun} matching \u{201c}{query}\u{201d}")),
    }
}

fn labels(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Distributor => ("Find a Distributor", "distributors"),
        EntityKind::Clinic => ("Find a Clinic", "clinics"),
    }
}

#[component]
pub fn Finder(kind: EntityKind) -> Element {
    // Data resources
    let config_resource = use_resource(api::fetch_config);
    let entities_resource = use_resource(move || api::fetch_entities(kind));

    // UI state signals
    let mut selected_entity_id = use_signal(|| None::<String>);
    let mut outcome = use_signal(|| None::<SearchOutcome>);
    let mut last_query = use_signal(String::new);
    let mut fly_to = use_signal(|| None::<LatLng>);
    let mut searching = use_signal(|| false);
    let mut search_error = use_signal(|| None::<String>);

    let all_entities = use_memo(move || match &*entities_resource.read() {
        Some(Ok(list)) => Arc::new(list.clone()),
        _ => Arc::new(Vec::new()),
    });
    let visible = use_memo(move || {
        Arc::new(visible_entities(&all_entities.read(), outcome.read().as_ref()))
    });

    let (title, noun) = labels(kind);
    let load_error = match &*entities_resource.read() {
        Some(Err(e)) => Some(e.clone()),
        _ => None,
    };
    let summary = outcome
        .read()
        .as_ref()
        .and_then(|o| search_summary(o, &last_query.read(), noun));
    let config: Option<MapConfig> = match &*config_resource.read() {
        Some(Ok(c)) => Some(c.clone()),
        Some(Err(_)) => Some(MapConfig::default()),
        None => None,
    };

    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "{title}" }
            }

            div { class: "sidebar",
                SearchBar {
                    placeholder: "City, state or ZIP code",
                    searching: *searching.read(),
                    summary,
                    on_search: move |query: String| {
                        spawn(async move {
                            searching.set(true);
                            search_error.set(None);
                            match api::search(&query, kind).await {
                                Ok(result) => {
                                    fly_to.set(result.center);
                                    outcome.set(Some(result));
                                    last_query.set(query);
                                }
                                Err(e) => search_error.set(Some(e)),
                            }
                            searching.set(false);
                        });
                    },
                }
                if let Some(e) = search_error.read().as_ref() {
                    p { class: "error", "Search failed: {e}" }
                }
                if let Some(e) = load_error {
                    p { class: "error", "Could not load {noun}: {e}" }
                }
                if kind == EntityKind::Distributor {
                    CountryLookup {
                        entities: all_entities(),
                        on_select: move |id: String| {
                            // The pick may be hidden by an earlier search
                            outcome.set(None);
                            fly_to.set(None);
                            selected_entity_id.set(Some(id));
                        },
                    }
                }
                EntityList {
                    entities: visible(),
                    selected_entity_id,
                    empty_message: format!("No {noun} found."),
                }
            }

            div { class: "main-area",
                if let Some(config) = config {
                    DirectoryMap {
                        config,
                        entities: visible(),
                        selected_entity_id: selected_entity_id.read().clone(),
                        fly_to_location: *fly_to.read(),
                        on_select: move |entity: Option<GeoEntity>| {
                            selected_entity_id.set(entity.map(|e| e.id));
                        },
                    }
                } else {
                    div { class: "map-loading", "Loading map…" }
                }
            }
        }
    }
}
