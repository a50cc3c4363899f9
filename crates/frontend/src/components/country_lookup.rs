use std::sync::Arc;

use dioxus::prelude::*;
use geodir_shared::coverage::{countries_covered, country_name, entities_for_country, match_countries};
use geodir_shared::models::GeoEntity;

/// Second line of a distributor row: city, then how many countries it serves.
pub fn coverage_line(entity: &GeoEntity) -> String {
    let n = entity.countries.len();
    let countries = if n == 1 { "country" } else { "countries" };
    match entity.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(city) => format!("{city}, {n} {countries}"),
        None => format!("{n} {countries}"),
    }
}

/// Look up distributors by the countries they serve. Picking one reports its
/// id through `on_select`.
#[component]
pub fn CountryLookup(entities: Arc<Vec<GeoEntity>>, on_select: EventHandler<String>) -> Element {
    let mut search = use_signal(String::new);
    let mut selected_country = use_signal(|| None::<String>);

    let countries = countries_covered(&entities);
    let query = search.read().clone();
    let selected = selected_country.read().clone();
    let matches = match_countries(&countries, &query);

    let body = match selected.clone() {
        Some(iso2) => {
            let name = country_name(&countries, &iso2).unwrap_or(iso2.as_str()).to_string();
            let serving = entities_for_country(&entities, &iso2);
            rsx! {
                div { class: "country-results",
                    h4 { "Distributors in {name}" }
                    span { class: "muted", "{serving.len()} found" }
                    if serving.is_empty() {
                        p { class: "empty", "No distributor listed yet for {name}." }
                    }
                    ul {
                        for entity in serving {
                            {
                                let id = entity.id.clone();
                                let line = coverage_line(entity);
                                rsx! {
                                    li {
                                        key: "{id}",
                                        class: "entity-card",
                                        onclick: move |_| on_select.call(id.clone()),
                                        h4 { "{entity.name}" }
                                        p { "{line}" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        None if query.is_empty() => rsx! {
            p { class: "muted", "Enter your country to find authorized distributors" }
        },
        None if matches.is_empty() => rsx! {
            p { class: "empty", "No countries found for “{query}”" }
        },
        None => rsx! {
            ul { class: "country-matches",
                for country in matches {
                    {
                        let iso2 = country.iso2.clone();
                        rsx! {
                            li {
                                key: "{iso2}",
                                class: "country-option",
                                onclick: move |_| {
                                    selected_country.set(Some(iso2.clone()));
                                    search.set(String::new());
                                },
                                span { "{country.name}" }
                                span { class: "muted", "{country.iso2}" }
                            }
                        }
                    }
                }
            }
        },
    };

    rsx! {
        div { class: "panel country-lookup",
            div { class: "country-search",
                input {
                    r#type: "search",
                    "aria-label": "Search by country",
                    placeholder: "Search by country…",
                    value: "{query}",
                    oninput: move |evt: Event<FormData>| search.set(evt.value()),
                }
                if !query.is_empty() || selected.is_some() {
                    button {
                        r#type: "button",
                        class: "secondary",
                        onclick: move |_| {
                            search.set(String::new());
                            selected_country.set(None);
                        },
                        "Clear"
                    }
                }
            }
            {body}
        }
    }
}
