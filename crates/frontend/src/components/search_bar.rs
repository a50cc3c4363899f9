use dioxus::prelude::*;

#[component]
pub fn SearchBar(
    placeholder: String,
    searching: bool,
    summary: Option<String>,
    on_search: EventHandler<String>,
) -> Element {
    let mut text = use_signal(String::new);

    rsx! {
        form {
            class: "panel search-bar",
            onsubmit: move |evt: Event<FormData>| {
                evt.prevent_default();
                on_search.call(text.read().trim().to_string());
            },
            input {
                r#type: "search",
                "aria-label": "Search",
                placeholder: "{placeholder}",
                value: "{text}",
                oninput: move |evt: Event<FormData>| text.set(evt.value()),
            }
            button { r#type: "submit", disabled: searching,
                if searching { "Searching…" } else { "Search" }
            }
            button {
                r#type: "button",
                class: "secondary",
                onclick: move |_| {
                    text.set(String::new());
                    on_search.call(String::new());
                },
                "Clear"
            }
            if let Some(summary) = summary {
                p { class: "search-summary", "{summary}" }
            }
        }
    }
}
