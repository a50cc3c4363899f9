mod api;
mod components;
mod coords;
mod pages;

use dioxus::prelude::*;
use geodir_shared::models::EntityKind;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Distributors {},
    #[route("/clinics")]
    Clinics {},
}

#[component]
fn Distributors() -> Element {
    rsx! {
        pages::finder::Finder { kind: EntityKind::Distributor }
    }
}

#[component]
fn Clinics() -> Element {
    rsx! {
        pages::finder::Finder { kind: EntityKind::Clinic }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
