use geodir_shared::config::MapConfig;
use geodir_shared::models::{EntityKind, GeoEntity, LatLng, ViewState};
use geodir_shared::search::{SearchMode, SearchOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

fn origin() -> Result<String, String> {
    web_sys::window()
        .ok_or("no window")?
        .location()
        .origin()
        .map_err(|_| "no origin".to_string())
}

fn api_url() -> Result<String, String> {
    Ok(format!("{}/graphql", origin()?))
}

/// REST path for the entity list, optionally narrowed to one kind.
pub fn entities_path(kind: Option<EntityKind>) -> String {
    match kind {
        Some(kind) => format!("/entities?kind={kind}"),
        None => "/entities".to_string(),
    }
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };

    let resp = reqwest::Client::new()
        .post(api_url()?)
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;
    unwrap_response(gql_resp)
}

fn unwrap_response<T>(resp: GraphQLResponse<T>) -> Result<T, String> {
    if let Some(error) = resp.errors.as_ref().and_then(|e| e.first()) {
        return Err(error.message.clone());
    }
    resp.data.ok_or_else(|| "No data returned".to_string())
}

// Types mirroring the GraphQL schema

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLngData {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLngData> for LatLng {
    fn from(d: LatLngData) -> Self {
        LatLng::new(d.lat, d.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ViewData {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchModeData {
    All,
    Text,
    Radius,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub mode: SearchModeData,
    pub center: Option<LatLngData>,
    pub entity_ids: Vec<String>,
}

impl From<SearchData> for SearchOutcome {
    fn from(d: SearchData) -> Self {
        SearchOutcome {
            mode: match d.mode {
                SearchModeData::All => SearchMode::All,
                SearchModeData::Text => SearchMode::Text,
                SearchModeData::Radius => SearchMode::Radius,
            },
            center: d.center.map(LatLng::from),
            entity_ids: d.entity_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfigData {
    pub cluster_radius_px: f64,
    pub cluster_max_zoom: u8,
    pub view_min_zoom: f64,
    pub view_max_zoom: f64,
    pub home_view: ViewData,
    pub spin_start_view: ViewData,
    pub spin_duration_ms: u64,
    pub fly_duration_ms: u64,
    pub detail_zoom: f64,
    pub popup_offset_px: f64,
    pub search_zoom: f64,
}

impl MapConfigData {
    /// Server values layered over the local defaults.
    pub fn into_config(self) -> MapConfig {
        let view = |v: ViewData| ViewState::new(v.lat, v.lng, v.zoom);
        let mut config = MapConfig::default();
        config.cluster.radius_px = self.cluster_radius_px;
        config.cluster.max_zoom = self.cluster_max_zoom;
        config.view_min_zoom = self.view_min_zoom;
        config.view_max_zoom = self.view_max_zoom;
        config.home_view = view(self.home_view);
        config.spin_start_view = view(self.spin_start_view);
        config.spin_duration_ms = self.spin_duration_ms;
        config.fly_duration_ms = self.fly_duration_ms;
        config.detail_zoom = self.detail_zoom;
        config.popup_offset_px = self.popup_offset_px;
        config.search_zoom = self.search_zoom;
        config
    }
}

fn kind_variable(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Distributor => "DISTRIBUTOR",
        EntityKind::Clinic => "CLINIC",
    }
}

// API functions

pub async fn fetch_entities(kind: EntityKind) -> Result<Vec<GeoEntity>, String> {
    let url = format!("{}{}", origin()?, entities_path(Some(kind)));
    let resp = reqwest::get(url).await.map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("entity list failed: {}", resp.status()));
    }
    resp.json().await.map_err(|e| e.to_string())
}

#[derive(Deserialize)]
pub struct SearchResponse {
    pub search: SearchData,
}

pub async fn search(query_text: &str, kind: EntityKind) -> Result<SearchOutcome, String> {
    let variables = serde_json::json!({ "query": query_text, "kind": kind_variable(kind) });
    let resp: SearchResponse = query(
        r#"query Search($query: String!, $kind: EntityKind) {
            search(query: $query, kind: $kind) { mode center { lat lng } entityIds }
        }"#,
        Some(variables),
    )
    .await?;
    Ok(resp.search.into())
}

#[derive(Deserialize)]
pub struct ConfigResponse {
    pub config: MapConfigData,
}

pub async fn fetch_config() -> Result<MapConfig, String> {
    let resp: ConfigResponse = query(
        r#"query {
            config {
                clusterRadiusPx clusterMaxZoom viewMinZoom viewMaxZoom
                homeView { lat lng zoom } spinStartView { lat lng zoom }
                spinDurationMs flyDurationMs detailZoom popupOffsetPx searchZoom
            }
        }"#,
        None,
    )
    .await?;
    Ok(resp.config.into_config())
}
