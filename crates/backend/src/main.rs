mod api;
mod config;
mod geocode;
mod graphql;
mod search;
mod seed;
mod storage;

use std::path::Path;
use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::FromRef;
use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use geodir_shared::config::MapConfig;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use geocode::{Geocoder, MapboxGeocoder};
use graphql::Schema;
use search::ProximitySearch;
use storage::Storage;

#[derive(Clone)]
struct AppState {
    schema: Schema,
    storage: Arc<Storage>,
}

impl FromRef<AppState> for Schema {
    fn from_ref(state: &AppState) -> Self {
        state.schema.clone()
    }
}

impl FromRef<AppState> for Arc<Storage> {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build the full application router.
fn build_app(state: AppState) -> Router {
    // Static file routers are stateless, merge them before adding app state
    let static_files = Router::new()
        .nest(
            "/static",
            cached_static_router(Path::new("assets"), CACHE_1DAY),
        )
        .nest(
            "/dist",
            cached_static_router(Path::new("dist"), CACHE_IMMUTABLE),
        )
        .nest(
            "/assets",
            cached_static_router(Path::new("dist/assets"), CACHE_IMMUTABLE),
        );

    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/entities", get(api::list_entities))
        .route("/entities/by-country/{iso2}", get(api::entities_by_country))
        .route("/", get(serve_index))
        .route("/clinics", get(serve_index))
        .with_state(state)
        .merge(static_files)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let storage = Storage::open(&config.db_path)?;
    if let Some(seed_path) = &config.seed_path {
        seed::import(seed_path, &storage)?;
    }
    tracing::info!(entities = storage.count()?, "Entity catalogue ready");

    let geocoder: Option<Arc<dyn Geocoder>> = match &config.mapbox_token {
        Some(token) => Some(Arc::new(MapboxGeocoder::new(
            &config.geocoder_url,
            token.clone(),
            config.search.country.clone(),
            config.geocode_timeout,
        )?)),
        None => {
            tracing::warn!("MAPBOX_TOKEN not set, search falls back to text matching");
            None
        }
    };
    let search = ProximitySearch::new(geocoder, config.search.clone());

    let schema = graphql::build_schema(storage.clone(), search, MapConfig::default());
    let app = build_app(AppState { schema, storage });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(port = config.port, "Server running at http://localhost:{}", config.port);
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_index() -> Html<String> {
    // Try to serve the built frontend, fall back to a simple message
    match std::fs::read_to_string("dist/index.html") {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>Directory Map</title></head>
<body>
<h1>Directory Map</h1>
<p>Frontend not built yet. Visit <a href="/graphql">GraphiQL</a> to explore the API.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use geodir_shared::config::SearchConfig;
    use geodir_shared::models::GeoEntity;
    use tower::ServiceExt;

    /// Build a test app that serves files from the given temp directories.
    fn test_static_app(assets_dir: &Path, dist_dir: &Path) -> Router {
        Router::new()
            .nest("/static", cached_static_router(assets_dir, CACHE_1DAY))
            .nest("/dist", cached_static_router(dist_dir, CACHE_IMMUTABLE))
    }

    /// Create a temp dir with a test file and return the dir path.
    fn temp_dir_with_file(file_name: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(file_name), content).unwrap();
        dir
    }

    fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("db.redb")).unwrap();
        let entities: Vec<GeoEntity> = serde_json::from_value(serde_json::json!([
            { "id": "d-1", "name": "Acme Supply", "status": "published", "location_lat": 41.88, "location_lng": -87.63,
              "countries": [ { "iso2": "MX", "name": "Mexico" } ] },
            { "id": "d-2", "name": "Gone Supply", "status": "unpublished", "location_lat": 40.0, "location_lng": -75.0,
              "countries": [ { "iso2": "MX", "name": "Mexico" } ] },
            { "id": "c-1", "name": "Bayside Clinic", "kind": "clinic", "status": "approved", "locations": [
                { "id": "c-1-a", "location_lat": 37.77, "location_lng": -122.42, "is_primary": true }
            ] }
        ]))
        .unwrap();
        storage.replace_all(&entities).unwrap();

        let search = ProximitySearch::new(None, SearchConfig::default());
        let schema = graphql::build_schema(storage.clone(), search, MapConfig::default());
        (dir, build_app(AppState { schema, storage }))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_entities_endpoint_lists_public_entities() {
        let (_dir, app) = test_app();
        let (status, body) = get_json(app, "/entities").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Acme Supply", "Bayside Clinic"]);
    }

    #[tokio::test]
    async fn test_entities_endpoint_filters_by_kind() {
        let (_dir, app) = test_app();
        let (status, body) = get_json(app, "/entities?kind=clinics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "c-1");
        assert_eq!(body[0]["locations"][0]["location_lat"], 37.77);
    }

    #[tokio::test]
    async fn test_entities_endpoint_rejects_unknown_kind() {
        let (_dir, app) = test_app();
        let (status, body) = get_json(app, "/entities?kind=warehouse").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("warehouse"));
    }

    #[tokio::test]
    async fn test_by_country_endpoint() {
        let (_dir, app) = test_app();
        let (status, body) = get_json(app.clone(), "/entities/by-country/mx").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body.as_array().unwrap().iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["d-1"]);

        let (status, body) = get_json(app.clone(), "/entities/by-country/BR").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, _) = get_json(app, "/entities/by-country/mexico").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_graphql_endpoint() {
        let (_dir, app) = test_app();
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"query":"{ clusters(zoom: 3) { featureType entityId } }"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["clusters"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_static_assets_have_1day_cache() {
        let assets_dir = temp_dir_with_file("seed.json", "[]");
        let dist_dir = temp_dir_with_file("index.html", "<html></html>");

        let app = test_static_app(assets_dir.path(), dist_dir.path());

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/static/seed.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=86400, must-revalidate"
        );
    }

    #[tokio::test]
    async fn test_dist_bundles_have_immutable_cache() {
        let assets_dir = temp_dir_with_file("seed.json", "[]");
        let dist_dir = temp_dir_with_file("app-abc123.js", "bundle()");

        let app = test_static_app(assets_dir.path(), dist_dir.path());

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/dist/app-abc123.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn test_missing_static_file_returns_404() {
        let assets_dir = temp_dir_with_file("seed.json", "[]");
        let dist_dir = temp_dir_with_file("index.html", "<html></html>");

        let app = test_static_app(assets_dir.path(), dist_dir.path());

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/static/nonexistent.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
