use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use geodir_shared::coverage::entities_for_country;
use geodir_shared::models::{EntityKind, GeoEntity};
use serde::Deserialize;

use crate::storage::{Storage, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Entity catalogue read failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct EntitiesParams {
    pub kind: Option<String>,
}

/// `GET /entities[?kind=distributor|clinic]`
pub async fn list_entities(
    State(storage): State<Arc<Storage>>,
    Query(params): Query<EntitiesParams>,
) -> Result<Json<Vec<GeoEntity>>, ApiError> {
    let kind = params
        .kind
        .as_deref()
        .map(str::parse::<EntityKind>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    Ok(Json(storage.public_entities(kind)?))
}

/// `GET /entities/by-country/{iso2}`: public distributors covering a
/// country, in priority order.
pub async fn entities_by_country(
    State(storage): State<Arc<Storage>>,
    Path(iso2): Path<String>,
) -> Result<Json<Vec<GeoEntity>>, ApiError> {
    if iso2.len() != 2 || !iso2.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::BadRequest(format!("invalid country code: {iso2}")));
    }
    let distributors = storage.public_entities(Some(EntityKind::Distributor))?;
    Ok(Json(
        entities_for_country(&distributors, &iso2)
            .into_iter()
            .cloned()
            .collect(),
    ))
}
