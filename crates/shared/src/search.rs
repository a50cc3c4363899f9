//! Proximity search: query classification, radius filter and text fallback.
//!
//! Geocoding itself is I/O and lives with the caller; this module only
//! decides whether a query should be geocoded and filters entities once the
//! outcome is known.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::geo::haversine_miles;
use crate::models::{EntityId, GeoEntity, LatLng};

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid postal code regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Empty,
    /// Name or place words; matched as substrings, never geocoded.
    Text(String),
    /// Worth geocoding. `postal` queries are sent without a type restriction.
    Geocode { query: String, postal: bool },
}

impl QueryKind {
    pub fn classify(raw: &str) -> Self {
        let query = raw.trim();
        if query.is_empty() {
            return QueryKind::Empty;
        }
        if POSTAL_CODE.is_match(query) {
            return QueryKind::Geocode {
                query: query.to_string(),
                postal: true,
            };
        }
        if query.chars().any(|c| c.is_ascii_digit() || c == ',') {
            return QueryKind::Geocode {
                query: query.to_string(),
                postal: false,
            };
        }
        QueryKind::Text(query.to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            QueryKind::Empty => "",
            QueryKind::Text(q) => q,
            QueryKind::Geocode { query, .. } => query,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    All,
    Text,
    Radius,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub mode: SearchMode,
    /// Geocoded center; the camera flies here when set.
    pub center: Option<LatLng>,
    pub entity_ids: Vec<EntityId>,
}

/// Every usable coordinate of an entity, legacy coordinate included.
pub fn entity_coordinates(entity: &GeoEntity) -> Vec<LatLng> {
    entity
        .locations
        .iter()
        .filter_map(|l| l.coordinate())
        .chain(entity.legacy_coordinate())
        .collect()
}

pub fn within_radius(entity: &GeoEntity, center: LatLng, radius_miles: f64) -> bool {
    entity_coordinates(entity)
        .into_iter()
        .any(|c| haversine_miles(center, c) <= radius_miles)
}

/// Case-insensitive substring match over name and address fields.
pub fn matches_text(entity: &GeoEntity, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let hit = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(&needle))
    };

    entity.name.to_lowercase().contains(&needle)
        || hit(&entity.city)
        || hit(&entity.state_region)
        || hit(&entity.country)
        || hit(&entity.postal_code)
        || entity.locations.iter().any(|l| {
            hit(&l.city) || hit(&l.state_region) || hit(&l.country) || hit(&l.postal_code)
        })
}

pub fn filter_text<'a>(entities: &'a [GeoEntity], query: &str) -> Vec<&'a GeoEntity> {
    entities.iter().filter(|e| matches_text(e, query)).collect()
}

/// Decide the result set once the geocode outcome (if any) is known. A
/// geocode candidate that did not resolve falls back to the text filter.
pub fn resolve_search(
    entities: &[GeoEntity],
    kind: &QueryKind,
    geocoded: Option<LatLng>,
    config: &SearchConfig,
) -> SearchOutcome {
    let ids = |it: Vec<&GeoEntity>| -> Vec<EntityId> { it.into_iter().map(|e| e.id.clone()).collect() };

    match (kind, geocoded) {
        (QueryKind::Empty, _) => SearchOutcome {
            mode: SearchMode::All,
            center: None,
            entity_ids: ids(entities.iter().collect()),
        },
        (QueryKind::Geocode { .. }, Some(center)) => SearchOutcome {
            mode: SearchMode::Radius,
            center: Some(center),
            entity_ids: ids(entities
                .iter()
                .filter(|e| within_radius(e, center, config.radius_miles))
                .collect()),
        },
        (kind, _) => SearchOutcome {
            mode: SearchMode::Text,
            center: None,
            entity_ids: ids(filter_text(entities, kind.text())),
        },
    }
}
