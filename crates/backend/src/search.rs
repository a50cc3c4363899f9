use std::sync::Arc;

use geodir_shared::config::SearchConfig;
use geodir_shared::models::GeoEntity;
use geodir_shared::search::{resolve_search, QueryKind, SearchOutcome};

use crate::geocode::Geocoder;

/// Free-text proximity search over a set of entities. Geocoder failures are
/// logged and degrade to the text filter.
#[derive(Clone)]
pub struct ProximitySearch {
    geocoder: Option<Arc<dyn Geocoder>>,
    config: SearchConfig,
}

impl ProximitySearch {
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>, config: SearchConfig) -> Self {
        Self { geocoder, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub async fn run(&self, query: &str, entities: &[GeoEntity]) -> SearchOutcome {
        let kind = QueryKind::classify(query);

        let center = match (&kind, &self.geocoder) {
            (QueryKind::Geocode { query, postal }, Some(geocoder)) => {
                match geocoder.geocode(query, *postal).await {
                    Ok(Some(center)) => Some(center),
                    Ok(None) => {
                        tracing::info!(query = %query, "Geocoder found nothing");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(query = %query, error = %e, "Geocoding failed");
                        None
                    }
                }
            }
            (QueryKind::Geocode { .. }, None) => {
                tracing::debug!("No geocoder configured, using text search");
                None
            }
            _ => None,
        };

        let outcome = resolve_search(entities, &kind, center, &self.config);
        tracing::debug!(
            mode = ?outcome.mode,
            matches = outcome.entity_ids.len(),
            "Search resolved"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use geodir_shared::models::{EntityKind, EntityStatus, LatLng};
    use geodir_shared::search::SearchMode;

    use crate::geocode::GeocodeError;

    /// Answers from a fixed script and records what it was asked.
    struct ScriptedGeocoder {
        answer: fn() -> Result<Option<LatLng>, GeocodeError>,
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl ScriptedGeocoder {
        fn new(answer: fn() -> Result<Option<LatLng>, GeocodeError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn geocode(&self, query: &str, postal: bool) -> Result<Option<LatLng>, GeocodeError> {
            self.calls.lock().unwrap().push((query.to_string(), postal));
            (self.answer)()
        }
    }

    fn entity(id: &str, name: &str, lat: f64, lng: f64, postal: &str) -> GeoEntity {
        GeoEntity {
            id: id.to_string(),
            name: name.to_string(),
            kind: EntityKind::Distributor,
            status: EntityStatus::Published,
            city: None,
            state_region: None,
            country: None,
            postal_code: Some(postal.to_string()),
            legacy_lat: Some(lat),
            legacy_lng: Some(lng),
            locations: Vec::new(),
            countries: Vec::new(),
            priority_rank: 0,
        }
    }

    fn catalogue() -> Vec<GeoEntity> {
        vec![
            entity("chi", "Loop Supply", 41.88, -87.63, "60601"),
            entity("mil", "Brew City Medical", 43.04, -87.91, "53202"),
            entity("aus", "Hill Country Rehab", 30.27, -97.74, "78701"),
        ]
    }

    #[tokio::test]
    async fn test_geocoded_query_filters_by_radius() {
        let geocoder = ScriptedGeocoder::new(|| Ok(Some(LatLng::new(41.88, -87.63))));
        let search = ProximitySearch::new(Some(geocoder.clone()), SearchConfig::default());

        let out = search.run("60601", &catalogue()).await;
        assert_eq!(out.mode, SearchMode::Radius);
        assert_eq!(out.center, Some(LatLng::new(41.88, -87.63)));
        assert_eq!(out.entity_ids, vec!["chi", "mil"]);
        assert_eq!(
            geocoder.calls.lock().unwrap().as_slice(),
            &[("60601".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_text_query_skips_geocoder() {
        let geocoder = ScriptedGeocoder::new(|| Ok(Some(LatLng::new(0.5, 0.5))));
        let search = ProximitySearch::new(Some(geocoder.clone()), SearchConfig::default());

        let out = search.run("rehab", &catalogue()).await;
        assert_eq!(out.mode, SearchMode::Text);
        assert_eq!(out.entity_ids, vec!["aus"]);
        assert!(geocoder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_geocoder_error_falls_back_to_text() {
        let geocoder =
            ScriptedGeocoder::new(|| Err(GeocodeError::Timeout(std::time::Duration::from_secs(5))));
        let search = ProximitySearch::new(Some(geocoder), SearchConfig::default());

        let out = search.run("78701", &catalogue()).await;
        assert_eq!(out.mode, SearchMode::Text);
        assert!(out.center.is_none());
        assert_eq!(out.entity_ids, vec!["aus"]);
    }

    #[tokio::test]
    async fn test_not_found_falls_back_to_text() {
        let geocoder = ScriptedGeocoder::new(|| Ok(None));
        let search = ProximitySearch::new(Some(geocoder), SearchConfig::default());

        let out = search.run("Springfield, ZZ", &catalogue()).await;
        assert_eq!(out.mode, SearchMode::Text);
        assert!(out.entity_ids.is_empty());
    }

    #[tokio::test]
    async fn test_without_geocoder_uses_text() {
        let search = ProximitySearch::new(None, SearchConfig::default());
        let out = search.run("53202", &catalogue()).await;
        assert_eq!(out.mode, SearchMode::Text);
        assert_eq!(out.entity_ids, vec!["mil"]);
    }

    #[tokio::test]
    async fn test_custom_radius() {
        let geocoder = ScriptedGeocoder::new(|| Ok(Some(LatLng::new(41.88, -87.63))));
        let config = SearchConfig {
            radius_miles: 10.0,
            ..SearchConfig::default()
        };
        let search = ProximitySearch::new(Some(geocoder), config);
        let out = search.run("60601", &catalogue()).await;
        assert_eq!(out.entity_ids, vec!["chi"]);
    }
}
