use std::time::Duration;

use async_trait::async_trait;
use geodir_shared::geo::valid_coordinate;
use geodir_shared::models::LatLng;
use reqwest::Url;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder did not answer within {0:?}")]
    Timeout(Duration),
    #[error("invalid geocoder url: {0}")]
    InvalidUrl(String),
}

/// Resolves a free-text query to a single coordinate. `Ok(None)` is a soft
/// "not found".
#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    async fn geocode(&self, query: &str, postal: bool) -> Result<Option<LatLng>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    /// `[lng, lat]`
    center: Option<[f64; 2]>,
}

/// Mapbox places geocoder, top result only.
pub struct MapboxGeocoder {
    client: reqwest::Client,
    base: Url,
    token: String,
    country: Option<String>,
    timeout: Duration,
}

impl MapboxGeocoder {
    pub fn new(
        base_url: &str,
        token: String,
        country: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let base = Url::parse(base_url).map_err(|e| GeocodeError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GeocodeError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            token,
            country,
            timeout,
        })
    }

    fn request_url(&self, query: &str, postal: bool) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{query}.json"));
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", &self.token);
            if let Some(country) = &self.country {
                pairs.append_pair("country", country);
            }
            if !postal {
                pairs.append_pair("types", "address,place,postcode");
            }
            pairs.append_pair("limit", "1");
        }
        url
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn geocode(&self, query: &str, postal: bool) -> Result<Option<LatLng>, GeocodeError> {
        let url = self.request_url(query, postal);
        let request = async {
            self.client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .json::<PlacesResponse>()
                .await
        };

        let body = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| GeocodeError::Timeout(self.timeout))??;

        Ok(body
            .features
            .first()
            .and_then(|f| f.center)
            .and_then(|[lng, lat]| valid_coordinate(Some(lat), Some(lng))))
    }
}
