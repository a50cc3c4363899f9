use serde::{Deserialize, Deserializer, Serialize};

use crate::geo;

pub type EntityId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Distributor,
    Clinic,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Distributor => write!(f, "distributor"),
            EntityKind::Clinic => write!(f, "clinic"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distributor" | "distributors" => Ok(EntityKind::Distributor),
            "clinic" | "clinics" => Ok(EntityKind::Clinic),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Lifecycle status as stored by the catalogue. Distributors are
/// published/unpublished, clinics go through a review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Published,
    Unpublished,
    Pending,
    Approved,
    Rejected,
}

impl EntityStatus {
    /// Whether entities in this status may be shown on the public map.
    pub fn is_public(self) -> bool {
        matches!(self, EntityStatus::Published | EntityStatus::Approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "location_lat", default)]
    pub lat: Option<f64>,
    #[serde(rename = "location_lng", default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Location {
    /// The usable coordinate of this location, if it has one.
    pub fn coordinate(&self) -> Option<LatLng> {
        geo::valid_coordinate(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub iso2: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub synonyms: Vec<String>,
}

/// A directory entry (distributor or clinic) as handed over by the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub kind: EntityKind,
    pub status: EntityStatus,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_region: Option<String>,
    #[serde(default, alias = "country_hq")]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    /// Single coordinate from before entities could own several locations.
    #[serde(rename = "location_lat", default)]
    pub legacy_lat: Option<f64>,
    #[serde(rename = "location_lng", default)]
    pub legacy_lng: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub locations: Vec<Location>,
    /// Countries a distributor serves.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub countries: Vec<Country>,
    /// Lower ranks are listed first within a country.
    #[serde(default)]
    pub priority_rank: i32,
}

impl GeoEntity {
    pub fn legacy_coordinate(&self) -> Option<LatLng> {
        geo::valid_coordinate(self.legacy_lat, self.legacy_lng)
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Index of a point within the point set an index was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

/// One plottable coordinate of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub entity_id: EntityId,
    pub location_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub is_primary: bool,
}

impl Point {
    pub fn coordinate(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub id: ClusterId,
    pub lat: f64,
    pub lng: f64,
    pub point_count: usize,
    pub child_point_ids: Vec<PointId>,
}

impl ClusterNode {
    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// What a viewport query hands to the render layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapFeature {
    Cluster(ClusterNode),
    Point { id: PointId, point: Point },
}

impl MapFeature {
    pub fn coordinate(&self) -> LatLng {
        match self {
            MapFeature::Cluster(c) => c.center(),
            MapFeature::Point { point, .. } => point.coordinate(),
        }
    }

    pub fn point_count(&self) -> usize {
        match self {
            MapFeature::Cluster(c) => c.point_count,
            MapFeature::Point { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

impl ViewState {
    pub const fn new(lat: f64, lng: f64, zoom: f64) -> Self {
        Self { lat, lng, zoom }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Geographic bounding box in degrees. `west > east` means the box crosses
/// the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    pub const WORLD: BBox = BBox {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    /// A marker click on the map.
    Internal,
    /// The surrounding list view.
    External,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_entity_id: Option<EntityId>,
    pub source_of_truth: Option<SelectionSource>,
}

impl SelectionState {
    pub fn new(id: &str, source: SelectionSource) -> Self {
        Self {
            selected_entity_id: Some(id.to_string()),
            source_of_truth: Some(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupState {
    pub entity_id: EntityId,
    pub location_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl PopupState {
    pub fn coordinate(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl From<&Point> for PopupState {
    fn from(p: &Point) -> Self {
        PopupState {
            entity_id: p.entity_id.clone(),
            location_id: p.location_id.clone(),
            lat: p.lat,
            lng: p.lng,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parses_catalogue_json() {
        let json = serde_json::json!({
            "id": "d-1",
            "name": "Acme Mobility",
            "status": "published",
            "country_hq": "US",
            "location_lat": 41.88,
            "location_lng": -87.63,
            "locations": [
                { "id": "l-1", "label": "HQ", "location_lat": 41.9, "location_lng": -87.6, "is_primary": true }
            ]
        });
        let entity: GeoEntity = serde_json::from_value(json).unwrap();
        assert_eq!(entity.kind, EntityKind::Distributor);
        assert_eq!(entity.country.as_deref(), Some("US"));
        assert_eq!(entity.locations.len(), 1);
        assert!(entity.locations[0].is_primary);
        assert_eq!(entity.legacy_coordinate(), Some(LatLng::new(41.88, -87.63)));
        assert!(entity.countries.is_empty());
        assert_eq!(entity.priority_rank, 0);
    }

    #[test]
    fn test_entity_parses_country_coverage() {
        let json = serde_json::json!({
            "id": "d-2",
            "name": "Nordic Rehab",
            "status": "published",
            "priority_rank": 3,
            "countries": [
                { "iso2": "SE", "name": "Sweden", "synonyms": null },
                { "iso2": "NO", "name": "Norway", "synonyms": ["Norge"] }
            ]
        });
        let entity: GeoEntity = serde_json::from_value(json).unwrap();
        assert_eq!(entity.priority_rank, 3);
        assert_eq!(entity.countries.len(), 2);
        assert!(entity.countries[0].synonyms.is_empty());
        assert_eq!(entity.countries[1].synonyms, vec!["Norge"]);
    }

    #[test]
    fn test_entity_null_locations_is_empty() {
        let json = serde_json::json!({
            "id": "c-1",
            "name": "Clinic",
            "kind": "clinic",
            "status": "approved",
            "location_lat": null,
            "locations": null
        });
        let entity: GeoEntity = serde_json::from_value(json).unwrap();
        assert!(entity.locations.is_empty());
        assert!(entity.legacy_coordinate().is_none());
    }

    #[test]
    fn test_public_statuses() {
        assert!(EntityStatus::Published.is_public());
        assert!(EntityStatus::Approved.is_public());
        assert!(!EntityStatus::Pending.is_public());
        assert!(!EntityStatus::Unpublished.is_public());
        assert!(!EntityStatus::Rejected.is_public());
    }

    #[test]
    fn test_entity_kind_from_str() {
        assert_eq!("clinics".parse::<EntityKind>(), Ok(EntityKind::Clinic));
        assert_eq!("Distributor".parse::<EntityKind>(), Ok(EntityKind::Distributor));
        assert!("warehouse".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_map_feature_tagged_serialization() {
        let feature = MapFeature::Point {
            id: PointId(3),
            point: Point {
                entity_id: "d-1".into(),
                location_id: None,
                lat: 1.0,
                lng: 2.0,
                is_primary: true,
            },
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "point");
        assert_eq!(json["point"]["entityId"], "d-1");
    }
}
