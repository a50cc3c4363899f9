use crate::models::{GeoEntity, Point};

/// Points contributed by one entity: one per location with a usable
/// coordinate, or the legacy coordinate when the entity has no locations.
pub fn entity_points(entity: &GeoEntity) -> Vec<Point> {
    if !entity.locations.is_empty() {
        return entity
            .locations
            .iter()
            .filter_map(|loc| {
                let c = loc.coordinate()?;
                Some(Point {
                    entity_id: entity.id.clone(),
                    location_id: Some(loc.id.clone()),
                    lat: c.lat,
                    lng: c.lng,
                    is_primary: loc.is_primary,
                })
            })
            .collect();
    }

    entity
        .legacy_coordinate()
        .map(|c| Point {
            entity_id: entity.id.clone(),
            location_id: None,
            lat: c.lat,
            lng: c.lng,
            is_primary: true,
        })
        .into_iter()
        .collect()
}

/// Flatten entities into the point set, preserving input order.
pub fn extract_points(entities: &[GeoEntity]) -> Vec<Point> {
    entities.iter().flat_map(entity_points).collect()
}

/// The point used when an entity is selected from outside the map:
/// primary location, then first location, then the legacy coordinate.
pub fn representative_point(entity: &GeoEntity) -> Option<Point> {
    let located = |loc: &crate::models::Location| {
        loc.coordinate().map(|c| Point {
            entity_id: entity.id.clone(),
            location_id: Some(loc.id.clone()),
            lat: c.lat,
            lng: c.lng,
            is_primary: loc.is_primary,
        })
    };

    entity
        .locations
        .iter()
        .filter(|l| l.is_primary)
        .find_map(located)
        .or_else(|| entity.locations.iter().find_map(located))
        .or_else(|| {
            entity.legacy_coordinate().map(|c| Point {
                entity_id: entity.id.clone(),
                location_id: None,
                lat: c.lat,
                lng: c.lng,
                is_primary: true,
            })
        })
}
