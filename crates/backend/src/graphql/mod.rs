use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Object, SimpleObject, ID};
use geodir_shared::{
    cluster::{ClusterIndex, SpatialIndex},
    config::MapConfig,
    coverage::{countries_covered, entities_for_country},
    extract::extract_points,
    models::{self, BBox, ClusterId, EntityKind, MapFeature},
    search::SearchMode,
};

use crate::search::ProximitySearch;
use crate::storage::Storage;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
#[graphql(name = "EntityKind")]
pub enum GqlEntityKind {
    Distributor,
    Clinic,
}

impl From<EntityKind> for GqlEntityKind {
    fn from(k: EntityKind) -> Self {
        match k {
            EntityKind::Distributor => GqlEntityKind::Distributor,
            EntityKind::Clinic => GqlEntityKind::Clinic,
        }
    }
}

impl From<GqlEntityKind> for EntityKind {
    fn from(k: GqlEntityKind) -> Self {
        match k {
            GqlEntityKind::Distributor => EntityKind::Distributor,
            GqlEntityKind::Clinic => EntityKind::Clinic,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
#[graphql(name = "SearchMode")]
pub enum GqlSearchMode {
    All,
    Text,
    Radius,
}

impl From<SearchMode> for GqlSearchMode {
    fn from(m: SearchMode) -> Self {
        match m {
            SearchMode::All => GqlSearchMode::All,
            SearchMode::Text => GqlSearchMode::Text,
            SearchMode::Radius => GqlSearchMode::Radius,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
#[graphql(name = "FeatureType")]
pub enum GqlFeatureType {
    Cluster,
    Point,
}

// GraphQL output types

#[derive(SimpleObject, Clone, Copy)]
#[graphql(name = "LatLng")]
pub struct GqlLatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<models::LatLng> for GqlLatLng {
    fn from(c: models::LatLng) -> Self {
        GqlLatLng { lat: c.lat, lng: c.lng }
    }
}

#[derive(SimpleObject, Clone, Copy)]
#[graphql(name = "ViewState")]
pub struct GqlViewState {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

impl From<models::ViewState> for GqlViewState {
    fn from(v: models::ViewState) -> Self {
        GqlViewState {
            lat: v.lat,
            lng: v.lng,
            zoom: v.zoom,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Location")]
pub struct GqlLocation {
    pub id: ID,
    pub label: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub is_primary: bool,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(SimpleObject)]
#[graphql(name = "Country")]
pub struct GqlCountry {
    pub iso2: String,
    pub name: String,
    pub synonyms: Vec<String>,
}

impl From<models::Country> for GqlCountry {
    fn from(c: models::Country) -> Self {
        GqlCountry {
            iso2: c.iso2,
            name: c.name,
            synonyms: c.synonyms,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Entity")]
pub struct GqlEntity {
    pub id: ID,
    pub name: String,
    pub kind: GqlEntityKind,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub locations: Vec<GqlLocation>,
    pub countries: Vec<GqlCountry>,
    pub priority_rank: i32,
}

impl From<models::GeoEntity> for GqlEntity {
    fn from(e: models::GeoEntity) -> Self {
        GqlEntity {
            id: ID(e.id),
            name: e.name,
            kind: e.kind.into(),
            city: e.city,
            state_region: e.state_region,
            country: e.country,
            postal_code: e.postal_code,
            lat: e.legacy_lat,
            lng: e.legacy_lng,
            locations: e
                .locations
                .into_iter()
                .map(|l| GqlLocation {
                    id: ID(l.id),
                    label: l.label,
                    lat: l.lat,
                    lng: l.lng,
                    is_primary: l.is_primary,
                    city: l.city,
                    state_region: l.state_region,
                    country: l.country,
                    postal_code: l.postal_code,
                })
                .collect(),
            countries: e.countries.into_iter().map(GqlCountry::from).collect(),
            priority_rank: e.priority_rank,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Feature")]
pub struct GqlFeature {
    pub feature_type: GqlFeatureType,
    pub lat: f64,
    pub lng: f64,
    pub point_count: u64,
    pub cluster_id: Option<u32>,
    pub point_id: Option<u32>,
    pub entity_id: Option<ID>,
    pub location_id: Option<String>,
    pub child_point_ids: Vec<u32>,
}

impl From<MapFeature> for GqlFeature {
    fn from(f: MapFeature) -> Self {
        match f {
            MapFeature::Cluster(c) => GqlFeature {
                feature_type: GqlFeatureType::Cluster,
                lat: c.lat,
                lng: c.lng,
                point_count: c.point_count as u64,
                cluster_id: Some(c.id.0),
                point_id: None,
                entity_id: None,
                location_id: None,
                child_point_ids: c.child_point_ids.into_iter().map(|p| p.0).collect(),
            },
            MapFeature::Point { id, point } => GqlFeature {
                feature_type: GqlFeatureType::Point,
                lat: point.lat,
                lng: point.lng,
                point_count: 1,
                cluster_id: None,
                point_id: Some(id.0),
                entity_id: Some(ID(point.entity_id)),
                location_id: point.location_id,
                child_point_ids: Vec::new(),
            },
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "SearchOutcome")]
pub struct GqlSearchOutcome {
    pub mode: GqlSearchMode,
    pub center: Option<GqlLatLng>,
    pub entity_ids: Vec<ID>,
}

#[derive(SimpleObject)]
#[graphql(name = "MapConfig")]
pub struct GqlMapConfig {
    pub cluster_radius_px: f64,
    pub cluster_max_zoom: u32,
    pub view_min_zoom: f64,
    pub view_max_zoom: f64,
    pub home_view: GqlViewState,
    pub spin_start_view: GqlViewState,
    pub spin_duration_ms: u64,
    pub fly_duration_ms: u64,
    pub detail_zoom: f64,
    pub popup_offset_px: f64,
    pub search_zoom: f64,
    pub search_radius_miles: f64,
}

// Input types

#[derive(InputObject)]
pub struct BBoxInput {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<BBoxInput> for BBox {
    fn from(b: BBoxInput) -> Self {
        BBox::new(b.west, b.south, b.east, b.north)
    }
}

fn public_entities(
    ctx: &Context<'_>,
    kind: Option<GqlEntityKind>,
) -> async_graphql::Result<Vec<models::GeoEntity>> {
    let storage = ctx.data::<Arc<Storage>>()?;
    Ok(storage.public_entities(kind.map(Into::into))?)
}

fn cluster_index(
    ctx: &Context<'_>,
    kind: Option<GqlEntityKind>,
) -> async_graphql::Result<ClusterIndex> {
    let config = ctx.data::<MapConfig>()?;
    let entities = public_entities(ctx, kind)?;
    Ok(ClusterIndex::build(&extract_points(&entities), &config.cluster))
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Publicly visible entities, ordered by name.
    async fn entities(
        &self,
        ctx: &Context<'_>,
        kind: Option<GqlEntityKind>,
    ) -> async_graphql::Result<Vec<GqlEntity>> {
        Ok(public_entities(ctx, kind)?
            .into_iter()
            .map(GqlEntity::from)
            .collect())
    }

    async fn entity(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<GqlEntity>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        Ok(storage.public_entity(&id)?.map(GqlEntity::from))
    }

    /// Countries served by at least one public distributor, ordered by name.
    async fn countries(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlCountry>> {
        let distributors = public_entities(ctx, Some(GqlEntityKind::Distributor))?;
        Ok(countries_covered(&distributors)
            .into_iter()
            .map(GqlCountry::from)
            .collect())
    }

    /// Public distributors covering a country, in priority order.
    async fn entities_by_country(
        &self,
        ctx: &Context<'_>,
        iso2: String,
    ) -> async_graphql::Result<Vec<GqlEntity>> {
        let distributors = public_entities(ctx, Some(GqlEntityKind::Distributor))?;
        Ok(entities_for_country(&distributors, &iso2)
            .into_iter()
            .cloned()
            .map(GqlEntity::from)
            .collect())
    }

    /// Clusters and standalone points inside `bbox` (whole world if omitted).
    async fn clusters(
        &self,
        ctx: &Context<'_>,
        bbox: Option<BBoxInput>,
        zoom: f64,
        kind: Option<GqlEntityKind>,
    ) -> async_graphql::Result<Vec<GqlFeature>> {
        let index = cluster_index(ctx, kind)?;
        let bbox = bbox.map(BBox::from).unwrap_or(BBox::WORLD);
        Ok(index
            .query(&bbox, zoom)
            .into_iter()
            .map(GqlFeature::from)
            .collect())
    }

    async fn expansion_zoom(
        &self,
        ctx: &Context<'_>,
        cluster_id: u32,
        kind: Option<GqlEntityKind>,
    ) -> async_graphql::Result<u32> {
        let index = cluster_index(ctx, kind)?;
        Ok(index.expansion_zoom(ClusterId(cluster_id)) as u32)
    }

    async fn search(
        &self,
        ctx: &Context<'_>,
        query: String,
        kind: Option<GqlEntityKind>,
    ) -> async_graphql::Result<GqlSearchOutcome> {
        let search = ctx.data::<ProximitySearch>()?;
        let entities = public_entities(ctx, kind)?;
        let outcome = search.run(&query, &entities).await;
        Ok(GqlSearchOutcome {
            mode: outcome.mode.into(),
            center: outcome.center.map(GqlLatLng::from),
            entity_ids: outcome.entity_ids.into_iter().map(ID).collect(),
        })
    }

    async fn config(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlMapConfig> {
        let config = ctx.data::<MapConfig>()?;
        let search = ctx.data::<ProximitySearch>()?;
        Ok(GqlMapConfig {
            cluster_radius_px: config.cluster.radius_px,
            cluster_max_zoom: config.cluster.max_zoom as u32,
            view_min_zoom: config.view_min_zoom,
            view_max_zoom: config.view_max_zoom,
            home_view: config.home_view.into(),
            spin_start_view: config.spin_start_view.into(),
            spin_duration_ms: config.spin_duration_ms,
            fly_duration_ms: config.fly_duration_ms,
            detail_zoom: config.detail_zoom,
            popup_offset_px: config.popup_offset_px,
            search_zoom: config.search_zoom,
            search_radius_miles: search.config().radius_miles,
        })
    }
}

pub type Schema = async_graphql::Schema<
    QueryRoot,
    async_graphql::EmptyMutation,
    async_graphql::EmptySubscription,
>;

pub fn build_schema(storage: Arc<Storage>, search: ProximitySearch, config: MapConfig) -> Schema {
    async_graphql::Schema::build(
        QueryRoot,
        async_graphql::EmptyMutation,
        async_graphql::EmptySubscription,
    )
    .data(storage)
    .data(search)
    .data(config)
    .finish()
}
