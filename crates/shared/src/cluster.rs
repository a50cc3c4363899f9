//! Hierarchical greedy point clustering.
//!
//! One R-tree per integer zoom level. The level above `max_zoom` holds the
//! raw points; each lower level is built by merging the nodes of the level
//! above that fall within the merge radius at that zoom. Clusters are kept in
//! an arena so a cluster that survives unmerged into lower levels keeps its id.

use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use crate::config::ClusterOptions;
use crate::geo::{lat_to_y, lng_to_x, wrap_lng, x_to_lng, y_to_lat};
use crate::models::{BBox, ClusterId, ClusterNode, MapFeature, Point, PointId};

/// Contract the map core needs from a clustering backend.
pub trait SpatialIndex {
    fn build(points: &[Point], options: &ClusterOptions) -> Self
    where
        Self: Sized;

    /// Clusters and standalone points intersecting `bbox` at `zoom`.
    fn query(&self, bbox: &BBox, zoom: f64) -> Vec<MapFeature>;

    /// Zoom at which the cluster's members first split apart, never above the
    /// configured max zoom. Unknown ids resolve to the max zoom.
    fn expansion_zoom(&self, id: ClusterId) -> u8;

    fn point(&self, id: PointId) -> Option<&Point>;

    fn cluster(&self, id: ClusterId) -> Option<ClusterNode>;

    fn points(&self) -> &[Point];

    fn options(&self) -> &ClusterOptions;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Point(PointId),
    Cluster(ClusterId),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    x: f64,
    y: f64,
    num_points: usize,
    member: Member,
}

/// Projected position tagged with its index into `Level::nodes`.
type Entry = GeomWithData<[f64; 2], usize>;

#[derive(Clone)]
struct Level {
    nodes: Vec<Node>,
    tree: RTree<Entry>,
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let entries = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| Entry::new([n.x, n.y], i))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            nodes,
        }
    }

    /// Node indices inside the box, bounds inclusive, in node order.
    fn range(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|e| e.data)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Node indices within distance `r` of `(x, y)`, bound inclusive, in node
    /// order.
    fn within(&self, x: f64, y: f64, r: f64) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .tree
            .locate_within_distance([x, y], r * r)
            .map(|e| e.data)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone)]
struct ClusterRecord {
    x: f64,
    y: f64,
    /// Zoom level the cluster was formed at.
    zoom: u8,
    num_points: usize,
    children: Vec<Member>,
    leaves: Vec<PointId>,
}

#[derive(Debug, Clone)]
pub struct ClusterIndex {
    options: ClusterOptions,
    points: Vec<Point>,
    clusters: Vec<ClusterRecord>,
    /// `levels[z - min_zoom]` for z in `min_zoom..=max_zoom + 1`.
    levels: Vec<Level>,
}

impl ClusterIndex {
    pub fn new(points: &[Point], options: &ClusterOptions) -> Self {
        let options = normalize(options);

        let raw: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, p)| Node {
                x: lng_to_x(p.lng),
                y: lat_to_y(p.lat),
                num_points: 1,
                member: Member::Point(PointId(i as u32)),
            })
            .collect();

        let mut clusters = Vec::new();
        let mut levels = Vec::new();
        let mut current = Level::new(raw);

        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let nodes = merge_level(&current, zoom, &options, &mut clusters);
            levels.push(std::mem::replace(&mut current, Level::new(nodes)));
        }
        levels.push(current);
        levels.reverse();

        tracing::debug!(
            points = points.len(),
            clusters = clusters.len(),
            "Built cluster index"
        );

        Self {
            options,
            points: points.to_vec(),
            clusters,
            levels,
        }
    }

    fn level(&self, zoom: f64) -> &Level {
        let min = self.options.min_zoom as i64;
        let max = self.options.max_zoom as i64 + 1;
        let z = (zoom.floor() as i64).clamp(min, max);
        &self.levels[(z - min) as usize]
    }

    fn feature(&self, node: &Node) -> MapFeature {
        match node.member {
            Member::Point(id) => MapFeature::Point {
                id,
                point: self.points[id.0 as usize].clone(),
            },
            Member::Cluster(id) => MapFeature::Cluster(self.cluster_node(id, node)),
        }
    }

    fn cluster_node(&self, id: ClusterId, node: &Node) -> ClusterNode {
        let record = &self.clusters[id.0 as usize];
        ClusterNode {
            id,
            lat: y_to_lat(node.y),
            lng: x_to_lng(node.x),
            point_count: record.num_points,
            child_point_ids: record.leaves.clone(),
        }
    }

    fn query_range(&self, west: f64, south: f64, east: f64, north: f64, zoom: f64) -> Vec<MapFeature> {
        let level = self.level(zoom);
        level
            .range(lng_to_x(west), lat_to_y(north), lng_to_x(east), lat_to_y(south))
            .into_iter()
            .map(|i| self.feature(&level.nodes[i]))
            .collect()
    }

    /// Direct children of a cluster, one level above where it formed.
    pub fn children(&self, id: ClusterId) -> Vec<MapFeature> {
        let Some(record) = self.clusters.get(id.0 as usize) else {
            return Vec::new();
        };
        record
            .children
            .iter()
            .map(|member| match *member {
                Member::Point(pid) => MapFeature::Point {
                    id: pid,
                    point: self.points[pid.0 as usize].clone(),
                },
                Member::Cluster(cid) => {
                    let child = &self.clusters[cid.0 as usize];
                    let node = Node {
                        x: child.x,
                        y: child.y,
                        num_points: child.num_points,
                        member: *member,
                    };
                    MapFeature::Cluster(self.cluster_node(cid, &node))
                }
            })
            .collect()
    }
}

impl SpatialIndex for ClusterIndex {
    fn build(points: &[Point], options: &ClusterOptions) -> Self {
        ClusterIndex::new(points, options)
    }

    fn query(&self, bbox: &BBox, zoom: f64) -> Vec<MapFeature> {
        if self.points.is_empty() {
            return Vec::new();
        }
        let south = bbox.south.clamp(-90.0, 90.0);
        let north = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            return self.query_range(-180.0, south, 180.0, north, zoom);
        }

        let west = wrap_lng(bbox.west);
        let east = if bbox.east == 180.0 {
            180.0
        } else {
            wrap_lng(bbox.east)
        };

        if west > east {
            let mut features = self.query_range(west, south, 180.0, north, zoom);
            features.extend(self.query_range(-180.0, south, east, north, zoom));
            return features;
        }
        self.query_range(west, south, east, north, zoom)
    }

    fn expansion_zoom(&self, id: ClusterId) -> u8 {
        let max = self.options.max_zoom;
        let Some(mut record) = self.clusters.get(id.0 as usize) else {
            return max;
        };
        let mut zoom = record.zoom;
        loop {
            zoom = zoom.saturating_add(1);
            if zoom > max || record.children.len() != 1 {
                break;
            }
            match record.children[0] {
                Member::Cluster(child) => record = &self.clusters[child.0 as usize],
                Member::Point(_) => break,
            }
        }
        zoom.min(max)
    }

    fn point(&self, id: PointId) -> Option<&Point> {
        self.points.get(id.0 as usize)
    }

    fn cluster(&self, id: ClusterId) -> Option<ClusterNode> {
        let record = self.clusters.get(id.0 as usize)?;
        let node = Node {
            x: record.x,
            y: record.y,
            num_points: record.num_points,
            member: Member::Cluster(id),
        };
        Some(self.cluster_node(id, &node))
    }

    fn points(&self) -> &[Point] {
        &self.points
    }

    fn options(&self) -> &ClusterOptions {
        &self.options
    }
}

fn normalize(options: &ClusterOptions) -> ClusterOptions {
    let mut options = options.clone();
    options.max_zoom = options.max_zoom.min(30);
    options.min_zoom = options.min_zoom.min(options.max_zoom);
    options.min_points = options.min_points.max(2);
    options
}

/// Greedily merge the nodes of `prev` into the nodes of level `zoom`.
fn merge_level(
    prev: &Level,
    zoom: u8,
    options: &ClusterOptions,
    clusters: &mut Vec<ClusterRecord>,
) -> Vec<Node> {
    let r = options.radius_px / (options.extent * 2f64.powi(zoom as i32));
    let mut taken = vec![false; prev.nodes.len()];
    let mut next = Vec::with_capacity(prev.nodes.len());

    for i in 0..prev.nodes.len() {
        if taken[i] {
            continue;
        }
        taken[i] = true;
        let p = prev.nodes[i];

        let neighbors: Vec<usize> = prev
            .within(p.x, p.y, r)
            .into_iter()
            .filter(|&n| !taken[n])
            .collect();

        let total = p.num_points + neighbors.iter().map(|&n| prev.nodes[n].num_points).sum::<usize>();

        if total > p.num_points && total >= options.min_points {
            let mut wx = p.x * p.num_points as f64;
            let mut wy = p.y * p.num_points as f64;
            let mut children = vec![p.member];
            for &n in &neighbors {
                taken[n] = true;
                let b = prev.nodes[n];
                wx += b.x * b.num_points as f64;
                wy += b.y * b.num_points as f64;
                children.push(b.member);
            }

            let mut leaves: Vec<PointId> = children
                .iter()
                .flat_map(|m| match *m {
                    Member::Point(id) => vec![id],
                    Member::Cluster(id) => clusters[id.0 as usize].leaves.clone(),
                })
                .collect();
            leaves.sort_unstable();

            let id = ClusterId(clusters.len() as u32);
            let (x, y) = (wx / total as f64, wy / total as f64);
            clusters.push(ClusterRecord {
                x,
                y,
                zoom,
                num_points: total,
                children,
                leaves,
            });
            next.push(Node {
                x,
                y,
                num_points: total,
                member: Member::Cluster(id),
            });
        } else {
            next.push(p);
            if total > 1 {
                for &n in &neighbors {
                    taken[n] = true;
                    next.push(prev.nodes[n]);
                }
            }
        }
    }

    next
}
