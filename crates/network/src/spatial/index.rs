//! R-tree entries for spatial indexing.
//!
//! ## Two-Stage Filtering
//!
//! Candidate selection uses a two-stage approach:
//! 1. **R-tree filter**: an envelope query with a longitude/latitude box
//!    that is guaranteed to contain the search circle
//! 2. **Haversine filter**: the exact great-circle distance on the survivors

use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

use crate::identifiers::NodeId;
use crate::models::types::Node;
use crate::spatial::queries::{bounding_box, haversine_distance};

// ============================================================================
// Node Spatial Entry
// ============================================================================

#[derive(Clone, Debug)]
pub struct NodeEntry {
    pub id: NodeId,
    point: [f64; 2],
}

impl NodeEntry {
    pub fn new(id: NodeId, location: Point) -> Self {
        Self {
            id,
            point: [location.x(), location.y()],
        }
    }

    pub fn location(&self) -> Point {
        Point::new(self.point[0], self.point[1])
    }
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

// ============================================================================
// Node Index
// ============================================================================

/// Spatial index over every node with usable coordinates
#[derive(Clone)]
pub struct NodeIndex {
    tree: RTree<NodeEntry>,
}

impl Default for NodeIndex {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl NodeIndex {
    pub fn build(nodes: &[Node]) -> Self {
        let entries = nodes
            .iter()
            .filter(|node| node.has_valid_location())
            .map(|node| NodeEntry::new(node.id, node.location))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of nodes within `radius_m` metres of `point`, ascending
    pub fn within(&self, point: Point, radius_m: f64) -> Vec<NodeId> {
        if !radius_m.is_finite() || radius_m < 0.0 || !point.x().is_finite() || !point.y().is_finite() {
            return Vec::new();
        }

        let in_range = |entry: &&NodeEntry| haversine_distance(point, entry.location()) <= radius_m;

        let mut ids: Vec<NodeId> = match bounding_box(point, radius_m) {
            Some((min, max)) => self
                .tree
                .locate_in_envelope(&AABB::from_corners(min, max))
                .filter(in_range)
                .map(|entry| entry.id)
                .collect(),
            None => self.tree.iter().filter(in_range).map(|entry| entry.id).collect(),
        };

        ids.sort_unstable();
        ids
    }
}
