//! In-memory network provider backed by a loaded dataset.
//!
//! Entities are stored in id order and never reordered, so a node's id is
//! always its position in [`NetworkProvider::nodes`].

use std::sync::Arc;

use geo::Point;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};
use crate::spatial::index::NodeIndex;

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory network provider with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticNetworkProvider {
    // Core data
    nodes: Arc<[Node]>,
    places: Arc<[Place]>,
    links: Arc<[Link]>,
    filters: Arc<[NetworkFilter]>,

    // Dataset `option` block, defaults for display and query
    options: Arc<Metadata>,

    // Spatial index
    node_index: Arc<NodeIndex>,
}

impl StaticNetworkProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::from_data(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    /// Build provider from validated records.
    ///
    /// Ids must already match positions; `Dataset::into_network` guarantees
    /// this for loaded data.
    pub fn from_data(
        nodes: Vec<Node>,
        places: Vec<Place>,
        links: Vec<Link>,
        filters: Vec<NetworkFilter>,
    ) -> Self {
        debug_assert!(nodes.iter().enumerate().all(|(i, n)| n.id.index() == i));
        debug_assert!(places.iter().enumerate().all(|(i, p)| p.id.index() == i));

        let node_index = NodeIndex::build(&nodes);

        Self {
            nodes: nodes.into(),
            places: places.into(),
            links: links.into(),
            filters: filters.into(),
            options: Arc::new(Metadata::new()),
            node_index: Arc::new(node_index),
        }
    }

    pub fn with_options(mut self, options: Metadata) -> Self {
        self.options = Arc::new(options);
        self
    }

    pub fn options(&self) -> &Metadata {
        &self.options
    }

    /// Number of nodes that can be found by spatial queries
    pub fn indexed_nodes(&self) -> usize {
        self.node_index.len()
    }
}

impl Default for StaticNetworkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkProvider for StaticNetworkProvider {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn places(&self) -> &[Place] {
        &self.places
    }

    fn links(&self) -> &[Link] {
        &self.links
    }

    fn filters(&self) -> &[NetworkFilter] {
        &self.filters
    }

    fn nodes_near(&self, point: Point, radius_m: f64) -> Vec<NodeId> {
        self.node_index.within(point, radius_m)
    }
}
