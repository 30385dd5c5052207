//! The "what connects from here?" query.
//!
//! A query runs in four steps against one immutable network:
//!
//! 1. select candidate nodes within the radius ([`NetworkProvider::nodes_near`])
//! 2. aggregate service volume per node and per node pair ([`aggregate`])
//! 3. compress the pair matrix into constant-volume polylines ([`compress`])
//! 4. resolve the reported nodes to places ([`demography`])
//!
//! Nothing here fails: bad input was repaired at load time, and an empty
//! selection gives an all-zero result.

pub mod aggregate;
pub mod compress;
pub mod demography;
pub mod export;
pub mod scale;

use std::collections::{BTreeMap, HashSet};

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::identifiers::{LinkId, NodeId, PlaceId};
use crate::models::traits::NetworkProvider;
use crate::models::types::{NetworkFilter, ServiceSelection};

pub use aggregate::{aggregate, Connectivity, PairMatrix, PairVolume};
pub use compress::{compress_routes, Polyline};
pub use demography::{aggregate_places, Demography};
pub use export::Layer;
pub use scale::DisplayScale;

/// Where and what to look for
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HereQuery {
    /// Longitude, latitude
    pub point: Point,
    pub radius_m: f64,
    /// Index of the active network filter. `None` or out of range means
    /// every product.
    pub filter: Option<usize>,
}

impl HereQuery {
    pub fn new(point: Point, radius_m: f64) -> Self {
        Self {
            point,
            radius_m,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: usize) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Which nodes a result reports volumes and places for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeScope {
    /// Only nodes inside the search radius
    #[default]
    Here,
    /// Every node reached by a counted link
    Served,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub service: ServiceSelection,
    pub scope: NodeScope,
}

/// Everything a renderer needs to draw one query
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HereResult {
    pub center: [f64; 2],
    pub radius_m: f64,
    /// Candidate nodes inside the radius
    pub here: Vec<NodeId>,
    pub node_volume: BTreeMap<NodeId, f64>,
    pub polylines: Vec<Polyline>,
    /// Links counted toward the result, for callers that list services
    pub links: Vec<LinkId>,
    pub served_places: Vec<PlaceId>,
    pub total_population: f64,
    pub link_total: f64,
    pub node_count: usize,
}

impl HereResult {
    pub fn empty(query: &HereQuery) -> Self {
        Self {
            center: [query.point.x(), query.point.y()],
            radius_m: query.radius_m,
            here: Vec::new(),
            node_volume: BTreeMap::new(),
            polylines: Vec::new(),
            links: Vec::new(),
            served_places: Vec::new(),
            total_population: 0.0,
            link_total: 0.0,
            node_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_volume.is_empty() && self.polylines.is_empty()
    }
}

/// Run a query against one network snapshot
pub fn here<P: NetworkProvider + ?Sized>(
    provider: &P,
    query: &HereQuery,
    options: &QueryOptions,
) -> HereResult {
    let mut result = HereResult::empty(query);

    let candidates = provider.nodes_near(query.point, query.radius_m);
    if candidates.is_empty() {
        tracing::debug!(x = query.point.x(), y = query.point.y(), radius_m = query.radius_m, "No nodes in range");
        return result;
    }

    let all = NetworkFilter::all();
    let filter = match query.filter {
        Some(index) => provider.filter(index).unwrap_or_else(|| {
            tracing::debug!(index, "Network filter out of range, using all products");
            &all
        }),
        None => &all,
    };

    let in_range: HashSet<NodeId> = candidates.iter().copied().collect();
    let connectivity = aggregate(provider.links(), filter, &in_range, options.service);
    let polylines = compress_routes(&connectivity.pair_volume);

    let node_volume: BTreeMap<NodeId, f64> = match options.scope {
        NodeScope::Here => connectivity
            .node_volume
            .into_iter()
            .filter(|(node, _)| in_range.contains(node))
            .collect(),
        NodeScope::Served => connectivity.node_volume,
    };

    let demography = aggregate_places(provider, node_volume.keys().copied());

    tracing::debug!(
        candidates = candidates.len(),
        links = connectivity.links.len(),
        nodes = node_volume.len(),
        polylines = polylines.len(),
        "Query complete"
    );

    result.here = candidates;
    result.node_count = node_volume.len();
    result.node_volume = node_volume;
    result.polylines = polylines;
    result.served_places = demography.places;
    result.total_population = demography.population;
    result.link_total = connectivity.link_total;
    result.links = connectivity.links;
    result
}
