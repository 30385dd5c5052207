//! Connectivity aggregation.
//!
//! Walks every link that serves the candidate nodes and accumulates service
//! volume per node and per directed node pair.
//!
//! ## Counting rules
//!
//! - A link whose products miss the active filter is ignored, as is a link
//!   marked `shared` with a product the filter already counts: the parent's
//!   totals include it.
//! - Links with a `split` section that reach the query through a common
//!   (non-split) node are restricted to their split nodes and left out of the
//!   link total, because the common section is already counted elsewhere.
//! - Directional links are only counted onward from the first candidate node.
//!   A circular directional link is rotated to start there instead.
//! - Bidirectional volumes are totals of both directions. Where a node or a
//!   pair lies outside the candidate set, only half the volume is attributed.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::identifiers::{LinkId, NodeId};
use crate::models::types::{Link, NetworkFilter, ServiceSelection};

// ============================================================================
// Pair matrix
// ============================================================================

/// Volume between an ordered pair of nodes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairVolume {
    pub from: NodeId,
    pub to: NodeId,
    pub volume: f64,
}

/// Origin-destination volume matrix.
///
/// Entries keep the order in which pairs were first seen, which follows the
/// order of links and of nodes along each link.
#[derive(Clone, Debug, Default)]
pub struct PairMatrix {
    entries: Vec<PairVolume>,
    positions: HashMap<(NodeId, NodeId), usize>,
}

impl PairMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: NodeId, to: NodeId, volume: f64) {
        match self.positions.get(&(from, to)) {
            Some(&position) => self.entries[position].volume += volume,
            None => {
                self.positions.insert((from, to), self.entries.len());
                self.entries.push(PairVolume { from, to, volume });
            }
        }
    }

    pub fn get(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.positions
            .get(&(from, to))
            .map(|&position| self.entries[position].volume)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairVolume> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One directed entry per unordered pair: whichever direction was seen
    /// first. Self-loops are dropped.
    pub fn canonical_edges(&self) -> Vec<PairVolume> {
        let mut kept: HashSet<(NodeId, NodeId)> = HashSet::with_capacity(self.entries.len() / 2);
        let mut edges = Vec::with_capacity(self.entries.len() / 2);

        for entry in &self.entries {
            if entry.from == entry.to {
                tracing::debug!(node = %entry.from, "Dropping self-loop from pair matrix");
                continue;
            }
            if kept.contains(&(entry.to, entry.from)) {
                continue;
            }
            kept.insert((entry.from, entry.to));
            edges.push(*entry);
        }

        edges
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Service volumes around one set of candidate nodes
#[derive(Clone, Debug, Default)]
pub struct Connectivity {
    /// Every node the counted links reach, in id order
    pub node_volume: BTreeMap<NodeId, f64>,
    /// Both directions of each pair are populated with the same amount
    pub pair_volume: PairMatrix,
    pub link_total: f64,
    /// Links that contributed, in network order
    pub links: Vec<LinkId>,
}

/// How a link with a split section takes part in a query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SplitScope {
    /// No split section, or the query only touches split nodes
    Whole,
    /// The query touches a common node: only split nodes count
    Branch,
}

pub fn aggregate(
    links: &[Link],
    filter: &NetworkFilter,
    here: &HashSet<NodeId>,
    selection: ServiceSelection,
) -> Connectivity {
    let mut connectivity = Connectivity::default();

    for link in links {
        if !filter.includes_any(&link.products) {
            continue;
        }
        if link.properties.shared.iter().any(|parent| filter.includes(*parent)) {
            continue;
        }
        if link.nodes.len() < 2 || !link.nodes.iter().any(|node| here.contains(node)) {
            continue;
        }

        accumulate(&mut connectivity, link, here, selection);
    }

    connectivity
}

fn split_scope(link: &Link, here: &HashSet<NodeId>) -> SplitScope {
    let Some(split) = &link.properties.split else {
        return SplitScope::Whole;
    };

    let common_here = link
        .nodes
        .iter()
        .any(|node| !split.contains(node) && here.contains(node));

    if common_here {
        SplitScope::Branch
    } else {
        SplitScope::Whole
    }
}

/// The part of the link's route that serves the query
fn route_window(link: &Link, here: &HashSet<NodeId>) -> Vec<NodeId> {
    if !link.is_directional() {
        return link.nodes.clone();
    }

    let Some(start) = link.nodes.iter().position(|node| here.contains(node)) else {
        return Vec::new();
    };

    if link.is_circular() {
        // Drop the closing node, rotate, then close the loop again
        let ring = &link.nodes[..link.nodes.len() - 1];
        let mut route: Vec<NodeId> = ring[start..].iter().chain(&ring[..start]).copied().collect();
        route.push(ring[start]);
        route
    } else {
        link.nodes[start..].to_vec()
    }
}

fn accumulate(
    connectivity: &mut Connectivity,
    link: &Link,
    here: &HashSet<NodeId>,
    selection: ServiceSelection,
) {
    let scope = split_scope(link, here);
    let route = route_window(link, here);
    let volume = link.volume(selection);
    let directional = link.is_directional();

    if scope == SplitScope::Whole {
        connectivity.link_total += volume;
    }
    connectivity.links.push(link.id);

    let counts = |node: NodeId| scope == SplitScope::Whole || link.is_split_node(node);
    let closing = link.is_circular().then(|| route.len() - 1);

    for (j, &node) in route.iter().enumerate() {
        if counts(node) && closing != Some(j) {
            let level = if directional || here.contains(&node) {
                volume
            } else {
                volume / 2.0
            };
            *connectivity.node_volume.entry(node).or_insert(0.0) += level;
        }

        let Some(&next) = route.get(j + 1) else {
            continue;
        };
        if counts(node) || counts(next) {
            let level = if directional || (here.contains(&node) && here.contains(&next)) {
                volume
            } else {
                volume / 2.0
            };
            connectivity.pair_volume.add(node, next, level);
            connectivity.pair_volume.add(next, node, level);
        }
    }

    tracing::trace!(link = %link.id, ?scope, nodes = route.len(), volume, "Link counted");
}
