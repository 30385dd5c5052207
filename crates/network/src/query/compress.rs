//! Route compression.
//!
//! Collapses the pair matrix into polylines: runs of adjacent directed
//! edges that share the same volume. Each edge ends up in exactly one
//! polyline, and a polyline stops only when no unused edge of the same
//! volume leaves its last node.
//!
//! Where a node offers more than one equal-volume continuation, the edge
//! seen first in the matrix wins. The result is deterministic for a given
//! matrix but not canonical.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::identifiers::NodeId;
use crate::query::aggregate::{PairMatrix, PairVolume};

/// A run of nodes drawn as one line with a constant volume
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub nodes: Vec<NodeId>,
    pub volume: f64,
}

impl Polyline {
    /// The directed edges this polyline consumed
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// Volumes compared bit for bit, with -0.0 folded into 0.0
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct VolumeKey(u64);

impl VolumeKey {
    fn new(volume: f64) -> Self {
        Self((volume + 0.0).to_bits())
    }
}

/// Unconsumed edges grouped by volume and origin, in matrix order
struct EdgeIndex<'a> {
    edges: &'a [PairVolume],
    by_origin: HashMap<(VolumeKey, NodeId), VecDeque<usize>>,
    consumed: Vec<bool>,
}

impl<'a> EdgeIndex<'a> {
    fn new(edges: &'a [PairVolume]) -> Self {
        let mut by_origin: HashMap<(VolumeKey, NodeId), VecDeque<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            by_origin
                .entry((VolumeKey::new(edge.volume), edge.from))
                .or_default()
                .push_back(i);
        }

        Self {
            edges,
            by_origin,
            consumed: vec![false; edges.len()],
        }
    }

    fn take(&mut self, i: usize) -> Option<&'a PairVolume> {
        if self.consumed[i] {
            return None;
        }
        self.consumed[i] = true;
        Some(&self.edges[i])
    }

    /// Consume the next unused edge leaving `from` with this volume
    fn take_from(&mut self, volume: VolumeKey, from: NodeId) -> Option<&'a PairVolume> {
        let queue = self.by_origin.get_mut(&(volume, from))?;
        while let Some(i) = queue.pop_front() {
            if !self.consumed[i] {
                self.consumed[i] = true;
                return Some(&self.edges[i]);
            }
        }
        None
    }
}

/// Decompose the matrix into maximal constant-volume polylines
pub fn compress_routes(pairs: &PairMatrix) -> Vec<Polyline> {
    let edges = pairs.canonical_edges();
    let mut index = EdgeIndex::new(&edges);
    let mut polylines = Vec::new();

    for seed in 0..edges.len() {
        let Some(edge) = index.take(seed) else {
            continue;
        };

        let key = VolumeKey::new(edge.volume);
        let mut nodes = vec![edge.from, edge.to];
        while let Some(next) = index.take_from(key, edge_tail(&nodes)) {
            nodes.push(next.to);
        }

        polylines.push(Polyline {
            nodes,
            volume: edge.volume,
        });
    }

    tracing::debug!(
        edges = edges.len(),
        polylines = polylines.len(),
        "Compressed pair matrix"
    );

    polylines
}

fn edge_tail(nodes: &[NodeId]) -> NodeId {
    nodes[nodes.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    /// Add an undirected segment the way the aggregator does
    fn segment(matrix: &mut PairMatrix, a: u32, b: u32, volume: f64) {
        matrix.add(n(a), n(b), volume);
        matrix.add(n(b), n(a), volume);
    }

    #[test]
    fn test_chains_equal_volume_run() {
        let mut matrix = PairMatrix::new();
        segment(&mut matrix, 0, 1, 12.0);
        segment(&mut matrix, 1, 2, 12.0);
        segment(&mut matrix, 2, 3, 12.0);

        let polylines = compress_routes(&matrix);
        assert_eq!(
            polylines,
            vec![Polyline {
                nodes: vec![n(0), n(1), n(2), n(3)],
                volume: 12.0
            }]
        );
    }

    #[test]
    fn test_volume_change_breaks_chain() {
        let mut matrix = PairMatrix::new();
        segment(&mut matrix, 0, 1, 12.0);
        segment(&mut matrix, 1, 2, 6.0);

        let polylines = compress_routes(&matrix);
        assert_eq!(polylines.len(), 2);
        assert_eq!(polylines[0].nodes, vec![n(0), n(1)]);
        assert_eq!(polylines[1].nodes, vec![n(1), n(2)]);
        assert_eq!(polylines[1].volume, 6.0);
    }

    #[test]
    fn test_branch_takes_first_seen_continuation() {
        let mut matrix = PairMatrix::new();
        segment(&mut matrix, 0, 1, 4.0);
        segment(&mut matrix, 1, 2, 4.0);
        segment(&mut matrix, 1, 3, 4.0);

        let polylines = compress_routes(&matrix);
        assert_eq!(polylines[0].nodes, vec![n(0), n(1), n(2)]);
        assert_eq!(polylines[1].nodes, vec![n(1), n(3)]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut matrix = PairMatrix::new();
        segment(&mut matrix, 0, 1, 2.0);
        segment(&mut matrix, 1, 2, 2.0);
        segment(&mut matrix, 2, 0, 2.0);

        let polylines = compress_routes(&matrix);
        assert_eq!(polylines.len(), 1);
        assert_eq!(polylines[0].nodes, vec![n(0), n(1), n(2), n(0)]);
    }

    #[test]
    fn test_empty_matrix() {
        assert!(compress_routes(&PairMatrix::new()).is_empty());
    }

    #[test]
    fn test_every_edge_used_once_and_polylines_maximal() {
        let mut matrix = PairMatrix::new();
        let segments = [
            (0, 1, 3.0),
            (1, 2, 3.0),
            (2, 3, 1.5),
            (3, 4, 1.5),
            (1, 5, 3.0),
            (5, 6, 3.0),
            (7, 5, 1.5),
            (6, 2, 3.0),
            (4, 0, 1.5),
        ];
        for (a, b, v) in segments {
            segment(&mut matrix, a, b, v);
        }

        let expected: Vec<(NodeId, NodeId)> = matrix
            .canonical_edges()
            .iter()
            .map(|e| (e.from, e.to))
            .collect();
        let polylines = compress_routes(&matrix);

        // Totality: each canonical edge exactly once
        let mut used: Vec<(NodeId, NodeId)> = polylines.iter().flat_map(|p| p.edges()).collect();
        assert_eq!(used.len(), expected.len());
        used.sort();
        let mut sorted_expected = expected.clone();
        sorted_expected.sort();
        assert_eq!(used, sorted_expected);

        // Constant volume along each polyline
        for polyline in &polylines {
            for (from, to) in polyline.edges() {
                assert_eq!(matrix.get(from, to), Some(polyline.volume));
            }
        }

        // Maximality: after compression nothing is left to extend with
        let used: HashSet<(NodeId, NodeId)> = polylines.iter().flat_map(|p| p.edges()).collect();
        for polyline in &polylines {
            let tail = *polyline.nodes.last().unwrap();
            let extendable = expected
                .iter()
                .filter(|edge| !used.contains(edge))
                .any(|(from, to)| *from == tail && matrix.get(*from, *to) == Some(polyline.volume));
            assert!(!extendable);
        }
    }
}
