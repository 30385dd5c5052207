//! Core traits for network data.
//!
//! The query pipeline only sees a network through [`NetworkProvider`], so
//! the data can be held in memory, memory-mapped, or built for a test.

use geo::Point;

use crate::identifiers::*;
use crate::models::types::*;

// ============================================================================
// Provider Trait
// ============================================================================

/// Read-only access to one loaded network dataset
pub trait NetworkProvider: Send + Sync {
    // ---- Collections (indexed by id) ----
    fn nodes(&self) -> &[Node];
    fn places(&self) -> &[Place];
    fn links(&self) -> &[Link];
    fn filters(&self) -> &[NetworkFilter];

    // ---- Lookups ----
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes().get(id.index())
    }

    fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places().get(id.index())
    }

    /// Link ids keep their dataset position, so skipped records leave gaps
    fn link(&self, id: LinkId) -> Option<&Link> {
        let links = self.links();
        links.binary_search_by_key(&id, |link| link.id).ok().map(|i| &links[i])
    }

    /// Filter at `index`, or `None` when out of range
    fn filter(&self, index: usize) -> Option<&NetworkFilter> {
        self.filters().get(index)
    }

    // ---- Spatial queries ----

    /// Ids of nodes within `radius_m` metres of `point`, in ascending order
    fn nodes_near(&self, point: Point, radius_m: f64) -> Vec<NodeId>;
}
