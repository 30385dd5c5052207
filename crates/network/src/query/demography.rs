//! Demographic aggregation over served nodes.

use std::collections::HashSet;

use crate::identifiers::{NodeId, PlaceId};
use crate::models::traits::NetworkProvider;

/// Places reached by a query and the people living in them
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Demography {
    /// In the order first reached
    pub places: Vec<PlaceId>,
    pub population: f64,
}

/// Resolve nodes to their places, counting each place once
pub fn aggregate_places<P, I>(provider: &P, nodes: I) -> Demography
where
    P: NetworkProvider + ?Sized,
    I: IntoIterator<Item = NodeId>,
{
    let mut seen: HashSet<PlaceId> = HashSet::new();
    let mut demography = Demography::default();

    for node in nodes {
        let Some(place_id) = provider.node(node).and_then(|node| node.place_id) else {
            continue;
        };
        let Some(place) = provider.place(place_id) else {
            continue;
        };
        if seen.insert(place_id) {
            demography.places.push(place_id);
            demography.population += place.population.max(0.0);
        }
    }

    demography
}
