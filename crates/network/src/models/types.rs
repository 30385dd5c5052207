//! Core data types for the network data model.

use std::collections::BTreeMap;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::identifiers::*;

/// Free-form descriptive metadata carried through from the dataset
/// (names, codes, urls). Never interpreted by the query engine.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Entities
// ============================================================================

/// A stop, station or other boarding point
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub location: Point,
    pub place_id: Option<PlaceId>,
    pub reference: Vec<Metadata>,
}

impl Node {
    /// Nodes with non-finite coordinates are kept so ids stay positional,
    /// but they can never be found by a spatial query.
    pub fn has_valid_location(&self) -> bool {
        self.location.x().is_finite() && self.location.y().is_finite()
    }
}

/// A demographic area that nodes resolve to
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub id: PlaceId,
    pub location: Point,
    pub population: f64,
    pub reference: Vec<Metadata>,
}

/// How the service volumes of a link are counted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Volumes are the total of both directions of travel
    #[default]
    Bidirectional,
    /// Volumes only run in node-sequence order
    Forward,
}

/// Parsed link flags. Counting reads `circular`, `direction`, `split` and
/// `shared`; the rest are carried through to callers that describe a
/// service (see `HereResult::links`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkProperties {
    pub circular: bool,
    pub direction: Direction,
    /// Branch-only nodes. `None` when the link has no split section.
    pub split: Option<Vec<NodeId>>,
    /// Parent products whose totals already include this link
    pub shared: Vec<ProductId>,
    pub pickup_only: Vec<NodeId>,
    pub setdown_only: Vec<NodeId>,
    pub block: Option<u32>,
    pub color: Option<String>,
    pub reference: Vec<Metadata>,
}

/// A scheduled service pattern, or a group of services running together
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub products: Vec<ProductId>,
    /// One entry per service dimension, never negative
    pub volumes: Vec<f64>,
    /// At least two nodes, no consecutive duplicates
    pub nodes: Vec<NodeId>,
    pub properties: LinkProperties,
}

impl Link {
    pub fn volume(&self, selection: ServiceSelection) -> f64 {
        match selection {
            ServiceSelection::Total => self.volumes.iter().sum(),
            ServiceSelection::Index(i) => self.volumes.get(i).copied().unwrap_or(0.0),
        }
    }

    /// Circular only when the route really closes on its first node
    pub fn is_circular(&self) -> bool {
        self.properties.circular && self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }

    pub fn is_directional(&self) -> bool {
        self.properties.direction == Direction::Forward
    }

    pub fn is_split_node(&self, node: NodeId) -> bool {
        self.properties
            .split
            .as_ref()
            .is_some_and(|split| split.contains(&node))
    }
}

/// A named subset of products that scopes a query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkFilter {
    /// Sorted and deduplicated. Empty means every product.
    pub products: Vec<ProductId>,
    pub names: BTreeMap<String, String>,
    pub extra: Vec<serde_json::Value>,
}

impl NetworkFilter {
    /// Filter that admits every product
    pub fn all() -> Self {
        Self::default()
    }

    pub fn includes(&self, product: ProductId) -> bool {
        self.products.is_empty() || self.products.binary_search(&product).is_ok()
    }

    pub fn includes_any(&self, products: &[ProductId]) -> bool {
        products.iter().any(|p| self.includes(*p))
    }

    /// Name in the requested locale, falling back to the first name available
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.names
            .get(locale)
            .or_else(|| self.names.values().next())
            .map(String::as_str)
    }
}

// ============================================================================
// Query parameters
// ============================================================================

/// Which service dimension of a link's volumes to count
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceSelection {
    /// Sum of every dimension
    #[default]
    Total,
    /// A single dimension; links without it count as zero
    Index(usize),
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn link(volumes: Vec<f64>) -> Link {
        Link {
            id: LinkId(0),
            products: vec![ProductId(0)],
            volumes,
            nodes: vec![NodeId(0), NodeId(1)],
            properties: LinkProperties::default(),
        }
    }

    #[test]
    fn test_link_volume_selection() {
        let link = link(vec![4.0, 6.0]);
        assert_eq!(link.volume(ServiceSelection::Total), 10.0);
        assert_eq!(link.volume(ServiceSelection::Index(1)), 6.0);
        assert_eq!(link.volume(ServiceSelection::Index(5)), 0.0);
    }

    #[test]
    fn test_filter_includes() {
        let filter = NetworkFilter {
            products: vec![ProductId(1), ProductId(4)],
            ..Default::default()
        };
        assert!(filter.includes(ProductId(4)));
        assert!(!filter.includes(ProductId(2)));
        assert!(filter.includes_any(&[ProductId(2), ProductId(1)]));

        // Empty filter admits everything
        assert!(NetworkFilter::all().includes(ProductId(99)));
    }

    #[test]
    fn test_filter_display_name() {
        let mut names = BTreeMap::new();
        names.insert("en-US".to_string(), "Rail".to_string());
        names.insert("es-ES".to_string(), "Ferrocarril".to_string());
        let filter = NetworkFilter { names, ..Default::default() };

        assert_eq!(filter.display_name("es-ES"), Some("Ferrocarril"));
        assert_eq!(filter.display_name("fr-FR"), Some("Rail"));
    }

    #[test]
    fn test_circular_needs_closed_route() {
        let mut l = link(vec![1.0]);
        l.nodes = vec![NodeId(0), NodeId(1), NodeId(0)];
        assert!(!l.is_circular());
        l.properties.circular = true;
        assert!(l.is_circular());

        // Flag set on an open route is ignored
        l.nodes = vec![NodeId(0), NodeId(1), NodeId(2)];
        assert!(!l.is_circular());
    }

    #[test]
    fn test_split_node() {
        let mut l = link(vec![1.0]);
        assert!(!l.is_split_node(NodeId(1)));
        l.properties.split = Some(vec![NodeId(1)]);
        assert!(l.is_split_node(NodeId(1)));
        assert!(!l.is_split_node(NodeId(0)));
    }
}
