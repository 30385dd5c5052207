//! # aquius-network
//!
//! Connectivity queries over scheduled transport networks.
//!
//! ## Features
//!
//! - **Load-time validation**: datasets are repaired once, never per query
//! - **Spatial queries**: R-tree prefilter with exact Haversine distances
//! - **Connectivity**: per-node and per-pair service volumes around a point
//! - **Route compression**: pair volumes collapsed into constant-volume polylines
//! - **Demography**: population of the places served
//! - **Rendering helpers**: scale transforms and GeoJSON export
//!
//! ## Example
//!
//! ```
//! use aquius_network::prelude::*;
//! use geo::Point;
//!
//! let (network, _report) = Dataset::from_json(r#"{
//!     "network": [[[0], {"en-US": "Tram"}]],
//!     "node": [[0.0, 0.0, {"p": 0}], [0.0, 0.01, {}], [0.0, 0.02, {}]],
//!     "place": [[0.0, 0.0, {"p": 5000}]],
//!     "link": [[[0], [12], [0, 1, 2], {"d": 1}]]
//! }"#).unwrap().into_network();
//!
//! let query = HereQuery::new(Point::new(0.0, 0.0), 5_000.0).with_filter(0);
//! let result = here(&network, &query, &QueryOptions::default());
//!
//! assert_eq!(result.link_total, 12.0);
//! assert_eq!(result.polylines.len(), 1);
//! assert_eq!(result.total_population, 5000.0);
//! ```

pub mod dataset;
pub mod identifiers;
pub mod models;
pub mod provider;
pub mod query;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::dataset::{Dataset, LoadReport};
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, types::*};
    pub use crate::provider::{NetworkHandle, StaticNetworkProvider};
    pub use crate::query::{
        here, DisplayScale, HereQuery, HereResult, Layer, NodeScope, Polyline, QueryOptions,
    };
    pub use crate::spatial::range_for_zoom;
}

pub use prelude::*;
