//! Spatial indexing and query utilities.

pub mod index;
pub mod queries;

pub use index::NodeIndex;
pub use queries::{haversine_distance, range_for_zoom};
