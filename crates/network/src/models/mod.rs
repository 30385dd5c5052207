//! Network data models, types, and traits.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::NetworkProvider;
pub use types::{
    Direction, Link, LinkProperties, Metadata, NetworkError, NetworkFilter, Node, Place, Result,
    ServiceSelection,
};
