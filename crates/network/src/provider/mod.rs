//! Network data providers.

pub mod handle;
pub mod static_provider;

pub use handle::NetworkHandle;
pub use static_provider::StaticNetworkProvider;
