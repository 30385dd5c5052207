//! Atomically swappable reference to the current network.
//!
//! Loading builds a complete provider off to the side and then publishes it
//! in one step. Queries take a snapshot first, so they always see one whole
//! dataset and are never affected by a later publish.

use std::sync::{Arc, RwLock};

use crate::provider::static_provider::StaticNetworkProvider;

#[derive(Default)]
pub struct NetworkHandle {
    current: RwLock<Arc<StaticNetworkProvider>>,
}

impl NetworkHandle {
    pub fn new(provider: StaticNetworkProvider) -> Self {
        Self {
            current: RwLock::new(Arc::new(provider)),
        }
    }

    /// Replace the current network, returning the previous one
    pub fn publish(&self, provider: StaticNetworkProvider) -> Arc<StaticNetworkProvider> {
        let next = Arc::new(provider);
        let mut current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *current, next)
    }

    /// The network queries should run against right now
    pub fn snapshot(&self) -> Arc<StaticNetworkProvider> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
