//! Plugin-based component registry
//!
//! The registry maps feed-client and state-store type names to factories,
//! so the daemon builds its components from configuration without
//! hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vidsync_core::registry::Registry;
//! use vidsync_core::config::FeedConfig;
//!
//! let registry = Registry::with_builtin_stores();
//! vidsync_feed_youtube::register(&registry);
//!
//! let client = registry.create_feed_client(&FeedConfig::youtube(key, channel))?;
//! ```

use crate::config::{FeedConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use crate::traits::{FeedClient, FeedClientFactory, StateStore, StateStoreFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Factories<T> = RwLock<HashMap<String, Box<T>>>;

/// Registry of feed-client and state-store factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered feed client factories
    feed_clients: Factories<dyn FeedClientFactory>,

    /// Registered state store factories
    state_stores: Factories<dyn StateStoreFactory>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `file` and `memory` state stores registered
    pub fn with_builtin_stores() -> Self {
        let registry = Self::new();
        registry.register_state_store("file", Box::new(FileStateStoreFactory));
        registry.register_state_store("memory", Box::new(MemoryStateStoreFactory));
        registry
    }

    /// Register a feed client factory
    ///
    /// # Parameters
    ///
    /// - `name`: Feed client type name (e.g., "youtube")
    /// - `factory`: Factory object for creating client instances
    pub fn register_feed_client(
        &self,
        name: impl Into<String>,
        factory: Box<dyn FeedClientFactory>,
    ) {
        write(&self.feed_clients).insert(name.into(), factory);
    }

    /// Register a state store factory
    ///
    /// # Parameters
    ///
    /// - `name`: State store type name (e.g., "file", "memory")
    /// - `factory`: Factory object for creating state store instances
    pub fn register_state_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StateStoreFactory>,
    ) {
        write(&self.state_stores).insert(name.into(), factory);
    }

    /// Create a feed client from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn FeedClient>)`: Created client instance
    /// - `Err(Error)`: If the client type is not registered or creation fails
    pub fn create_feed_client(&self, config: &FeedConfig) -> Result<Box<dyn FeedClient>> {
        let client_type = config.type_name();
        let clients = read(&self.feed_clients);

        let factory = clients
            .get(client_type)
            .ok_or_else(|| Error::config(format!("Unknown feed client type: {}", client_type)))?;

        factory.create(config)
    }

    /// Create a state store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn StateStore>)`: Created state store instance
    /// - `Err(Error)`: If store type is not registered or creation fails
    pub fn create_state_store(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
        let store_type = config.type_name();
        let stores = read(&self.state_stores);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown state store type: {}", store_type)))?;

        factory.create(config)
    }

    /// List all registered feed client types
    pub fn list_feed_clients(&self) -> Vec<String> {
        read(&self.feed_clients).keys().cloned().collect()
    }

    /// List all registered state store types
    pub fn list_state_stores(&self) -> Vec<String> {
        read(&self.state_stores).keys().cloned().collect()
    }

    /// Check if a feed client type is registered
    pub fn has_feed_client(&self, name: &str) -> bool {
        read(&self.feed_clients).contains_key(name)
    }

    /// Check if a state store type is registered
    pub fn has_state_store(&self, name: &str) -> bool {
        read(&self.state_stores).contains_key(name)
    }
}

// A poisoned map is still a valid map: registration is a single insert.
fn read<T: ?Sized>(lock: &Factories<T>) -> RwLockReadGuard<'_, HashMap<String, Box<T>>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T: ?Sized>(lock: &Factories<T>) -> RwLockWriteGuard<'_, HashMap<String, Box<T>>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
