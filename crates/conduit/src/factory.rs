//! A named-instance registry: `create(name, config, transport)` returns the
//! existing facade if one was already built under that name, for that
//! transport type, rather than constructing a second one (spec §6).
//!
//! Keyed first on the transport type (via [`TypeId`]) and then on the
//! caller-supplied name, the same two-level shape as a plugin-builder
//! registry keyed on a type tag before dispatching to a named builder.

use crate::config::FacadeConfigBuilder;
use crate::facade::Facade;
use conduit_middleware::Transport;
use conduit_upload::ChunkTransport;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type NamedInstances = Mutex<HashMap<String, Box<dyn Any + Send + Sync>>>;

static REGISTRY: Lazy<Mutex<HashMap<TypeId, NamedInstances>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Builds or reuses a named [`Facade`] instance.
///
/// The first call for a given `(transport type, name)` pair builds the
/// facade from `config` and caches it; every later call with the same pair
/// returns that cached instance and ignores `config`.
pub struct Factory;

impl Factory {
    pub fn create<T>(name: impl Into<String>, config: FacadeConfigBuilder, transport: T) -> Arc<Facade<T>>
    where
        T: Transport + ChunkTransport<Error = <T as Transport>::Error> + Clone + 'static,
    {
        let name = name.into();
        let type_id = TypeId::of::<T>();

        let mut registry = REGISTRY.lock().expect("facade registry poisoned");
        let instances = registry
            .entry(type_id)
            .or_insert_with(|| Mutex::new(HashMap::new()));

        let mut instances = instances.lock().expect("facade instance map poisoned");
        if let Some(existing) = instances.get(&name) {
            return existing
                .downcast_ref::<Arc<Facade<T>>>()
                .expect("TypeId-keyed facade registry entry had the wrong concrete type")
                .clone();
        }

        let facade = Arc::new(config.build(transport));
        instances.insert(name, Box::new(facade.clone()));
        facade
    }

    /// Removes the named instance (for the given transport type) from the
    /// registry without affecting handles already cloned out of it.
    pub fn remove<T>(name: &str)
    where
        T: Transport + ChunkTransport<Error = <T as Transport>::Error> + 'static,
    {
        let registry = REGISTRY.lock().expect("facade registry poisoned");
        if let Some(instances) = registry.get(&TypeId::of::<T>()) {
            instances
                .lock()
                .expect("facade instance map poisoned")
                .remove(name);
        }
    }
}
