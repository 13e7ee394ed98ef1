//! The in-memory resource provider.
//!
//! Serves values that were registered at runtime, keyed by path. This is the
//! backend behind the reserved `res#` name prefix; fetches never block on I/O
//! and fail only when the path was never registered.

use std::any::Any;
use std::sync::{Arc, RwLock};

use inlinable_string::InlinableString;

use crate::errors::Error;
use crate::key::AssetKey;
use crate::utils::FastHashMap;

use super::{Handle, Placement, Provider};

type DuplicateFn =
    Box<dyn Fn(&Arc<dyn Any + Send + Sync>) -> Arc<dyn Any + Send + Sync> + Send + Sync>;

struct Resource {
    value: Arc<dyn Any + Send + Sync>,
    duplicate: DuplicateFn,
}

/// A provider serving preregistered in-memory values.
pub struct ResourceProvider {
    items: RwLock<FastHashMap<InlinableString, Resource>>,
}

impl ResourceProvider {
    pub fn new() -> Self {
        ResourceProvider {
            items: RwLock::new(FastHashMap::default()),
        }
    }

    /// Registers a value under `path`, replacing whatever was there before.
    /// Duplication clones the registered value.
    pub fn register<T1, T2>(&self, path: T1, value: T2)
    where
        T1: Into<InlinableString>,
        T2: Any + Send + Sync + Clone,
    {
        let resource = Resource {
            value: Arc::new(value),
            duplicate: Box::new(|v| {
                // The closure is only ever stored alongside a value of the
                // matching type, so the downcast can not fail.
                let typed = v.clone().downcast::<T2>().unwrap();
                Arc::new((*typed).clone())
            }),
        };

        self.items.write().unwrap().insert(path.into(), resource);
    }

    /// Removes the value registered under `path`.
    pub fn unregister<T: AsRef<str>>(&self, path: T) {
        self.items
            .write()
            .unwrap()
            .remove(&InlinableString::from(path.as_ref()));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }
}

impl Provider for ResourceProvider {
    fn fetch(&self, key: &AssetKey) -> Result<Handle, failure::Error> {
        let items = self.items.read().unwrap();

        match items.get(&InlinableString::from(key.path())) {
            Some(resource) => Ok(Handle::new(key.clone(), resource.value.clone())),
            None => Err(Error::NotFound(key.clone()).into()),
        }
    }

    fn dispose(&self, handle: Handle) {
        // The master copy stays registered; disposing drops the cache's share.
        debug!("Disposes resource '{}'.", handle.key());
    }

    fn duplicate(
        &self,
        handle: &Handle,
        placement: &Placement,
    ) -> Result<Handle, failure::Error> {
        let items = self.items.read().unwrap();

        match items.get(&InlinableString::from(handle.key().path())) {
            Some(resource) => {
                let value = (resource.duplicate)(&resource.value);
                Ok(Handle::new(handle.key().clone(), value).with_placement(placement.clone()))
            }
            None => Err(Error::NotFound(handle.key().clone()).into()),
        }
    }
}
