//! The reference counted asset cache.
//!
//! `AssetCache` maps asset keys to loaded provider resources with shared
//! ownership. Acquiring a resident key bumps its reference count and returns
//! the stored handle right away; acquiring a key that is still being fetched
//! joins the in-flight load instead of starting a second one; acquiring an
//! absent key performs the fetch under a `RetryPolicy`. When the last
//! ownership to a given asset is dropped, the record is evicted and the
//! underlying resource is disposed through its provider.
//!
//! The map is mutated only by the cache itself, under a single lock that is
//! never held across a provider call or a wait.

use std::mem;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::key::AssetKey;
use crate::promise::Promise;
use crate::provider::{Handle, Provider};
use crate::retry::RetryPolicy;
use crate::utils::FastHashMap;

enum AssetState {
    Loading(Arc<Promise>),
    Ready(Handle),
}

struct Entry {
    rc: u32,
    state: AssetState,
}

/// A mapping from asset keys to loaded provider resources, with reference
/// counting and at-most-one-load-in-flight per key.
pub struct AssetCache {
    entries: RwLock<FastHashMap<AssetKey, Entry>>,
}

impl AssetCache {
    /// Creates a new and empty `AssetCache`.
    pub fn new() -> Self {
        AssetCache {
            entries: RwLock::new(FastHashMap::default()),
        }
    }

    /// Acquires a shared ownership of the asset named by `key`.
    ///
    /// If the asset is resident its reference count is incremented and the
    /// stored handle is returned without suspension. If a fetch for the same
    /// key is in flight, the caller joins it and observes the identical
    /// outcome. Otherwise the calling thread performs the fetch itself, with
    /// up to `max_retries` additional attempts on failure.
    ///
    /// A failed fetch leaves the cache key-absent, so a later acquire starts
    /// from scratch.
    pub fn acquire(
        &self,
        key: &AssetKey,
        provider: &dyn Provider,
        max_retries: u32,
    ) -> Result<Handle> {
        match self.join(key) {
            Join::Ready(handle) => Ok(handle),
            Join::Pending(promise) => promise.wait(),
            Join::Fetch => self.fetch(key, provider, max_retries),
        }
    }

    /// Same as `acquire`, except that a caller joining an in-flight fetch
    /// stops waiting once `timeout` elapses, un-joins and gets
    /// `Error::Timeout` back. The fetch itself is never aborted; remaining
    /// callers keep waiting for it, and if nobody remains the completed
    /// resource is disposed immediately.
    pub fn acquire_timeout(
        &self,
        key: &AssetKey,
        provider: &dyn Provider,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Handle> {
        match self.join(key) {
            Join::Ready(handle) => Ok(handle),
            Join::Pending(promise) => match promise.wait_timeout(timeout) {
                Some(outcome) => outcome,
                None => {
                    // Backs out of the join. Going through `release` covers
                    // the race where the fetch settled right at the deadline
                    // and this caller's count is the last one standing.
                    self.release(key, provider, false);
                    Err(Error::Timeout(key.clone()))
                }
            },
            Join::Fetch => self.fetch(key, provider, max_retries),
        }
    }

    /// Releases a shared ownership of the asset named by `key`. At zero
    /// references, or when `force` is set, the record is evicted and the
    /// resource is disposed through `provider`.
    ///
    /// Releasing a key with no record is a no-op; the surrounding code is
    /// allowed to manipulate cache state out of order and the cache heals
    /// around it.
    pub fn release(&self, key: &AssetKey, provider: &dyn Provider, force: bool) {
        let evicted = {
            let mut entries = self.entries.write().unwrap();

            let evict = match entries.get_mut(key) {
                Some(entry) => {
                    if entry.rc > 0 {
                        entry.rc -= 1;
                    }

                    match entry.state {
                        AssetState::Ready(_) => force || entry.rc == 0,
                        // Still loading; the completing fetch observes the
                        // dropped count and disposes by itself.
                        AssetState::Loading(_) => {
                            if force {
                                entry.rc = 0;
                            }
                            false
                        }
                    }
                }
                None => {
                    warn!("Releasing asset '{}' that is not in cache.", key);
                    false
                }
            };

            if evict {
                entries.remove(key).and_then(|entry| match entry.state {
                    AssetState::Ready(handle) => Some(handle),
                    AssetState::Loading(_) => None,
                })
            } else {
                None
            }
        };

        if let Some(handle) = evicted {
            provider.dispose(handle);
        }
    }

    /// Evicts every record regardless of outstanding references, disposing
    /// resident resources through `provider`. Records still loading are left
    /// for their fetches to clean up.
    pub fn release_all(&self, provider: &dyn Provider) {
        let evicted: Vec<Handle> = {
            let mut entries = self.entries.write().unwrap();
            let mut handles = Vec::new();

            entries.retain(|_, entry| match entry.state {
                AssetState::Ready(ref handle) => {
                    handles.push(handle.clone());
                    false
                }
                AssetState::Loading(_) => {
                    entry.rc = 0;
                    true
                }
            });

            handles
        };

        for handle in evicted {
            provider.dispose(handle);
        }
    }

    /// Checks if the cache holds a record for `key`, loading or ready.
    #[inline]
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }

    /// Gets the stored handle without touching the reference count. Returns
    /// None for absent or still-loading keys.
    #[inline]
    pub fn peek(&self, key: &AssetKey) -> Option<Handle> {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .and_then(|entry| match entry.state {
                AssetState::Ready(ref handle) => Some(handle.clone()),
                AssetState::Loading(_) => None,
            })
    }

    /// Gets the number of records, loading or ready.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the fast path under the lock: bump and return for resident keys,
    /// join for pending ones, or claim the fetch by inserting a loading
    /// record.
    fn join(&self, key: &AssetKey) -> Join {
        let mut entries = self.entries.write().unwrap();

        if let Some(entry) = entries.get_mut(key) {
            entry.rc += 1;
            match entry.state {
                AssetState::Ready(ref handle) => Join::Ready(handle.clone()),
                AssetState::Loading(ref promise) => Join::Pending(promise.clone()),
            }
        } else {
            let entry = Entry {
                rc: 1,
                state: AssetState::Loading(Arc::new(Promise::new())),
            };

            entries.insert(key.clone(), entry);
            Join::Fetch
        }
    }

    /// Performs the one fetch for `key` and publishes the outcome to every
    /// joined caller. Runs on the claiming caller's thread, outside the lock.
    fn fetch(
        &self,
        key: &AssetKey,
        provider: &dyn Provider,
        max_retries: u32,
    ) -> Result<Handle> {
        let policy = RetryPolicy::new(max_retries);
        let outcome = policy
            .run(key, || provider.fetch(key))
            .map_err(|err| fold_error(key, policy.attempts(), err));

        match outcome {
            Ok(handle) => {
                let (promise, orphan) = {
                    let mut entries = self.entries.write().unwrap();

                    let settled = match entries.get_mut(key) {
                        Some(entry) => {
                            let state =
                                mem::replace(&mut entry.state, AssetState::Ready(handle.clone()));
                            let promise = match state {
                                AssetState::Loading(promise) => Some(promise),
                                AssetState::Ready(_) => None,
                            };

                            Some((promise, entry.rc == 0))
                        }
                        None => None,
                    };

                    match settled {
                        // Every joined caller bailed out while the fetch was
                        // running; nobody owns the record anymore.
                        Some((promise, true)) => {
                            entries.remove(key);
                            (promise, true)
                        }
                        Some((promise, false)) => (promise, false),
                        None => {
                            warn!("Asset '{}' was evicted while loading.", key);
                            (None, true)
                        }
                    }
                };

                if orphan {
                    provider.dispose(handle.clone());
                }

                if let Some(promise) = promise {
                    promise.set(Ok(handle.clone()));
                }

                Ok(handle)
            }
            Err(err) => {
                let promise = {
                    let mut entries = self.entries.write().unwrap();
                    entries.remove(key).and_then(|entry| match entry.state {
                        AssetState::Loading(promise) => Some(promise),
                        AssetState::Ready(_) => None,
                    })
                };

                if let Some(promise) = promise {
                    promise.set(Err(err.clone()));
                }

                Err(err)
            }
        }
    }
}

/// Folds a provider failure into a crate-local error kind. Providers are free
/// to surface crate-local kinds themselves, like `NotFound`; anything else is
/// reported as an exhausted fetch.
fn fold_error(key: &AssetKey, attempts: u32, err: failure::Error) -> Error {
    match err.downcast::<Error>() {
        Ok(err) => err,
        Err(err) => Error::ProviderFailure {
            key: key.clone(),
            attempts: attempts,
            cause: err.to_string(),
        },
    }
}

enum Join {
    Ready(Handle),
    Pending(Arc<Promise>),
    Fetch,
}
