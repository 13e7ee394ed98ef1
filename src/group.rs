//! Group-scoped bulk lifecycle operations, layered on top of `AssetCache`.
//!
//! Callers may tag an acquisition with an arbitrary integer group id. The
//! `GroupCache` keeps a secondary index from group to keys, so everything a
//! screen or level acquired can be released in one call when it goes away.
//!
//! The index is advisory. A key released to zero through the ungrouped path
//! leaves a stale membership behind, which the next bulk release simply skips
//! over; the cache's own reference counts stay authoritative at all times.

use std::sync::RwLock;

use crate::cache::AssetCache;
use crate::errors::Result;
use crate::key::AssetKey;
use crate::provider::{Handle, Provider};
use crate::utils::{FastHashMap, FastHashSet};

/// A secondary index partitioning cache entries by caller-assigned group ids.
/// A key may belong to any number of groups at once.
pub struct GroupCache {
    groups: RwLock<FastHashMap<i32, FastHashSet<AssetKey>>>,
}

impl GroupCache {
    /// Creates a new and empty `GroupCache`.
    pub fn new() -> Self {
        GroupCache {
            groups: RwLock::new(FastHashMap::default()),
        }
    }

    /// Acquires through `cache` and records `key` under `group`. Re-adding an
    /// existing membership is a no-op. Nothing is recorded when the
    /// acquisition fails.
    pub fn acquire_tagged(
        &self,
        cache: &AssetCache,
        group: i32,
        key: &AssetKey,
        provider: &dyn Provider,
        max_retries: u32,
    ) -> Result<Handle> {
        let handle = cache.acquire(key, provider, max_retries)?;

        let mut groups = self.groups.write().unwrap();
        groups
            .entry(group)
            .or_insert_with(FastHashSet::default)
            .insert(key.clone());

        Ok(handle)
    }

    /// Releases every key currently recorded under `group` and clears the
    /// group. Iteration order is irrelevant since every key's reference count
    /// is independent; stale memberships are skipped by the cache itself.
    /// Calling this twice in a row is the same as calling it once.
    pub fn release_group(
        &self,
        cache: &AssetCache,
        group: i32,
        provider: &dyn Provider,
        force: bool,
    ) {
        // Snapshot and clear under our own lock, release after dropping it;
        // the cache lock and the group lock are never held together.
        let keys = self.groups.write().unwrap().remove(&group);

        match keys {
            Some(keys) => {
                for key in &keys {
                    cache.release(key, provider, force);
                }
            }
            None => debug!("Group {} has nothing to release.", group),
        }
    }

    /// Drops the membership of `key` in `group` without touching the cache.
    pub fn remove(&self, group: i32, key: &AssetKey) {
        let mut groups = self.groups.write().unwrap();

        let prune = match groups.get_mut(&group) {
            Some(keys) => {
                keys.remove(key);
                keys.is_empty()
            }
            None => false,
        };

        if prune {
            groups.remove(&group);
        }
    }

    /// Checks if `key` is currently recorded under `group`.
    #[inline]
    pub fn contains(&self, group: i32, key: &AssetKey) -> bool {
        self.groups
            .read()
            .unwrap()
            .get(&group)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    /// Gets the number of keys recorded under `group`.
    #[inline]
    pub fn len(&self, group: i32) -> usize {
        self.groups
            .read()
            .unwrap()
            .get(&group)
            .map(|keys| keys.len())
            .unwrap_or(0)
    }

    /// Drops every group index without touching the cache.
    pub fn clear(&self) {
        self.groups.write().unwrap().clear();
    }
}
