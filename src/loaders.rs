//! The `AssetSystem` is the single entry point external callers use.
//!
//! It translates readable names into normalized keys, applies the `res#`
//! prefix convention once at the boundary to pick the backing provider, and
//! exposes preload, load, instantiate, unload and release as orthogonal
//! operations.
//!
//! Nothing here throws across the public boundary. Failures come back as
//! sentinel values (None, empty) with a logged warning, so call sites remain
//! straight-line code. Each provider gets its own cache and group index pair,
//! which keeps identical paths in different namespaces from ever colliding.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use inlinable_string::InlinableString;
use smallvec::SmallVec;

use crate::cache::AssetCache;
use crate::errors::{Error, Result};
use crate::group::GroupCache;
use crate::key::{refine_name, AssetKey, ProviderKind};
use crate::provider::{BundleProvider, Handle, Placement, Provider, ResourceProvider};
use crate::sched::ScheduleSystem;

/// The package namespace that backs `res#` names.
const RESOURCES_PACKAGE: &str = "res";

/// Progress callback contract: (fraction in 0..=1, settled count, total
/// count). Invoked once per settled entry; the final call of a non-empty
/// batch always reports fraction 1.0.
pub type Progression = dyn Fn(f32, usize, usize) + Send + Sync;

/// Construction parameters of `AssetSystem`.
#[derive(Debug, Clone)]
pub struct AssetSystemParams {
    /// The package used for bundle names that do not specify one.
    pub default_package: InlinableString,
    /// The retry budget applied when `LoadOptions` does not override it.
    pub max_retries: u32,
    /// The number of worker threads draining background preloads.
    pub workers: u32,
}

impl Default for AssetSystemParams {
    fn default() -> Self {
        AssetSystemParams {
            default_package: InlinableString::from("main"),
            max_retries: 3,
            workers: 2,
        }
    }
}

/// Per-call options. One struct with defaults instead of a pile of near
/// identical method signatures.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the system wide default package for bundle names.
    pub package: Option<InlinableString>,
    /// Overrides the system wide retry budget.
    pub max_retries: Option<u32>,
}

#[derive(Clone)]
struct CachePair {
    cache: Arc<AssetCache>,
    groups: Arc<GroupCache>,
}

impl CachePair {
    fn new() -> Self {
        CachePair {
            cache: Arc::new(AssetCache::new()),
            groups: Arc::new(GroupCache::new()),
        }
    }
}

/// The provider routing tables, bundled up so background jobs can carry a
/// cheap clone of them.
#[derive(Clone)]
struct Dispatch {
    resources: Arc<ResourceProvider>,
    bundles: Arc<BundleProvider>,
    res: CachePair,
    bundle: CachePair,
}

impl Dispatch {
    fn pair(&self, kind: ProviderKind) -> &CachePair {
        match kind {
            ProviderKind::Resource => &self.res,
            ProviderKind::Bundle => &self.bundle,
        }
    }

    fn provider(&self, kind: ProviderKind) -> &dyn Provider {
        match kind {
            ProviderKind::Resource => self.resources.as_ref() as &dyn Provider,
            ProviderKind::Bundle => self.bundles.as_ref() as &dyn Provider,
        }
    }

    fn acquire(
        &self,
        kind: ProviderKind,
        key: &AssetKey,
        group: Option<i32>,
        max_retries: u32,
    ) -> Result<Handle> {
        let pair = self.pair(kind);
        match group {
            Some(group) => {
                pair.groups
                    .acquire_tagged(&pair.cache, group, key, self.provider(kind), max_retries)
            }
            None => pair.cache.acquire(key, self.provider(kind), max_retries),
        }
    }

    /// Warms a refined batch into the caches. Failed entries are logged and
    /// still advance the progress report, so a flaky asset can not stall the
    /// whole batch.
    fn preload(
        &self,
        refined: &[(ProviderKind, AssetKey)],
        group: Option<i32>,
        max_retries: u32,
        progression: Option<&Progression>,
    ) {
        let total = refined.len();

        for (i, (kind, key)) in refined.iter().enumerate() {
            if let Err(err) = self.acquire(*kind, key, group, max_retries) {
                warn!("Preloading '{}' failed. {}", key, err);
            }

            report(progression, i + 1, total);
        }
    }
}

fn report(progression: Option<&Progression>, current: usize, total: usize) {
    if let Some(func) = progression {
        func(current as f32 / total as f32, current, total);
    }
}

fn mismatch<T>(key: &AssetKey) -> Error {
    Error::TypeMismatch {
        key: key.clone(),
        expected: ::std::any::type_name::<T>(),
    }
}

/// The public entry point composing caches, group indices, the retry policy
/// and the two backing providers.
///
/// `AssetSystem` is an explicitly constructed, caller-owned instance; pass it
/// around or wrap it in an `Arc`, there is no hidden process-wide state.
pub struct AssetSystem {
    params: AssetSystemParams,
    dispatch: Dispatch,
    sched: ScheduleSystem,
}

impl AssetSystem {
    /// Creates a new `AssetSystem`.
    pub fn new(params: AssetSystemParams) -> Self {
        info!(
            "Setup asset system with default package '{}' and {} workers.",
            params.default_package, params.workers
        );

        let dispatch = Dispatch {
            resources: Arc::new(ResourceProvider::new()),
            bundles: Arc::new(BundleProvider::new()),
            res: CachePair::new(),
            bundle: CachePair::new(),
        };

        AssetSystem {
            sched: ScheduleSystem::new(params.workers),
            params: params,
            dispatch: dispatch,
        }
    }

    /// The provider serving `res#` names. Register in-memory values here.
    #[inline]
    pub fn resources(&self) -> &ResourceProvider {
        &self.dispatch.resources
    }

    /// The provider serving bundle names. Mount package directories here.
    #[inline]
    pub fn bundles(&self) -> &BundleProvider {
        &self.dispatch.bundles
    }

    /// Checks if the asset named by `name` is in cache, loading or ready.
    pub fn contains(&self, name: &str) -> bool {
        match self.refine(name, &LoadOptions::default()) {
            Some((kind, key)) => self.dispatch.pair(kind).cache.contains(&key),
            None => false,
        }
    }

    /// Checks if the asset named by `name` is recorded under `group`.
    pub fn contains_tagged(&self, group: i32, name: &str) -> bool {
        match self.refine(name, &LoadOptions::default()) {
            Some((kind, key)) => self.dispatch.pair(kind).groups.contains(group, &key),
            None => false,
        }
    }

    /// Gets the cached value of `name` without touching its reference count.
    pub fn peek<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let (kind, key) = self.refine(name, &LoadOptions::default())?;
        self.dispatch
            .pair(kind)
            .cache
            .peek(&key)
            .and_then(|handle| handle.downcast::<T>())
    }

    /// Loads the asset named by `name` and returns its typed value, bumping
    /// the reference count. Returns None on any failure, with the cause
    /// logged.
    pub fn load<T: Any + Send + Sync>(
        &self,
        name: &str,
        opts: LoadOptions,
        progression: Option<&Progression>,
    ) -> Option<Arc<T>> {
        self.load_impl(name, &opts, None, progression)
    }

    /// Same as `load`, additionally recording the key under `group`.
    pub fn load_tagged<T: Any + Send + Sync>(
        &self,
        group: i32,
        name: &str,
        opts: LoadOptions,
        progression: Option<&Progression>,
    ) -> Option<Arc<T>> {
        self.load_impl(name, &opts, Some(group), progression)
    }

    /// Loads the asset named by `name` and hands back an independent copy
    /// produced by the provider, configured with `placement`. The cached
    /// original stays resident until it is unloaded. Returns None on any
    /// failure, with the cause logged.
    pub fn instantiate<T: Any + Send + Sync>(
        &self,
        name: &str,
        placement: Placement,
        opts: LoadOptions,
        progression: Option<&Progression>,
    ) -> Option<Arc<T>> {
        self.instantiate_impl(name, placement, &opts, None, progression)
    }

    /// Same as `instantiate`, additionally recording the key under `group`.
    pub fn instantiate_tagged<T: Any + Send + Sync>(
        &self,
        group: i32,
        name: &str,
        placement: Placement,
        opts: LoadOptions,
        progression: Option<&Progression>,
    ) -> Option<Arc<T>> {
        self.instantiate_impl(name, placement, &opts, Some(group), progression)
    }

    /// Warms a batch of names into the caches without handing out values.
    /// Blank names are skipped without failing the batch.
    pub fn preload(&self, names: &[&str], opts: LoadOptions, progression: Option<&Progression>) {
        let refined = self.refine_batch(names, &opts);
        let max_retries = self.max_retries(&opts);
        self.dispatch.preload(&refined, None, max_retries, progression);
    }

    /// Same as `preload`, additionally recording every key under `group`.
    pub fn preload_tagged(
        &self,
        group: i32,
        names: &[&str],
        opts: LoadOptions,
        progression: Option<&Progression>,
    ) {
        let refined = self.refine_batch(names, &opts);
        let max_retries = self.max_retries(&opts);
        self.dispatch
            .preload(&refined, Some(group), max_retries, progression);
    }

    /// Fire-and-forget variant of `preload`, executed on the worker pool.
    pub fn preload_background(
        &self,
        names: &[&str],
        opts: LoadOptions,
        progression: Option<Arc<Progression>>,
    ) {
        let refined = self.refine_batch(names, &opts).into_vec();
        let max_retries = self.max_retries(&opts);
        let dispatch = self.dispatch.clone();

        self.sched.shared().spawn(move || {
            let progression = progression.as_ref().map(|v| v.as_ref());
            dispatch.preload(&refined, None, max_retries, progression);
        });
    }

    /// Releases one shared ownership of the asset named by `name`; `force`
    /// bypasses the reference counting and evicts the record outright.
    pub fn unload(&self, name: &str, opts: LoadOptions, force: bool) {
        if let Some((kind, key)) = self.refine(name, &opts) {
            let pair = self.dispatch.pair(kind);
            pair.cache.release(&key, self.dispatch.provider(kind), force);
        }
    }

    /// Same as `unload`, additionally dropping the key's membership in
    /// `group`.
    pub fn unload_tagged(&self, group: i32, name: &str, opts: LoadOptions, force: bool) {
        if let Some((kind, key)) = self.refine(name, &opts) {
            let pair = self.dispatch.pair(kind);
            pair.cache.release(&key, self.dispatch.provider(kind), force);
            pair.groups.remove(group, &key);
        }
    }

    /// Releases every key recorded under `group`, in both namespaces.
    pub fn release_group(&self, group: i32, force: bool) {
        for kind in &[ProviderKind::Resource, ProviderKind::Bundle] {
            let pair = self.dispatch.pair(*kind);
            pair.groups
                .release_group(&pair.cache, group, self.dispatch.provider(*kind), force);
        }
    }

    /// Evicts every resource asset regardless of outstanding references.
    pub fn release_resources(&self) {
        let pair = self.dispatch.pair(ProviderKind::Resource);
        pair.cache.release_all(self.dispatch.resources.as_ref());
        pair.groups.clear();
    }

    /// Evicts every bundle asset regardless of outstanding references.
    pub fn release_bundles(&self) {
        let pair = self.dispatch.pair(ProviderKind::Bundle);
        pair.cache.release_all(self.dispatch.bundles.as_ref());
        pair.groups.clear();
    }

    /// Evicts everything.
    pub fn release_all(&self) {
        self.release_resources();
        self.release_bundles();
    }

    /// Returns the on-disk location of a bundle asset, warming it through the
    /// cache just long enough to ask its provider. Resource names have no
    /// load path and yield None with a warning.
    pub fn raw_file_path(&self, name: &str, opts: LoadOptions) -> Option<PathBuf> {
        let (kind, _) = refine_name(name);
        if kind == ProviderKind::Resource {
            warn!("Only bundle assets have load paths; '{}' has not.", name);
            return None;
        }

        match self.acquire(name, &opts, None) {
            Ok((kind, key, handle)) => {
                let path = self.dispatch.provider(kind).load_path(&handle);
                self.dispatch
                    .pair(kind)
                    .cache
                    .release(&key, self.dispatch.provider(kind), true);
                path
            }
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }

    /// Blocks current thread until queued background preloads finished, then
    /// shuts the worker pool down. Called implicitly on drop.
    pub fn terminate(&self) {
        self.sched.terminate();
    }

    fn load_impl<T: Any + Send + Sync>(
        &self,
        name: &str,
        opts: &LoadOptions,
        group: Option<i32>,
        progression: Option<&Progression>,
    ) -> Option<Arc<T>> {
        match self.acquire(name, opts, group) {
            Ok((kind, key, handle)) => {
                report(progression, 1, 1);

                match handle.downcast::<T>() {
                    Some(v) => Some(v),
                    None => {
                        warn!("{}", mismatch::<T>(&key));
                        self.release_one(kind, &key);
                        None
                    }
                }
            }
            Err(err) => {
                warn!("{}", err);
                report(progression, 1, 1);
                None
            }
        }
    }

    fn instantiate_impl<T: Any + Send + Sync>(
        &self,
        name: &str,
        placement: Placement,
        opts: &LoadOptions,
        group: Option<i32>,
        progression: Option<&Progression>,
    ) -> Option<Arc<T>> {
        let (kind, key, handle) = match self.acquire(name, opts, group) {
            Ok(v) => v,
            Err(err) => {
                warn!("{}", err);
                report(progression, 1, 1);
                return None;
            }
        };

        report(progression, 1, 1);

        match self.dispatch.provider(kind).duplicate(&handle, &placement) {
            Ok(duplicated) => match duplicated.downcast::<T>() {
                Some(v) => Some(v),
                None => {
                    warn!("{}", mismatch::<T>(&key));
                    self.release_one(kind, &key);
                    None
                }
            },
            Err(err) => {
                warn!("{}", err);
                self.release_one(kind, &key);
                None
            }
        }
    }

    /// Undoes a single acquisition after a failed downstream step.
    fn release_one(&self, kind: ProviderKind, key: &AssetKey) {
        let pair = self.dispatch.pair(kind);
        pair.cache.release(key, self.dispatch.provider(kind), false);
    }

    fn acquire(
        &self,
        name: &str,
        opts: &LoadOptions,
        group: Option<i32>,
    ) -> Result<(ProviderKind, AssetKey, Handle)> {
        let (kind, stripped) = refine_name(name);
        let key = self.key_of(kind, stripped, opts)?;
        let handle = self
            .dispatch
            .acquire(kind, &key, group, self.max_retries(opts))?;
        Ok((kind, key, handle))
    }

    /// Builds a normalized key. Resource names live in their own reserved
    /// namespace; bundle names land in the requested or default package.
    fn key_of(&self, kind: ProviderKind, stripped: &str, opts: &LoadOptions) -> Result<AssetKey> {
        match kind {
            ProviderKind::Resource => AssetKey::new(RESOURCES_PACKAGE, stripped),
            ProviderKind::Bundle => {
                let package = opts
                    .package
                    .clone()
                    .unwrap_or_else(|| self.params.default_package.clone());
                AssetKey::new(package, stripped)
            }
        }
    }

    fn refine(&self, name: &str, opts: &LoadOptions) -> Option<(ProviderKind, AssetKey)> {
        let (kind, stripped) = refine_name(name);
        match self.key_of(kind, stripped, opts) {
            Ok(key) => Some((kind, key)),
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }

    fn refine_batch(
        &self,
        names: &[&str],
        opts: &LoadOptions,
    ) -> SmallVec<[(ProviderKind, AssetKey); 8]> {
        let mut refined = SmallVec::new();

        for name in names {
            if name.trim().is_empty() {
                continue;
            }

            let (kind, stripped) = refine_name(name);
            match self.key_of(kind, stripped, opts) {
                Ok(key) => refined.push((kind, key)),
                Err(err) => warn!("Skips preloading '{}'. {}", name, err),
            }
        }

        refined
    }

    fn max_retries(&self, opts: &LoadOptions) -> u32 {
        opts.max_retries.unwrap_or(self.params.max_retries)
    }
}
