//! Backing providers that perform the actual fetch and dispose of assets.
//!
//! The cache never touches bytes or files itself. It hands a `AssetKey` to a
//! `Provider` and stores whatever opaque `Handle` comes back. Two providers are
//! shipped out of the box, one serving preregistered in-memory values and one
//! serving files from mounted package directories.

pub mod bundle;
pub mod manifest;
pub mod resource;

pub use self::bundle::BundleProvider;
pub use self::manifest::{Manifest, ManifestItem, Resolver};
pub use self::resource::ResourceProvider;

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cgmath::{Quaternion, Vector3};
use inlinable_string::InlinableString;

use crate::key::AssetKey;

/// An opaque shared reference to a loaded asset. Handles are cheap to clone and
/// perfectly safe to store and pass around even after the cache has evicted the
/// underlying record.
#[derive(Clone)]
pub struct Handle {
    key: AssetKey,
    value: Arc<dyn Any + Send + Sync>,
    load_path: Option<PathBuf>,
    placement: Option<Placement>,
}

impl Handle {
    pub fn new(key: AssetKey, value: Arc<dyn Any + Send + Sync>) -> Self {
        Handle {
            key: key,
            value: value,
            load_path: None,
            placement: None,
        }
    }

    /// Attaches the on-disk location the asset was loaded from.
    pub fn with_load_path<T: Into<PathBuf>>(mut self, path: T) -> Self {
        self.load_path = Some(path.into());
        self
    }

    /// Attaches the placement a duplicated asset was produced with.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    #[inline]
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    #[inline]
    pub fn load_path(&self) -> Option<&Path> {
        self.load_path.as_ref().map(|v| v.as_path())
    }

    #[inline]
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// Gets the typed value if the underlying asset is a `T`.
    #[inline]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// Checks if two handles share the identical underlying value.
    #[inline]
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Handle")
            .field("key", &self.key)
            .field("load_path", &self.load_path)
            .finish()
    }
}

/// Spatial configuration for duplicated assets. The cache passes it through to
/// the provider unmodified; what it means is entirely up to the collaborator
/// that consumes the duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub parent: Option<InlinableString>,
    pub world_position_stays: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Placement {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            parent: None,
            world_position_stays: false,
        }
    }
}

/// The contract a backing subsystem implements to serve assets.
///
/// Fetches are allowed to fail transiently; the cache wraps them with a
/// `RetryPolicy`. Dispose is invoked exactly once per evicted record, with the
/// handle the provider returned from its fetch.
pub trait Provider: Send + Sync + 'static {
    /// Fetches the asset named by `key`. This is the potentially expensive,
    /// I/O-bound part and might be invoked from any thread.
    fn fetch(&self, key: &AssetKey) -> Result<Handle, failure::Error>;

    /// Disposes a handle previously returned from `fetch`.
    fn dispose(&self, handle: Handle);

    /// Produces an independent copy of a loaded asset, suitable for handing to
    /// a collaborator that will place it somewhere.
    fn duplicate(&self, handle: &Handle, placement: &Placement)
        -> Result<Handle, failure::Error>;

    /// Returns the on-disk location of the asset behind `handle`, if there is
    /// one. Providers that never touch the filesystem return None.
    fn load_path(&self, handle: &Handle) -> Option<PathBuf> {
        handle.load_path().map(|v| v.to_path_buf())
    }
}
