//! # What is This?
//!
//! `satchel` is a small and portable asset management framework. It takes care of
//! loading data asynchronously from pluggable backends, and provides a standardized
//! interface for creation, destruction, sharing and lifetime management of the
//! loaded assets.
//!
//! ## Cache
//!
//! Every loaded asset is tracked in a `AssetCache` with a simple reference-counting
//! technique. Acquiring an asset that is already resident increases its reference
//! count and returns the shared handle immediately. When the last ownership to a
//! given asset is dropped, the underlying resource is disposed through its provider.
//!
//! Concurrent acquisitions of the same key are folded into one in-flight fetch, so
//! a asset is never loaded twice no matter how many callers race for it. Callers
//! that join a pending load are suspended on the same promise and observe the
//! identical outcome.
//!
//! ## Group
//!
//! Assets could be tagged with a arbitrary group identifier on acquisition. The
//! `GroupCache` keeps a secondary index from group to keys, which makes it trival
//! to release a whole batch of assets at once, like everything a closed screen or
//! level was holding on to.
//!
//! ## Provider
//!
//! The actual fetch and dispose operations are delegated to a `Provider`. Two
//! built-in providers are shipped:
//!
//! 1. `ResourceProvider` serves preregistered in-memory values, and is selected
//! with the reserved `res#` name prefix.
//! 2. `BundleProvider` serves files from mounted package directories, located
//! through a binary manifest.
//!
//! The `AssetSystem` facade applies the prefix convention once at its boundary
//! and routes every operation to the right provider.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod utils;

pub mod errors;
pub mod sched;

pub mod cache;
pub mod group;
pub mod key;
pub mod loaders;
pub mod promise;
pub mod provider;
pub mod retry;

pub mod prelude {
    pub use crate::cache::AssetCache;
    pub use crate::errors::Error;
    pub use crate::group::GroupCache;
    pub use crate::key::{refine_name, AssetKey, ProviderKind};
    pub use crate::loaders::{AssetSystem, AssetSystemParams, LoadOptions, Progression};
    pub use crate::provider::{Handle, Placement, Provider};
    pub use crate::retry::RetryPolicy;
}
