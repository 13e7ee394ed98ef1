//! Normalized asset identifiers.
//!
//! A `AssetKey` names a loadable asset with two parts, a package namespace and a
//! readable path inside it, like `"main:textures/crate.png"`. Keys compare and
//! hash by their string values.

use std::fmt;

use inlinable_string::InlinableString;

use crate::errors::*;

/// The reserved name prefix that selects the in-memory resource provider instead
/// of the bundle provider.
pub const RESOURCES_PREFIX: &str = "res#";

/// The backing provider a name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Resource,
    Bundle,
}

/// Strips the reserved `res#` prefix from a name and picks the provider it routes
/// to. Pure function, applied once at the facade boundary.
///
/// A name that consists of nothing but the prefix is not considered refined and
/// routes to the bundle provider untouched.
pub fn refine_name(name: &str) -> (ProviderKind, &str) {
    if name.len() > RESOURCES_PREFIX.len() && name.starts_with(RESOURCES_PREFIX) {
        (ProviderKind::Resource, &name[RESOURCES_PREFIX.len()..])
    } else {
        (ProviderKind::Bundle, name)
    }
}

/// Normalized (package, path) identifier for a loadable asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    package: InlinableString,
    path: InlinableString,
}

impl AssetKey {
    /// Creates a new key. The path part MUST not be empty.
    pub fn new<T1, T2>(package: T1, path: T2) -> Result<Self>
    where
        T1: Into<InlinableString>,
        T2: Into<InlinableString>,
    {
        let package = package.into();
        let path = path.into();

        if path.is_empty() {
            return Err(Error::InvalidKey(format!("{}:", package)));
        }

        Ok(AssetKey {
            package: package,
            path: path,
        })
    }

    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.path)
    }
}
