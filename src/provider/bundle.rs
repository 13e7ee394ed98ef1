//! The bundle provider.
//!
//! Serves raw file contents from mounted package directories. Every package
//! carries a binary `.MANIFEST` at its root which redirects readable asset
//! paths into actual file locations; fetching reads the located file into
//! memory and remembers where it came from for raw-file use cases.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use inlinable_string::InlinableString;

use crate::errors::Error;
use crate::key::AssetKey;
use crate::utils::FastHashMap;

use super::manifest::{self, Manifest, Resolver};
use super::{Handle, Placement, Provider};

struct Package {
    root: PathBuf,
    resolver: Resolver,
}

/// A provider serving files from mounted package directories, located through
/// their manifests.
pub struct BundleProvider {
    packages: RwLock<FastHashMap<InlinableString, Package>>,
}

impl BundleProvider {
    pub fn new() -> Self {
        BundleProvider {
            packages: RwLock::new(FastHashMap::default()),
        }
    }

    /// Mounts the package directory at `root` under `package`, reading its
    /// manifest eagerly.
    pub fn attach<T1, T2>(&self, package: T1, root: T2) -> Result<(), failure::Error>
    where
        T1: Into<InlinableString>,
        T2: Into<PathBuf>,
    {
        let package = package.into();
        let root = root.into();

        let metadata = fs::metadata(&root)?;
        if !metadata.is_dir() {
            bail!("{:?} is not a decent directory.", root);
        }

        let mut file = fs::File::open(root.join(manifest::NAME))?;
        let manifest = Manifest::load_from(&mut file)?;

        let mut resolver = Resolver::new();
        resolver.add(&manifest);

        info!(
            "Mounts package '{}' ({} assets) at {:?}.",
            package,
            resolver.len(),
            root
        );

        let pkg = Package {
            root: root,
            resolver: resolver,
        };

        self.packages.write().unwrap().insert(package, pkg);
        Ok(())
    }

    /// Unmounts a package. Assets already resident in a cache stay alive until
    /// they are released.
    pub fn detach<T: AsRef<str>>(&self, package: T) {
        let package = package.as_ref();
        if self
            .packages
            .write()
            .unwrap()
            .remove(&InlinableString::from(package))
            .is_some()
        {
            info!("Unmounts package '{}'.", package);
        }
    }

    #[inline]
    pub fn is_attached<T: AsRef<str>>(&self, package: T) -> bool {
        self.packages
            .read()
            .unwrap()
            .contains_key(&InlinableString::from(package.as_ref()))
    }

    fn locate(&self, key: &AssetKey) -> Result<PathBuf, failure::Error> {
        let packages = self.packages.read().unwrap();

        let pkg = packages
            .get(&InlinableString::from(key.package()))
            .ok_or_else(|| Error::NotFound(key.clone()))?;

        let uuid = pkg
            .resolver
            .find(key.path())
            .ok_or_else(|| Error::NotFound(key.clone()))?;

        let location = pkg
            .resolver
            .locate(uuid)
            .ok_or_else(|| Error::NotFound(key.clone()))?;

        Ok(pkg.root.join(Path::new(location)))
    }
}

impl Provider for BundleProvider {
    fn fetch(&self, key: &AssetKey) -> Result<Handle, failure::Error> {
        let location = self.locate(key)?;

        let mut file = fs::File::open(&location)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        Ok(Handle::new(key.clone(), Arc::new(bytes)).with_load_path(location))
    }

    fn dispose(&self, handle: Handle) {
        debug!("Disposes bundle asset '{}'.", handle.key());
    }

    fn duplicate(
        &self,
        handle: &Handle,
        placement: &Placement,
    ) -> Result<Handle, failure::Error> {
        let bytes = handle
            .downcast::<Vec<u8>>()
            .ok_or_else(|| Error::TypeMismatch {
                key: handle.key().clone(),
                expected: "Vec<u8>",
            })?;

        let mut duplicated = Handle::new(handle.key().clone(), Arc::new((*bytes).clone()))
            .with_placement(placement.clone());

        if let Some(path) = handle.load_path() {
            duplicated = duplicated.with_load_path(path);
        }

        Ok(duplicated)
    }
}
