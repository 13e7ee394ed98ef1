//! Manifest for all the assets in a built package.
//!
//! Every mounted package directory carries a `.MANIFEST` file generated by the
//! build pipeline. It maps readable asset paths to universal-uniqued ids (UUID)
//! and to the actual file locations inside the package, which are usually the
//! hex representations of those UUIDs.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use inlinable_string::InlinableString;
use uuid::Uuid;

use crate::utils::FastHashMap;

pub const NAME: &str = ".MANIFEST";
pub const MAGIC: [u8; 8] = [b'M', b'N', b'F', b'T', b' ', 0, 0, 1];
pub const VERSION: u32 = 1;

/// A manifest item in the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestItem {
    /// The readable path callers use to name the asset.
    pub path: InlinableString,
    /// The universal-uniqued id assigned at build time.
    pub uuid: Uuid,
    /// The file location relative to the package root.
    pub location: InlinableString,
}

/// Manifest for all the assets in a built package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub items: Vec<ManifestItem>,
}

impl Manifest {
    pub fn new() -> Self {
        Manifest { items: Vec::new() }
    }

    pub fn load_from(file: &mut dyn Read) -> Result<Manifest, failure::Error> {
        let mut buf = [0; 8];
        file.read_exact(&mut buf)?;

        if buf != MAGIC {
            bail!("MAGIC number not match.");
        }

        let version = file.read_u32::<LittleEndian>()?;
        if version != VERSION {
            bail!("Unsupported manifest version {}.", version);
        }

        Ok(bincode::deserialize_from(file)?)
    }

    pub fn save_into(&self, file: &mut dyn Write) -> Result<(), failure::Error> {
        file.write_all(&MAGIC)?;
        file.write_u32::<LittleEndian>(VERSION)?;
        bincode::serialize_into(file, self)?;
        Ok(())
    }
}

/// Lookup tables built from the manifests of a mounted package.
#[derive(Debug, Default)]
pub struct Resolver {
    uuids: FastHashMap<Uuid, InlinableString>,
    paths: FastHashMap<InlinableString, Uuid>,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            uuids: FastHashMap::default(),
            paths: FastHashMap::default(),
        }
    }

    /// Merges all the items of `manifest` into the lookup tables.
    pub fn add(&mut self, manifest: &Manifest) {
        for v in &manifest.items {
            self.uuids.insert(v.uuid, v.location.clone());
            self.paths.insert(v.path.clone(), v.uuid);
        }
    }

    /// Returns the UUID of the asset at provided path, and None if not exists.
    #[inline]
    pub fn find<T: AsRef<str>>(&self, path: T) -> Option<Uuid> {
        self.paths.get(&InlinableString::from(path.as_ref())).cloned()
    }

    /// Returns the relative file location of `uuid`, and None if not exists.
    #[inline]
    pub fn locate(&self, uuid: Uuid) -> Option<&str> {
        self.uuids.get(&uuid).map(|v| v.as_ref())
    }

    #[inline]
    pub fn contains(&self, uuid: Uuid) -> bool {
        self.uuids.contains_key(&uuid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }
}
