//! Commonly used utilities.

pub mod hash;

pub use self::hash::{FastHashMap, FastHashSet};

pub mod prelude {
    pub use super::hash::{FastHashMap, FastHashSet};
}
