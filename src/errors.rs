use crate::key::AssetKey;

/// Error kinds surfaced by the cache and loader boundary.
///
/// The variants are deliberately cheap to clone, since a single failure might be
/// delivered to every caller that joined the same in-flight load.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum Error {
    #[fail(display = "Could NOT found asset '{}'.", _0)]
    NotFound(AssetKey),
    #[fail(
        display = "Provider failed to fetch '{}' after {} attempts. {}",
        key, attempts, cause
    )]
    ProviderFailure {
        key: AssetKey,
        attempts: u32,
        cause: String,
    },
    #[fail(display = "Asset '{}' could NOT be casted into {}.", key, expected)]
    TypeMismatch {
        key: AssetKey,
        expected: &'static str,
    },
    #[fail(display = "Asset name '{}' is malformed.", _0)]
    InvalidKey(String),
    #[fail(display = "Timed out while waiting for asset '{}'.", _0)]
    Timeout(AssetKey),
}

pub type Result<T> = ::std::result::Result<T, Error>;
