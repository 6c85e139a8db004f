// # Key Source Trait
//
// Defines the interface for looking up the public SSH keys of an identity
// in an external directory.
//
// ## Implementations
//
// - GitHub (`https://github.com/<user>.keys`): `fleet-keys-github` crate

use async_trait::async_trait;

/// Answer of a key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup {
    /// The identity is known; these are its keys (possibly empty)
    Found(Vec<String>),
    /// The identity is unknown to the source
    NotFound,
}

/// Trait for public key sources
///
/// Errors (unreachable source, unexpected status) are returned to the
/// caller; the [`KeyResolver`](crate::keys::KeyResolver) decides that they
/// are never fatal.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the public keys of `identity`
    async fn fetch_keys(&self, identity: &str) -> Result<KeyLookup, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
