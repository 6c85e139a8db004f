//! Authorized key resolution
//!
//! Keys are assembled in a fixed order:
//!
//! 1. the inline key from the user list, if present and non-blank
//! 2. every key the external [`KeySource`] returns for the identity
//! 3. the operator fallback key, always last
//!
//! The fallback key keeps every instance reachable even when the other two
//! contribute nothing. Keys are not deduplicated.

use crate::identity::{RawUser, UserSpec, normalize};
use crate::traits::{KeyLookup, KeySource};
use tracing::{debug, error};

/// Builds the authorized key list of a user
pub struct KeyResolver {
    /// External key directory
    source: Box<dyn KeySource>,

    /// Operator key appended for every user
    fallback_key: String,
}

impl KeyResolver {
    pub fn new(source: Box<dyn KeySource>, fallback_key: impl Into<String>) -> Self {
        Self {
            source,
            fallback_key: fallback_key.into(),
        }
    }

    /// Resolve the keys of `identity`
    ///
    /// Never fails: a key source error is logged and contributes no keys.
    /// The result always ends with the fallback key.
    pub async fn resolve(&self, identity: &str, inline_key: Option<&str>) -> Vec<String> {
        let mut keys = Vec::new();

        if let Some(key) = inline_key.map(str::trim).filter(|k| !k.is_empty()) {
            keys.push(key.to_string());
        }

        match self.source.fetch_keys(identity).await {
            Ok(KeyLookup::Found(found)) => {
                debug!(
                    "Found {} key(s) for {} in {}",
                    found.len(),
                    identity,
                    self.source.source_name()
                );
                keys.extend(found);
            }
            Ok(KeyLookup::NotFound) => {
                debug!("No {} keys for {}", self.source.source_name(), identity);
            }
            Err(e) => {
                error!(
                    "Cannot load {} keys for user {}: {}",
                    self.source.source_name(),
                    identity,
                    e
                );
            }
        }

        keys.push(self.fallback_key.clone());
        keys
    }

    /// Build a [`UserSpec`] from a raw user-list entry
    pub async fn build_user(&self, raw: &RawUser, domain: &str) -> UserSpec {
        let identity = normalize(&raw.name);
        let keys = self.resolve(&identity, raw.inline_key.as_deref()).await;
        UserSpec::new(&identity, domain, keys)
    }

    /// Build the desired user set, in user-list order
    pub async fn build_users(&self, raw_users: &[RawUser], domain: &str) -> Vec<UserSpec> {
        let mut users = Vec::with_capacity(raw_users.len());
        for raw in raw_users {
            users.push(self.build_user(raw, domain).await);
        }
        users
    }
}
