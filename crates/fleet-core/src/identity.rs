//! Identity normalization
//!
//! Turns raw user names into canonical identities that are valid DNS labels,
//! and derives the instance name and zone label from them.

use serde::{Deserialize, Serialize};

/// A user-list entry before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUser {
    /// Name as written in the user list
    pub name: String,
    /// Public key written next to the name, if any
    pub inline_key: Option<String>,
}

impl RawUser {
    pub fn new(name: impl Into<String>, inline_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            inline_key,
        }
    }
}

/// One desired instance owner
///
/// Built once per user-list entry and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    /// Canonical identity (lowercase, no dots)
    pub identity: String,
    /// Instance name: identity plus the zone suffix
    pub resource_name: String,
    /// Authorized public keys, in resolution order
    pub authorized_keys: Vec<String>,
}

impl UserSpec {
    /// Build a user from a raw name and already resolved keys
    pub fn new(raw_name: &str, domain: &str, authorized_keys: Vec<String>) -> Self {
        let identity = normalize(raw_name);
        let resource_name = resource_name(&identity, domain);
        Self {
            identity,
            resource_name,
            authorized_keys,
        }
    }
}

/// Canonicalize a raw name: trim, lowercase, and replace every `.` with `-`
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace('.', "-")
}

/// Instance name for an identity: `<identity>.<domain>`
pub fn resource_name(identity: &str, domain: &str) -> String {
    format!("{}.{}", identity, domain)
}

/// Zone label for an instance name: the name without the `.<domain>` suffix
///
/// Names that do not carry the suffix are returned unchanged.
pub fn label_for(instance_name: &str, domain: &str) -> String {
    let suffix = format!(".{}", domain);
    instance_name
        .strip_suffix(&suffix)
        .unwrap_or(instance_name)
        .to_string()
}

/// Wildcard label covering every name below `label`
pub fn wildcard_label(label: &str) -> String {
    format!("*.{}", label)
}
