// # Compute Provider Trait
//
// Defines the interface for managing the tagged instances of a workshop.
//
// ## Implementations
//
// - DigitalOcean: `fleet-provider-digitalocean` crate
//
// ## Usage
//
// ```rust,ignore
// use fleet_core::ComputeProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* ComputeProvider implementation */;
//
//     let observed = provider.list_instances_by_tag("nice-workshop").await?;
//     for instance in observed.value {
//         println!("{} -> {:?}", instance.name, instance.public_address);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::response::ProviderResponse;

/// Snapshot of one remote instance, as listed by the provider
///
/// This is a transient view of external state; it is never mutated locally
/// and is refreshed by listing again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedInstance {
    /// Provider-specific instance ID
    pub id: String,
    /// Instance name (the user's resource name)
    pub name: String,
    /// Public IPv4 address, once assigned
    pub public_address: Option<String>,
    /// Tags attached to the instance
    pub tags: Vec<String>,
    /// Provider-reported status (e.g. "new", "active")
    pub status: String,
}

impl ObservedInstance {
    /// Whether the instance carries the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A fully constructed instance creation request
///
/// In dry-run mode this is what gets surfaced instead of being sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    /// SSH key fingerprints registered with the provider
    pub ssh_keys: Vec<String>,
    pub tags: Vec<String>,
    /// Rendered bootstrap payload
    pub user_data: String,
}

/// Trait for compute provider implementations
///
/// Providers are single-shot: one logical operation per call, no retries,
/// no sleeping. Pagination of listings is the provider's job; quota
/// headroom checks are the engine's.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// List every instance carrying `tag`
    ///
    /// # Returns
    ///
    /// - `Ok(ProviderResponse<Vec<ObservedInstance>>)`: All pages, concatenated
    /// - `Err(Error)`: If any page request failed
    async fn list_instances_by_tag(
        &self,
        tag: &str,
    ) -> Result<ProviderResponse<Vec<ObservedInstance>>, crate::Error>;

    /// Create one instance
    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<ProviderResponse<ObservedInstance>, crate::Error>;

    /// Delete every instance carrying `tag` in a single request
    async fn delete_instances_by_tag(
        &self,
        tag: &str,
    ) -> Result<ProviderResponse<()>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
