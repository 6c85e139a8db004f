// # DNS Provider Trait
//
// Defines the interface for reading and writing the A records of a zone.
//
// ## Implementations
//
// - DigitalOcean: `fleet-provider-digitalocean` crate
//
// ## Usage
//
// ```rust,ignore
// use fleet_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records("example.com", "A").await?;
//     for record in records.value {
//         println!("{} {} {}", record.name, record.record_type, record.data);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::response::ProviderResponse;

/// An existing record in a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Provider-specific record ID (opaque)
    pub id: String,
    /// Label local to the zone (e.g. "alice" or "*.alice")
    pub name: String,
    /// Record type ("A")
    pub record_type: String,
    /// Record data (the IP address for A records)
    pub data: String,
    /// Time-to-live, when reported
    pub ttl: Option<u32>,
}

/// A record to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub record_type: String,
    pub name: String,
    pub data: String,
    pub ttl: u32,
}

impl NewRecord {
    /// Build an A record
    pub fn a(name: impl Into<String>, ip: impl Into<String>, ttl: u32) -> Self {
        Self {
            record_type: "A".to_string(),
            name: name.into(),
            data: ip.into(),
            ttl,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Like [`ComputeProvider`](super::ComputeProvider), implementations are
/// single-shot and stateless. Deciding whether a record needs to change is
/// owned by the [`DnsSynchronizer`](crate::dns_sync::DnsSynchronizer).
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List all records of `record_type` in `zone`, across all pages
    async fn list_records(
        &self,
        zone: &str,
        record_type: &str,
    ) -> Result<ProviderResponse<Vec<DomainRecord>>, crate::Error>;

    /// Create a record in `zone`
    async fn create_record(
        &self,
        zone: &str,
        record: &NewRecord,
    ) -> Result<ProviderResponse<DomainRecord>, crate::Error>;

    /// Replace the data of an existing record, addressed by its ID
    async fn update_record(
        &self,
        zone: &str,
        record_id: &str,
        data: &str,
    ) -> Result<ProviderResponse<DomainRecord>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
