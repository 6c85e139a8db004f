//! DigitalOcean API v2 payloads

use fleet_core::traits::{DomainRecord, ObservedInstance};
use serde::Deserialize;

/// A listing page that may link to a next page
pub(crate) trait Paginated {
    type Item;

    fn has_next(&self) -> bool;
    fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub pages: Option<Pages>,
}

impl Links {
    fn has_next(&self) -> bool {
        self.pages.as_ref().is_some_and(|p| p.next.is_some())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pages {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Droplet {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub networks: Networks,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Networks {
    #[serde(default)]
    pub v4: Vec<NetworkV4>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NetworkV4 {
    pub ip_address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Droplet {
    /// First public IPv4 address, if one is assigned yet
    fn public_ipv4(&self) -> Option<String> {
        self.networks
            .v4
            .iter()
            .find(|n| n.kind == "public")
            .map(|n| n.ip_address.clone())
    }
}

impl From<Droplet> for ObservedInstance {
    fn from(droplet: Droplet) -> Self {
        let public_address = droplet.public_ipv4();
        ObservedInstance {
            id: droplet.id.to_string(),
            name: droplet.name,
            public_address,
            tags: droplet.tags,
            status: droplet.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DropletEnvelope {
    pub droplet: Droplet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DropletList {
    #[serde(default)]
    pub droplets: Vec<Droplet>,
    #[serde(default)]
    pub links: Links,
}

impl Paginated for DropletList {
    type Item = ObservedInstance;

    fn has_next(&self) -> bool {
        self.links.has_next()
    }

    fn into_items(self) -> Vec<ObservedInstance> {
        self.droplets.into_iter().map(Into::into).collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Record {
    pub id: u64,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl From<Record> for DomainRecord {
    fn from(record: Record) -> Self {
        DomainRecord {
            id: record.id.to_string(),
            name: record.name,
            record_type: record.record_type,
            data: record.data,
            ttl: record.ttl,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordEnvelope {
    pub domain_record: Record,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordList {
    #[serde(default)]
    pub domain_records: Vec<Record>,
    #[serde(default)]
    pub links: Links,
}

impl Paginated for RecordList {
    type Item = DomainRecord;

    fn has_next(&self) -> bool {
        self.links.has_next()
    }

    fn into_items(self) -> Vec<DomainRecord> {
        self.domain_records.into_iter().map(Into::into).collect()
    }
}
