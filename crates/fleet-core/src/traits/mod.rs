//! Core traits for the fleet reconciler
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ComputeProvider`]: List, create and bulk-delete tagged instances
//! - [`DnsProvider`]: List, create and update A records in a zone
//! - [`KeySource`]: Look up public SSH keys for an identity
//! - [`PayloadRenderer`]: Render the bootstrap payload for a user

pub mod compute_provider;
pub mod dns_provider;
pub mod key_source;
pub mod renderer;
pub mod response;

pub use compute_provider::{ComputeProvider, CreateInstanceRequest, ObservedInstance};
pub use dns_provider::{DnsProvider, DomainRecord, NewRecord};
pub use key_source::{KeyLookup, KeySource};
pub use renderer::PayloadRenderer;
pub use response::{ProviderResponse, RateQuota};
