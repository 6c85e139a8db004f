// # fleet-core
//
// Core library for provisioning per-user workshop instances and keeping a
// DNS zone in step with their addresses.
//
// ## Architecture Overview
//
// - **ComputeProvider**: Trait for listing, creating and bulk-deleting tagged instances
// - **DnsProvider**: Trait for listing, creating and updating zone A records
// - **KeySource**: Trait for looking up public SSH keys of an identity
// - **PayloadRenderer**: Trait for rendering instance bootstrap data
// - **FleetEngine**: Runs one setup or teardown pass against those traits
//
// ## Design Principles
//
// 1. **Single pass**: Every run re-derives state from the provider and converges once
// 2. **Minimal mutations**: Only missing instances are created, only stale records rewritten
// 3. **Report, don't raise**: Every unit of work ends in a `RunReport` entry
// 4. **Library-first**: The CLI is a thin shell over this crate

pub mod config;
pub mod diff;
pub mod dns_sync;
pub mod engine;
pub mod error;
pub mod identity;
pub mod keys;
pub mod provision;
pub mod rate_limit;
pub mod report;
pub mod settle;
pub mod traits;

// Re-export core types for convenience
pub use config::{DnsConfig, FleetConfig, InstanceTemplate, KeyConfig, SettleConfig};
pub use engine::FleetEngine;
pub use error::{Error, Result};
pub use identity::{RawUser, UserSpec};
pub use keys::KeyResolver;
pub use rate_limit::RateLimitGuard;
pub use report::{Outcome, RunReport, Stage, UnitReport};
pub use traits::{ComputeProvider, DnsProvider, KeySource, PayloadRenderer};
