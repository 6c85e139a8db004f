//! Configuration types for the fleet reconciler
//!
//! This module defines all configuration structures used throughout the crate.
//! Defaults describe the reference workshop: one `s-2vcpu-4gb-amd` droplet per
//! attendee in `fra1`, published under `encero.xyz`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Fixed parameters for every created instance
    #[serde(default)]
    pub instance: InstanceTemplate,

    /// DNS zone settings
    #[serde(default)]
    pub dns: DnsConfig,

    /// Key resolution settings
    #[serde(default)]
    pub keys: KeyConfig,

    /// Post-provisioning settle settings
    #[serde(default)]
    pub settle: SettleConfig,

    /// Remaining-call threshold below which the rate-limit guard warns
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u64,
}

impl FleetConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            instance: InstanceTemplate::default(),
            dns: DnsConfig::default(),
            keys: KeyConfig::default(),
            settle: SettleConfig::default(),
            rate_limit_threshold: default_rate_limit_threshold(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.instance.validate()?;
        self.dns.validate()?;
        self.keys.validate()?;
        self.settle.validate()?;

        Ok(())
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed parameters applied to every created instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceTemplate {
    /// Region slug (e.g., "fra1")
    #[serde(default = "default_region")]
    pub region: String,

    /// Size slug (e.g., "s-2vcpu-4gb-amd")
    #[serde(default = "default_size")]
    pub size: String,

    /// Image slug
    #[serde(default = "default_image")]
    pub image: String,

    /// Fingerprint of the provider-side SSH key attached to every instance
    #[serde(default = "default_ssh_fingerprint")]
    pub ssh_fingerprint: String,

    /// Tag that scopes all workshop-owned instances
    #[serde(default = "default_tag")]
    pub tag: String,
}

impl InstanceTemplate {
    /// Validate the instance template
    pub fn validate(&self) -> Result<(), crate::Error> {
        let required = [
            ("region", &self.region),
            ("size", &self.size),
            ("image", &self.image),
            ("ssh_fingerprint", &self.ssh_fingerprint),
            ("tag", &self.tag),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Instance {} cannot be empty",
                    field
                )));
            }
        }

        Ok(())
    }
}

impl Default for InstanceTemplate {
    fn default() -> Self {
        Self {
            region: default_region(),
            size: default_size(),
            image: default_image(),
            ssh_fingerprint: default_ssh_fingerprint(),
            tag: default_tag(),
        }
    }
}

/// DNS zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Zone (domain) that holds one A record pair per instance
    #[serde(default = "default_domain")]
    pub domain: String,

    /// TTL for created records, in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl DnsConfig {
    /// Validate the DNS configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("DNS domain cannot be empty"));
        }
        if self.domain.starts_with('.') || self.domain.ends_with('.') {
            return Err(crate::Error::config(format!(
                "DNS domain must not start or end with a dot: {}",
                self.domain
            )));
        }
        if self.ttl == 0 {
            return Err(crate::Error::config("DNS record TTL must be > 0"));
        }
        Ok(())
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            ttl: default_ttl(),
        }
    }
}

/// Key resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Operator key appended to every user's authorized keys
    #[serde(default = "default_fallback_key")]
    pub fallback_key: String,
}

impl KeyConfig {
    /// Validate the key configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.fallback_key.trim().is_empty() {
            return Err(crate::Error::config("Fallback SSH key cannot be empty"));
        }
        Ok(())
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            fallback_key: default_fallback_key(),
        }
    }
}

/// Settings for waiting on freshly created instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Delay between two instance listings, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for addresses after this many milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl SettleConfig {
    /// Validate the settle configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::config("Settle poll interval must be > 0"));
        }
        if self.deadline_ms < self.poll_interval_ms {
            return Err(crate::Error::config(format!(
                "Settle deadline ({}ms) must not be shorter than the poll interval ({}ms)",
                self.deadline_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

fn default_region() -> String {
    "fra1".to_string()
}

fn default_size() -> String {
    "s-2vcpu-4gb-amd".to_string()
}

fn default_image() -> String {
    "ubuntu-21-04-x64".to_string()
}

fn default_ssh_fingerprint() -> String {
    "5c:48:95:fa:ec:f4:3c:76:78:f2:77:1b:ad:a5:7c:d4".to_string()
}

fn default_tag() -> String {
    "nice-workshop".to_string()
}

fn default_domain() -> String {
    "encero.xyz".to_string()
}

fn default_ttl() -> u32 {
    30
}

fn default_fallback_key() -> String {
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHfXEOvy8FgUbO4Wile2w1M9p575UUltJGqZ9MvOtrpl".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_deadline_ms() -> u64 {
    120_000
}

fn default_rate_limit_threshold() -> u64 {
    200
}
