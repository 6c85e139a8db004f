//! Process configuration
//!
//! The DigitalOcean token comes from `DO_TOKEN`; every other knob has a
//! default and may be overridden through a `FLEET_*` variable:
//!
//! | Variable                       | Default                                   |
//! |--------------------------------|-------------------------------------------|
//! | `FLEET_REGION`                 | `fra1`                                    |
//! | `FLEET_SIZE`                   | `s-2vcpu-4gb-amd`                         |
//! | `FLEET_IMAGE`                  | `ubuntu-21-04-x64`                        |
//! | `FLEET_SSH_FINGERPRINT`        | workshop operator key fingerprint         |
//! | `FLEET_TAG`                    | `nice-workshop`                           |
//! | `FLEET_DOMAIN`                 | `encero.xyz`                              |
//! | `FLEET_TTL`                    | `30`                                      |
//! | `FLEET_FALLBACK_KEY`           | workshop operator public key              |
//! | `FLEET_SETTLE_INTERVAL_MS`     | `5000`                                    |
//! | `FLEET_SETTLE_DEADLINE_MS`     | `120000`                                  |
//! | `FLEET_RATE_LIMIT_THRESHOLD`   | `200`                                     |
//! | `FLEET_API_URL`                | `https://api.digitalocean.com`            |
//! | `FLEET_KEYS_URL`               | `https://github.com`                      |
//! | `FLEET_LOG_LEVEL`              | `info`                                    |

use anyhow::{Context, Result};
use fleet_core::FleetConfig;
use fleet_keys_github::GITHUB_BASE;
use fleet_provider_digitalocean::DIGITALOCEAN_API_BASE;
use std::str::FromStr;

/// Everything the binary needs besides the command line
pub struct Config {
    /// DigitalOcean API token
    /// ⚠️ NEVER log this value
    pub api_token: String,
    pub api_url: String,
    pub keys_url: String,
    pub fleet: FleetConfig,
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<REDACTED>")
            .field("api_url", &self.api_url)
            .field("keys_url", &self.keys_url)
            .field("fleet", &self.fleet)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_token = var("DO_TOKEN").context(
            "DO_TOKEN is required. Set it via: export DO_TOKEN=your_token",
        )?;

        let mut fleet = FleetConfig::default();
        if let Some(v) = var("FLEET_REGION") {
            fleet.instance.region = v;
        }
        if let Some(v) = var("FLEET_SIZE") {
            fleet.instance.size = v;
        }
        if let Some(v) = var("FLEET_IMAGE") {
            fleet.instance.image = v;
        }
        if let Some(v) = var("FLEET_SSH_FINGERPRINT") {
            fleet.instance.ssh_fingerprint = v;
        }
        if let Some(v) = var("FLEET_TAG") {
            fleet.instance.tag = v;
        }
        if let Some(v) = var("FLEET_DOMAIN") {
            fleet.dns.domain = v;
        }
        if let Some(v) = var("FLEET_FALLBACK_KEY") {
            fleet.keys.fallback_key = v;
        }
        if let Some(v) = var("FLEET_TTL") {
            fleet.dns.ttl = parse_number("FLEET_TTL", &v)?;
        }
        if let Some(v) = var("FLEET_SETTLE_INTERVAL_MS") {
            fleet.settle.poll_interval_ms = parse_number("FLEET_SETTLE_INTERVAL_MS", &v)?;
        }
        if let Some(v) = var("FLEET_SETTLE_DEADLINE_MS") {
            fleet.settle.deadline_ms = parse_number("FLEET_SETTLE_DEADLINE_MS", &v)?;
        }
        if let Some(v) = var("FLEET_RATE_LIMIT_THRESHOLD") {
            fleet.rate_limit_threshold = parse_number("FLEET_RATE_LIMIT_THRESHOLD", &v)?;
        }

        Ok(Self {
            api_token,
            api_url: var("FLEET_API_URL").unwrap_or_else(|| DIGITALOCEAN_API_BASE.to_string()),
            keys_url: var("FLEET_KEYS_URL").unwrap_or_else(|| GITHUB_BASE.to_string()),
            fleet,
            log_level: var("FLEET_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.fleet.validate()?;

        for (name, url) in [("FLEET_API_URL", &self.api_url), ("FLEET_KEYS_URL", &self.keys_url)] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", name, url);
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FLEET_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer. Got: {}", name, value))
}
