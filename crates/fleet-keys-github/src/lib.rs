// # GitHub Key Source
//
// Looks up the public SSH keys a GitHub account publishes at
// `https://github.com/<user>.keys` (plain text, one key per line).
//
// ## Semantics
//
// - 200: every non-empty trimmed line is a key; an empty body means the
//   account exists but has no keys
// - 404: the account does not exist (`KeyLookup::NotFound`)
// - anything else, including transport failures: an error
//
// The caller decides what a failed lookup means; this crate never
// substitutes a fallback key itself.

use async_trait::async_trait;
use fleet_core::traits::{KeyLookup, KeySource};
use fleet_core::{Error, Result};
use std::time::Duration;

/// Public GitHub web host
pub const GITHUB_BASE: &str = "https://github.com";

/// Lookups are small; a slow answer is treated as a failure
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest login GitHub accepts
const MAX_ACCOUNT_NAME_LEN: usize = 39;

/// Key source backed by GitHub's `.keys` endpoint
#[derive(Debug, Clone)]
pub struct GithubKeySource {
    base_url: String,
    client: reqwest::Client,
}

impl GithubKeySource {
    /// Create a source talking to github.com
    pub fn new() -> Result<Self> {
        Self::with_base_url(GITHUB_BASE)
    }

    /// Create a source talking to `base_url` (a mirror or a test server)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn keys_url(&self, identity: &str) -> String {
        format!("{}/{}.keys", self.base_url, identity)
    }
}

#[async_trait]
impl KeySource for GithubKeySource {
    async fn fetch_keys(&self, identity: &str) -> Result<KeyLookup> {
        if !is_account_name(identity) {
            return Err(Error::invalid_input(format!(
                "not a GitHub account name: {:?}",
                identity
            )));
        }

        let url = self.keys_url(identity);
        tracing::debug!("Fetching keys from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::key_source(format!("GET {} failed: {}", url, e)))?;

        match response.status().as_u16() {
            200 => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| Error::key_source(format!("Failed to read {}: {}", url, e)))?;
                Ok(KeyLookup::Found(parse_keys(&body)))
            }
            404 => Ok(KeyLookup::NotFound),
            status => Err(Error::key_source(format!(
                "GET {} returned unexpected status {}",
                url, status
            ))),
        }
    }

    fn source_name(&self) -> &'static str {
        "github"
    }
}

/// Whether `identity` has the shape of a GitHub login
///
/// Up to 39 ASCII letters, digits or hyphens, not starting or ending with a
/// hyphen. Anything else could change the meaning of the request URL.
fn is_account_name(identity: &str) -> bool {
    !identity.is_empty()
        && identity.len() <= MAX_ACCOUNT_NAME_LEN
        && !identity.starts_with('-')
        && !identity.ends_with('-')
        && identity.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Split a `.keys` body into keys
fn parse_keys(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
