// # DigitalOcean Provider
//
// This crate provides the DigitalOcean implementation of both provider
// traits of the fleet reconciler:
//
// - `ComputeProvider`: droplets, scoped by tag
// - `DnsProvider`: A records of a domain managed by DigitalOcean DNS
//
// ## Behavior
//
// - One logical operation per call; listings follow `links.pages.next`
//   internally and return the quota of the last page
// - Quota metadata is read from the `ratelimit-*` response headers and
//   handed back to the engine; the provider never throttles itself
// - Specific error mapping for HTTP status codes (401/403, 404, 429, 5xx)
// - HTTP timeout configured (30 seconds)
// - No retries, no sleeping, no dry-run: those are engine decisions
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - List droplets by tag: GET `/v2/droplets?tag_name=...`
// - Create droplet: POST `/v2/droplets`
// - Delete droplets by tag: DELETE `/v2/droplets?tag_name=...`
// - List records: GET `/v2/domains/:domain/records?type=A`
// - Create record: POST `/v2/domains/:domain/records`
// - Update record: PUT `/v2/domains/:domain/records/:record_id`

mod wire;

use async_trait::async_trait;
use fleet_core::traits::{
    ComputeProvider, CreateInstanceRequest, DnsProvider, DomainRecord, NewRecord,
    ObservedInstance, ProviderResponse, RateQuota,
};
use fleet_core::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use wire::{DropletEnvelope, DropletList, ErrorBody, Paginated, RecordEnvelope, RecordList};

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Items requested per listing page (the API maximum)
const PAGE_SIZE: u32 = 200;

/// Safety stop for runaway pagination
const MAX_PAGES: u32 = 100;

const PROVIDER: &str = "digitalocean";

/// DigitalOcean compute and DNS provider
///
/// The Debug implementation intentionally does NOT expose the API token.
#[derive(Clone)]
pub struct DigitalOceanProvider {
    /// API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DigitalOceanProvider {
    /// Create a provider talking to the public DigitalOcean API
    ///
    /// # Returns
    ///
    /// - `Ok(DigitalOceanProvider)`: Ready to use
    /// - `Err(Error::Config)`: If the token is empty or the HTTP client cannot be built
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_token, DIGITALOCEAN_API_BASE)
    }

    /// Create a provider talking to `base_url` instead of the public API
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();

        if api_token.trim().is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(&self, builder: RequestBuilder, action: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: HTTP request failed: {}", action, e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let quota = parse_quota(response.headers());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(status_error(status, action, &body, quota))
    }

    /// Parse a JSON body, keeping the quota of the response
    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<(T, Option<RateQuota>)> {
        let quota = parse_quota(response.headers());
        let body = response
            .json::<T>()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
        Ok((body, quota))
    }

    /// Fetch every page of a listing
    async fn list_all<P: Paginated + DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        action: &str,
    ) -> Result<ProviderResponse<Vec<P::Item>>> {
        let mut items = Vec::new();
        let mut quota = None;
        let per_page = PAGE_SIZE.to_string();

        for page in 1..=MAX_PAGES {
            let page_str = page.to_string();
            let builder = self
                .request(Method::GET, &self.url(path))
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_str.as_str())]);

            let response = self.send(builder, action).await?;
            let (body, page_quota): (P, _) = self.parse(response).await?;
            quota = page_quota.or(quota);

            let has_next = body.has_next();
            let page_items = body.into_items();
            let empty = page_items.is_empty();
            items.extend(page_items);

            if !has_next || empty {
                return Ok(ProviderResponse::new(items, quota));
            }

            tracing::debug!("{}: fetching page {}", action, page + 1);
        }

        tracing::warn!("{}: stopped after {} pages", action, MAX_PAGES);
        Ok(ProviderResponse::new(items, quota))
    }
}

#[async_trait]
impl ComputeProvider for DigitalOceanProvider {
    async fn list_instances_by_tag(&self, tag: &str) -> Result<ProviderResponse<Vec<ObservedInstance>>> {
        tracing::debug!("Listing droplets tagged {:?}", tag);
        self.list_all::<DropletList>("/v2/droplets", &[("tag_name", tag)], "list droplets")
            .await
    }

    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<ProviderResponse<ObservedInstance>> {
        tracing::debug!("Creating droplet {} in {}", request.name, request.region);

        let payload = serde_json::json!({
            "name": request.name,
            "region": request.region,
            "size": request.size,
            "image": request.image,
            "ssh_keys": request.ssh_keys,
            "tags": request.tags,
            "user_data": request.user_data,
        });

        let builder = self
            .request(Method::POST, &self.url("/v2/droplets"))
            .json(&payload);
        let response = self.send(builder, "create droplet").await?;
        let (body, quota): (DropletEnvelope, _) = self.parse(response).await?;

        Ok(ProviderResponse::new(body.droplet.into(), quota))
    }

    async fn delete_instances_by_tag(&self, tag: &str) -> Result<ProviderResponse<()>> {
        tracing::debug!("Deleting droplets tagged {:?}", tag);

        let builder = self
            .request(Method::DELETE, &self.url("/v2/droplets"))
            .query(&[("tag_name", tag)]);
        let response = self.send(builder, "delete droplets by tag").await?;

        Ok(ProviderResponse::new((), parse_quota(response.headers())))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    async fn list_records(
        &self,
        zone: &str,
        record_type: &str,
    ) -> Result<ProviderResponse<Vec<DomainRecord>>> {
        tracing::debug!("Listing {} records of {}", record_type, zone);
        let path = format!("/v2/domains/{}/records", zone);
        self.list_all::<RecordList>(&path, &[("type", record_type)], "list domain records")
            .await
    }

    async fn create_record(&self, zone: &str, record: &NewRecord) -> Result<ProviderResponse<DomainRecord>> {
        let payload = serde_json::json!({
            "type": record.record_type,
            "name": record.name,
            "data": record.data,
            "ttl": record.ttl,
        });

        let builder = self
            .request(Method::POST, &self.url(&format!("/v2/domains/{}/records", zone)))
            .json(&payload);
        let response = self.send(builder, "create domain record").await?;
        let (body, quota): (RecordEnvelope, _) = self.parse(response).await?;

        Ok(ProviderResponse::new(body.domain_record.into(), quota))
    }

    async fn update_record(
        &self,
        zone: &str,
        record_id: &str,
        data: &str,
    ) -> Result<ProviderResponse<DomainRecord>> {
        let url = self.url(&format!("/v2/domains/{}/records/{}", zone, record_id));
        let builder = self
            .request(Method::PUT, &url)
            .json(&serde_json::json!({ "data": data }));
        let response = self.send(builder, "update domain record").await?;
        let (body, quota): (RecordEnvelope, _) = self.parse(response).await?;

        Ok(ProviderResponse::new(body.domain_record.into(), quota))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Read the `ratelimit-*` headers
///
/// Returns `None` unless both limit and remaining are present and numeric.
pub fn parse_quota(headers: &HeaderMap) -> Option<RateQuota> {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    let limit = u64::try_from(number("ratelimit-limit")?).ok()?;
    let remaining = u64::try_from(number("ratelimit-remaining")?).ok()?;

    Some(RateQuota {
        limit,
        remaining,
        reset: number("ratelimit-reset"),
    })
}

/// Map a non-success status to an error
///
/// The quota of the refused response travels with a rate-limit error.
fn status_error(status: u16, action: &str, body: &str, quota: Option<RateQuota>) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            action, status
        )),
        404 => Error::not_found(format!("{}: {}", action, message)),
        429 => Error::rate_limited(
            format!("{}: rate limit exceeded. Status: {}", action, status),
            quota,
        ),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: server error (transient): {} - {}", action, status, message),
        ),
        _ => Error::provider(PROVIDER, format!("{} failed: {} - {}", action, status, message)),
    }
}
