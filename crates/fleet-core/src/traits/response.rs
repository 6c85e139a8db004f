// # Provider Responses
//
// Every provider call returns its payload together with the quota metadata
// the remote API reported for that call, so the engine can feed the
// rate-limit guard without the provider knowing about it.

use serde::{Deserialize, Serialize};

/// Request quota reported by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuota {
    /// Total calls allowed in the current window
    pub limit: u64,
    /// Calls left in the current window
    pub remaining: u64,
    /// Unix timestamp at which the window resets (if reported)
    pub reset: Option<i64>,
}

/// A provider payload plus the quota metadata of the call that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse<T> {
    /// The response payload
    pub value: T,
    /// Quota metadata, when the API reported it
    pub quota: Option<RateQuota>,
}

impl<T> ProviderResponse<T> {
    /// Wrap a value with optional quota metadata
    pub fn new(value: T, quota: Option<RateQuota>) -> Self {
        Self { value, quota }
    }

    /// Wrap a value for which no quota was reported
    pub fn without_quota(value: T) -> Self {
        Self { value, quota: None }
    }
}
