//! Rate-limit headroom guard
//!
//! Inspects the quota metadata of every provider response and warns when the
//! remaining call budget drops below a threshold. It never delays or blocks
//! a call.

use crate::error::Error;
use crate::traits::RateQuota;
use tracing::warn;

/// Warns when the provider's remaining request quota runs low
#[derive(Debug, Clone, Copy)]
pub struct RateLimitGuard {
    threshold: u64,
}

impl RateLimitGuard {
    /// Create a guard that warns below `threshold` remaining calls
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    /// Check the quota of one response
    ///
    /// # Returns
    ///
    /// `true` if a warning was emitted, `false` if headroom is fine or the
    /// response carried no quota metadata
    pub fn check(&self, quota: Option<&RateQuota>) -> bool {
        let Some(quota) = quota else {
            return false;
        };

        if quota.remaining < self.threshold {
            warn!(
                "Reaching provider request limit: {} of {} calls remaining (reset: {:?})",
                quota.remaining, quota.limit, quota.reset
            );
            return true;
        }

        false
    }

    /// Check the quota carried by a failed call
    ///
    /// A refused request (HTTP 429) is the moment the budget matters most,
    /// so its quota goes through the same threshold as a successful one.
    pub fn check_error(&self, error: &Error) -> bool {
        self.check(error.quota())
    }
}
