//! Error types for the fleet reconciler
//!
//! This module defines all error types used throughout the crate.

use crate::traits::RateQuota;
use thiserror::Error;

/// Result type alias for fleet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the fleet reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal before any remote call)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Compute provider errors (instance listing, creation, deletion)
    #[error("Compute provider error: {0}")]
    Compute(String),

    /// DNS provider errors (record listing, creation, update)
    #[error("DNS provider error: {0}")]
    Dns(String),

    /// Public key source errors
    #[error("Key source error: {0}")]
    KeySource(String),

    /// Bootstrap payload rendering errors
    #[error("Render error: {0}")]
    Render(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors, with the quota the refusing response reported
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        quota: Option<RateQuota>,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a compute provider error
    pub fn compute(msg: impl Into<String>) -> Self {
        Self::Compute(msg.into())
    }

    /// Create a DNS provider error
    pub fn dns(msg: impl Into<String>) -> Self {
        Self::Dns(msg.into())
    }

    /// Create a key source error
    pub fn key_source(msg: impl Into<String>) -> Self {
        Self::KeySource(msg.into())
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>, quota: Option<RateQuota>) -> Self {
        Self::RateLimited {
            message: msg.into(),
            quota,
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Quota metadata carried by the failed response, if any
    pub fn quota(&self) -> Option<&RateQuota> {
        match self {
            Self::RateLimited { quota, .. } => quota.as_ref(),
            _ => None,
        }
    }
}
