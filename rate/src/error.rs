//! Rate provider error types.

use thiserror::Error;
use xrate_common::CommonError;

/// Errors that can occur while fetching exchange rates.
#[derive(Debug, Error)]
pub enum RateError {
    /// Currency pair has an empty side.
    #[error("invalid currency pair: {0}")]
    InvalidCurrency(String),

    /// The chain has no providers left to try.
    #[error("no rate providers configured")]
    NoProviders,

    /// Every provider in the chain failed. Carries the last failure.
    #[error("all rate providers failed, last was {provider}: {source}")]
    ProviderUnavailable {
        provider: String,
        #[source]
        source: Box<RateError>,
    },

    /// Transport failure talking to a provider.
    #[error("{provider}: request failed: {message}")]
    Http {
        provider: String,
        message: String,
        retryable: bool,
    },

    /// Provider answered with a non-success status.
    #[error("{provider}: unexpected status {status}")]
    Status { provider: String, status: u16 },

    /// Provider body could not be turned into a rate.
    #[error("{provider}: parsing response: {message}")]
    Parse { provider: String, message: String },

    /// Provider configuration cannot produce a request.
    #[error("{provider}: invalid configuration: {message}")]
    Config { provider: String, message: String },

    /// Provider call exceeded its deadline.
    #[error("{provider}: timed out")]
    Timeout { provider: String },
}

impl RateError {
    pub fn parse(provider: impl Into<String>, message: impl ToString) -> Self {
        RateError::Parse {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn config(provider: impl Into<String>, message: impl ToString) -> Self {
        RateError::Config {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RateError::Http { retryable, .. } => *retryable,
            RateError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            RateError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get error code for outer layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            RateError::InvalidCurrency(_) => "INVALID_CURRENCY",
            RateError::NoProviders => "NO_PROVIDERS",
            RateError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            RateError::Http { .. } => "PROVIDER_HTTP",
            RateError::Status { .. } => "PROVIDER_STATUS",
            RateError::Parse { .. } => "PROVIDER_PARSE",
            RateError::Config { .. } => "PROVIDER_CONFIG",
            RateError::Timeout { .. } => "PROVIDER_TIMEOUT",
        }
    }
}

impl From<CommonError> for RateError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::InvalidCurrency(pair) => RateError::InvalidCurrency(pair),
            other => RateError::InvalidCurrency(other.to_string()),
        }
    }
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;
