//! Notification error types.

use thiserror::Error;
use xrate_bus::BusError;
use xrate_common::{join_messages, CommonError, CurrencyPair};
use xrate_store::StoreError;

use crate::mail::MailError;

/// Errors that can occur while managing subscriptions or sending messages.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Address or topic failed validation.
    #[error("invalid subscription: {0}")]
    Invalid(#[from] CommonError),

    /// The subscriber already follows this topic.
    #[error("{address} is already subscribed to {topic}")]
    SubscriptionExists { address: String, topic: CurrencyPair },

    /// Nobody follows the topic.
    #[error("no subscribers for {0}")]
    NoSubscribers(CurrencyPair),

    /// A response arrived without the expected data.
    #[error("missing {0} in response")]
    MissingResponse(&'static str),

    /// One or more messages could not be sent.
    #[error("failed to send {} message(s): {}", errors.len(), join_messages(errors))]
    Delivery { sent: usize, errors: Vec<MailError> },

    /// Subscription storage failed.
    #[error("subscription storage: {0}")]
    Storage(#[from] StoreError),

    /// Request over the event bus failed.
    #[error("event bus: {0}")]
    Bus(#[from] BusError),

    /// A blocking storage task did not finish.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl NotifyError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Bus(e) => e.is_retryable(),
            NotifyError::Delivery { errors, .. } => errors.iter().any(MailError::is_retryable),
            _ => false,
        }
    }

    /// Get error code for outer layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            NotifyError::Invalid(e) => e.error_code(),
            NotifyError::SubscriptionExists { .. } => "SUBSCRIPTION_EXISTS",
            NotifyError::NoSubscribers(_) => "NO_SUBSCRIBERS",
            NotifyError::MissingResponse(_) => "MISSING_RESPONSE",
            NotifyError::Delivery { .. } => "DELIVERY_FAILED",
            NotifyError::Storage(e) => e.error_code(),
            NotifyError::Bus(e) => e.error_code(),
            NotifyError::Task(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
