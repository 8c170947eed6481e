//! Event bus error types.

use std::error::Error as StdError;
use thiserror::Error;
use xrate_common::join_messages;

use crate::event::EventKind;

/// Boxed error returned by listener code outside this crate.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while publishing or waiting for responses.
#[derive(Debug, Error)]
pub enum BusError {
    /// A listener received a payload it does not handle.
    #[error("invalid event: expected {expected}, got {actual}")]
    InvalidEvent {
        expected: &'static str,
        actual: EventKind,
    },

    /// A listener tried to answer an event without a response channel.
    #[error("response channel is not initialized")]
    InvalidChannel,

    /// The requester's channel has no room for another answer.
    #[error("response channel is full")]
    ResponseChannelFull,

    /// Expected responses did not arrive before the deadline.
    #[error("timed out waiting for responses: {}", join_messages(missing))]
    Timeout { missing: Vec<EventKind> },

    /// A listener failed with a domain error.
    #[error("listener failed: {0}")]
    Listener(#[source] BoxError),

    /// One or more listeners of a published event failed.
    #[error("dispatch {kind}: {}", join_messages(errors))]
    Dispatch {
        kind: EventKind,
        errors: Vec<BusError>,
    },
}

impl BusError {
    /// Wrap a domain error returned from a listener.
    pub fn listener<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        BusError::Listener(Box::new(err))
    }

    /// Invalid payload for a listener.
    pub fn invalid_event(expected: &'static str, actual: EventKind) -> Self {
        BusError::InvalidEvent { expected, actual }
    }

    /// This error and every error nested in a dispatch, depth first.
    pub fn flatten(&self) -> Vec<&BusError> {
        let mut out = vec![self];
        if let BusError::Dispatch { errors, .. } = self {
            for err in errors {
                out.extend(err.flatten());
            }
        }
        out
    }

    /// First listener error of type `E`, searching nested dispatch errors.
    pub fn find_listener_error<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.flatten().into_iter().find_map(|err| match err {
            BusError::Listener(inner) => inner.downcast_ref::<E>(),
            _ => None,
        })
    }

    /// True if any flattened error matches.
    pub fn any(&self, pred: impl Fn(&BusError) -> bool) -> bool {
        self.flatten().into_iter().any(pred)
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Timeout { .. })
    }

    /// Get error code for outer layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            BusError::InvalidEvent { .. } => "INVALID_EVENT",
            BusError::InvalidChannel => "INVALID_CHANNEL",
            BusError::ResponseChannelFull => "RESPONSE_CHANNEL_FULL",
            BusError::Timeout { .. } => "TIMEOUT",
            BusError::Listener(_) => "LISTENER_FAILED",
            BusError::Dispatch { .. } => "DISPATCH_FAILED",
        }
    }
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;
