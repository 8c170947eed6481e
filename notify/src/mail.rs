//! Outgoing mail.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::model::Message;

/// Failure to deliver one message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("sending to {recipient}: {reason}")]
pub struct MailError {
    pub recipient: String,
    pub reason: String,
    pub retryable: bool,
}

impl MailError {
    pub fn new(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            reason: reason.into(),
            retryable: true,
        }
    }

    pub fn permanent(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            retryable: false,
            ..Self::new(recipient, reason)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Delivers messages.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), MailError>;
}

/// Sender that only writes messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        info!(
            from = message.from.as_ref().map(|f| f.as_str()).unwrap_or("-"),
            to = %message.to.as_str(),
            subject = %message.subject,
            body = %message.body,
            "Sending message"
        );
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingMailer;

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Keeps every message; fails for chosen recipients.
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<Message>>,
        reject: HashSet<String>,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every message addressed to `address`.
        pub fn rejecting(mut self, address: impl Into<String>) -> Self {
            self.reject.insert(address.into());
            self
        }

        pub fn sent(&self) -> Vec<Message> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl MailSender for RecordingMailer {
        async fn send(&self, message: &Message) -> Result<(), MailError> {
            let to = message.to.as_str();
            if self.reject.contains(to) {
                return Err(MailError::permanent(to, "mailbox unavailable"));
            }
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }
}
