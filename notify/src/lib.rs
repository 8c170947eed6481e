//! xrate Notifications
//!
//! Subscriptions to currency pairs and the e-mails sent to subscribers.
//!
//! Subscriptions are kept in a [`xrate_store::FileStore`], one file per
//! address and topic. Sending asks the event bus for the current rate and
//! the topic's subscribers in a single request, then hands one message per
//! subscriber to a [`MailSender`].

pub mod compose;
pub mod error;
pub mod mail;
pub mod model;
pub mod repository;
pub mod service;

pub use compose::MessageComposer;
pub use error::{NotifyError, NotifyResult};
pub use mail::{LogMailer, MailError, MailSender};
pub use model::{ExchangeRateData, Message, Subscriber, Subscription};
pub use repository::{FileSubscriptionRepository, SubscriptionRepository};
pub use service::{respond_subscribers, SubscribersResponder, SubscriptionService};

#[cfg(any(test, feature = "test-utils"))]
pub use mail::RecordingMailer;
