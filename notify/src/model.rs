//! Subscription records and outgoing messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use xrate_common::{CurrencyPair, EmailAddress};

/// Someone who receives rate notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscriber {
    pub address: EmailAddress,
}

impl Subscriber {
    pub fn new(address: EmailAddress) -> Self {
        Self { address }
    }
}

/// A subscriber following one currency pair. Stored once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber: Subscriber,
    pub topic: CurrencyPair,
}

impl Subscription {
    pub fn new(subscriber: Subscriber, topic: CurrencyPair) -> Self {
        Self { subscriber, topic }
    }

    /// Record key: lower-cased address plus topic, e.g. `jane@example.com_BTC_UAH`.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.subscriber.address.normalized(),
            self.topic.base_currency(),
            self.topic.quote_currency()
        )
    }

    pub fn address(&self) -> &EmailAddress {
        &self.subscriber.address
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.subscriber.address.as_str(), self.topic)
    }
}

/// One e-mail to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: Option<EmailAddress>,
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}

/// Everything needed to notify the subscribers of one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateData {
    pub pair: CurrencyPair,
    pub rate: f64,
    pub subscribers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_normalised() {
        let address = EmailAddress::parse("Jane <Jane@Example.COM>").unwrap();
        let sub = Subscription::new(Subscriber::new(address), CurrencyPair::new("btc", "uah"));

        assert_eq!(sub.key(), "jane@example.com_BTC_UAH");
    }

    #[test]
    fn test_display() {
        let address = EmailAddress::parse("jane@example.com").unwrap();
        let sub = Subscription::new(Subscriber::new(address), CurrencyPair::new("BTC", "UAH"));

        assert_eq!(sub.to_string(), "jane@example.com -> BTC/UAH");
    }
}
