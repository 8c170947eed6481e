//! Message text for rate notifications.

use xrate_common::{format_stamp, EmailAddress, Timestamp};

use crate::model::{ExchangeRateData, Message};

/// Builds the subject and body sent to every subscriber of a topic.
#[derive(Debug, Clone, Default)]
pub struct MessageComposer {
    from: Option<EmailAddress>,
}

impl MessageComposer {
    pub fn new(from: Option<EmailAddress>) -> Self {
        Self { from }
    }

    /// `BTC/UAH exchange rate at Jan  2 15:04:05`
    pub fn subject(&self, data: &ExchangeRateData, at: &Timestamp) -> String {
        format!("{} exchange rate at {}", data.pair, format_stamp(at))
    }

    /// `Current exchange rate: 1612345.670000`
    pub fn body(&self, data: &ExchangeRateData) -> String {
        format!("Current exchange rate: {:.6}", data.rate)
    }

    pub fn compose(&self, data: &ExchangeRateData, to: EmailAddress, at: &Timestamp) -> Message {
        Message {
            from: self.from.clone(),
            to,
            subject: self.subject(data, at),
            body: self.body(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use xrate_common::CurrencyPair;

    #[test]
    fn test_compose() {
        let composer = MessageComposer::new(Some(EmailAddress::parse("rates@xrate.dev").unwrap()));
        let data = ExchangeRateData {
            pair: CurrencyPair::new("BTC", "UAH"),
            rate: 1612345.67,
            subscribers: vec![],
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap();
        let to = EmailAddress::parse("jane@example.com").unwrap();

        let message = composer.compose(&data, to.clone(), &at);

        assert_eq!(message.to, to);
        assert_eq!(message.from.as_ref().map(|f| f.as_str()), Some("rates@xrate.dev"));
        assert_eq!(message.subject, "BTC/UAH exchange rate at Jan  2 15:04:05");
        assert_eq!(message.body, "Current exchange rate: 1612345.670000");
    }
}
