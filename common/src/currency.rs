//! Currency and exchange-rate value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, Result};

/// ISO 4217 (or crypto ticker) currency code, always upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Codes are non-empty ASCII letters and digits, so they are safe in
    /// file names and record keys.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A currency pair, also used as a subscription topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency (the one being priced).
    pub base: Currency,
    /// Quote currency (the pricing currency).
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair. Both sides are upper-cased.
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    pub fn base_currency(&self) -> &str {
        self.base.code()
    }

    pub fn quote_currency(&self) -> &str {
        self.quote.code()
    }

    /// A pair is valid when both codes are non-empty ASCII alphanumerics.
    pub fn validate(&self) -> Result<()> {
        if !self.base.is_valid() || !self.quote.is_valid() {
            return Err(CommonError::InvalidCurrency(format!(
                "{:?}/{:?}",
                self.base.code(),
                self.quote.code()
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Parses `BTC/UAH`, `btc_uah` or `BTC-UAH`.
impl FromStr for CurrencyPair {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        let (base, quote) = s
            .split_once(['/', '_', '-'])
            .ok_or_else(|| CommonError::InvalidCurrency(s.to_string()))?;

        let pair = CurrencyPair::new(base, quote);
        pair.validate()?;
        Ok(pair)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Exchange rate for a pair, as returned by a single provider.
///
/// The value is whatever the provider reported; no bounds checking is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub value: f64,
    pub pair: CurrencyPair,
}

impl ExchangeRate {
    pub fn new(value: f64, pair: CurrencyPair) -> Self {
        Self { value, pair }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pair, self.value)
    }
}
