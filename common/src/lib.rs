//! xrate Common Types
//!
//! Value types shared across the xrate workspace: currency pairs, exchange
//! rates, upstream provider configuration and subscriber e-mail addresses.

pub mod config;
pub mod currency;
pub mod email;
pub mod error;
pub mod time;

pub use config::ProviderConfig;
pub use currency::{Currency, CurrencyPair, ExchangeRate};
pub use email::EmailAddress;
pub use error::*;
pub use time::*;
