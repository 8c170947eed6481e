//! CoinYep price endpoint.

use serde::Deserialize;
use xrate_common::{CurrencyPair, ProviderConfig};

use super::{decode, endpoint_with_query, parse_number, RateApi};
use crate::error::RateResult;
use crate::http::HttpRequest;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: String,
}

/// Public endpoint; the price arrives as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinYep;

impl RateApi for CoinYep {
    fn name(&self) -> &'static str {
        "coinyep"
    }

    fn build_request(&self, config: &ProviderConfig, pair: &CurrencyPair) -> RateResult<HttpRequest> {
        let url = endpoint_with_query(
            self.name(),
            &config.endpoint,
            &[
                ("from", pair.base_currency()),
                ("to", pair.quote_currency()),
                ("lang", "en"),
                ("format", "json"),
            ],
        )?;
        Ok(HttpRequest::get(url))
    }

    fn parse_rate(&self, _pair: &CurrencyPair, body: &str) -> RateResult<f64> {
        let data: PriceResponse = decode(self.name(), body)?;
        parse_number(self.name(), &data.price)
    }
}
