//! API Ninjas exchange rate endpoint.

use serde::Deserialize;
use xrate_common::{CurrencyPair, ProviderConfig};

use super::{decode, endpoint_with_query, RateApi};
use crate::error::RateResult;
use crate::http::HttpRequest;

#[derive(Debug, Deserialize)]
struct PairResponse {
    exchange_rate: f64,
}

/// `GET {endpoint}?pair=BASE_QUOTE` with the key in a header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ninjas;

impl RateApi for Ninjas {
    fn name(&self) -> &'static str {
        "ninjas"
    }

    fn build_request(&self, config: &ProviderConfig, pair: &CurrencyPair) -> RateResult<HttpRequest> {
        let symbol = format!("{}_{}", pair.base_currency(), pair.quote_currency());
        let url = endpoint_with_query(self.name(), &config.endpoint, &[("pair", symbol.as_str())])?;

        let mut request = HttpRequest::get(url);
        if let Some((header, key)) = config.credentials() {
            request = request.with_header(header, key);
        }
        Ok(request)
    }

    fn parse_rate(&self, _pair: &CurrencyPair, body: &str) -> RateResult<f64> {
        let data: PairResponse = decode(self.name(), body)?;
        Ok(data.exchange_rate)
    }
}
