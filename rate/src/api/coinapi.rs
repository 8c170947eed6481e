//! CoinAPI exchange rate endpoint.

use serde::Deserialize;
use xrate_common::{CurrencyPair, ProviderConfig};

use super::{decode, endpoint_with_query, RateApi};
use crate::error::RateResult;
use crate::http::HttpRequest;

#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: f64,
}

/// `GET {endpoint}/BASE/QUOTE` with the key in a header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinApi;

impl RateApi for CoinApi {
    fn name(&self) -> &'static str {
        "coinapi"
    }

    fn build_request(&self, config: &ProviderConfig, pair: &CurrencyPair) -> RateResult<HttpRequest> {
        let mut url = endpoint_with_query(self.name(), &config.endpoint, &[])?;
        let path = format!(
            "{}/{}/{}",
            url.path().trim_end_matches('/'),
            pair.base_currency(),
            pair.quote_currency()
        );
        url.set_path(&path);

        let mut request = HttpRequest::get(url);
        if let Some((header, key)) = config.credentials() {
            request = request.with_header(header, key);
        }
        Ok(request)
    }

    fn parse_rate(&self, _pair: &CurrencyPair, body: &str) -> RateResult<f64> {
        let data: RateResponse = decode(self.name(), body)?;
        Ok(data.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "UAH")
    }

    #[test]
    fn test_build_request() {
        let config = ProviderConfig::new(
            "https://rest.coinapi.io/v1/exchangerate/",
            "X-CoinAPI-Key",
            "secret",
        );
        let request = CoinApi
            .build_request(&config, &CurrencyPair::new("btc", "uah"))
            .unwrap();

        assert_eq!(request.url, "https://rest.coinapi.io/v1/exchangerate/BTC/UAH");
        assert_eq!(
            request.headers.get("x-coinapi-key").map(String::as_str),
            Some("secret")
        );
    }

    #[test]
    fn test_parse_rate() {
        let body = r#"{
            "time": "2024-01-02T15:04:05.0000000Z",
            "asset_id_base": "BTC",
            "asset_id_quote": "UAH",
            "rate": 1601234.5
        }"#;
        assert_eq!(CoinApi.parse_rate(&pair(), body).unwrap(), 1601234.5);
    }
}
