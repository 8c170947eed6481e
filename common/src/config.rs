//! Upstream provider configuration.

use serde::{Deserialize, Serialize};

/// Placeholder used in configuration for "no header" / "no key".
pub const UNSET: &str = "-";

/// Endpoint and credentials of one exchange-rate provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API.
    pub endpoint: String,
    /// Name of the header (or query parameter) carrying the key.
    pub header: String,
    /// API key.
    pub key: String,
}

impl ProviderConfig {
    pub fn new(
        endpoint: impl Into<String>,
        header: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            header: header.into(),
            key: key.into(),
        }
    }

    /// Provider without credentials.
    pub fn public(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, UNSET, UNSET)
    }

    /// Header name and key, if both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let set = |s: &str| !s.is_empty() && s != UNSET;
        if set(&self.header) && set(&self.key) {
            Some((self.header.as_str(), self.key.as_str()))
        } else {
            None
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        let cfg = ProviderConfig::new("https://api.example.com", "X-Api-Key", "secret");
        assert_eq!(cfg.credentials(), Some(("X-Api-Key", "secret")));

        assert_eq!(ProviderConfig::public("https://api.example.com").credentials(), None);
        assert_eq!(
            ProviderConfig::new("https://api.example.com", "X-Api-Key", "").credentials(),
            None
        );
    }

    #[test]
    fn test_disabled_without_endpoint() {
        assert!(!ProviderConfig::default().is_enabled());
        assert!(ProviderConfig::public("https://api.example.com").is_enabled());
    }
}
