//! Subscriber e-mail addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, Result};

/// An e-mail address with an optional display name.
///
/// Accepts `jane@example.com` and `Jane Doe <jane@example.com>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
}

impl EmailAddress {
    /// Parse an address, optionally in `Name <addr>` form.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CommonError::MissingEmail);
        }

        let (name, address) = match (input.find('<'), input.rfind('>')) {
            (Some(open), Some(close)) if open < close && close == input.len() - 1 => {
                let name = input[..open].trim().trim_matches('"').trim();
                let name = (!name.is_empty()).then(|| name.to_string());
                (name, input[open + 1..close].trim())
            }
            (None, None) => (None, input),
            _ => return Err(CommonError::InvalidEmail(input.to_string())),
        };

        if !Self::is_valid_address(address) {
            return Err(CommonError::InvalidEmail(input.to_string()));
        }

        Ok(Self {
            name,
            address: address.to_string(),
        })
    }

    fn is_valid_address(address: &str) -> bool {
        let Some((local, domain)) = address.rsplit_once('@') else {
            return false;
        };

        !local.is_empty()
            && !domain.is_empty()
            && !local.contains('@')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && address.len() <= 254
            && address
                .chars()
                .all(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '/' | '\\' | '<' | '>'))
    }

    /// The bare address.
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Lower-cased address used as a uniqueness key.
    pub fn normalized(&self) -> String {
        self.address.to_lowercase()
    }
}

impl FromStr for EmailAddress {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{}\" <{}>", name, self.address),
            None => write!(f, "<{}>", self.address),
        }
    }
}
