//! Upstream scheme type.

use serde::{Deserialize, Serialize};

/// Scheme used for the upstream exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP
    #[default]
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// Get scheme name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Parse scheme from a URL scheme string
    pub fn from_scheme(scheme: &str) -> Result<Self, String> {
        match scheme.to_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(format!("Unsupported upstream scheme: {scheme}")),
        }
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_scheme(s)
    }
}
