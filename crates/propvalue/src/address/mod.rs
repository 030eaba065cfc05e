//! Address lookup against external postcode providers.
//!
//! Three strategies share the [`AddressProvider`] contract: the PAF-backed
//! finder, the free postcode geography service, and the geocoder. The
//! [`AddressResolver`] walks them in configured order behind a per-provider
//! [`ProviderGuard`].

pub mod geocoding;
pub mod geography;
pub mod guard;
pub mod paf;
pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::FetchError;

pub use geocoding::GeocodingProvider;
pub use geography::{GeographyProvider, PostcodeRecord};
pub use guard::{GuardPolicy, GuardRejection, ProviderGuard};
pub use paf::PafProvider;
pub use resolver::{AddressResolver, Resolution};

pub const UNITED_KINGDOM: &str = "United Kingdom";
pub const UNKNOWN_TOWN: &str = "Unknown";

/// One postal address in the shape the valuation and contact forms pre-fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedAddress {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub town: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    /// Set when the address was synthesized from area names rather than PAF data.
    #[serde(default)]
    pub approximate: bool,
}

impl FormattedAddress {
    pub fn new(address_line1: impl Into<String>, town: impl Into<String>) -> Self {
        Self {
            address_line1: address_line1.into(),
            address_line2: None,
            town: town.into(),
            county: None,
            country: UNITED_KINGDOM.to_string(),
            postcode: None,
            approximate: false,
        }
    }
}

/// Failure modes surfaced by address providers and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("'{input}' is not a valid UK postcode")]
    InvalidPostcodeFormat { input: String },
    #[error("no addresses found for {postcode}")]
    NoAddressesFound { postcode: String },
    #[error("{provider} address lookup failed: {reason}")]
    AddressLookupFailed {
        provider: &'static str,
        reason: String,
    },
    #[error("{provider} denied the request: {reason}")]
    RequestDenied {
        provider: &'static str,
        reason: String,
    },
    #[error("unknown address provider '{name}'")]
    UnknownProvider { name: String },
}

impl LookupError {
    pub(crate) fn transport(provider: &'static str, err: FetchError) -> Self {
        Self::AddressLookupFailed {
            provider,
            reason: err.to_string(),
        }
    }

    pub(crate) fn status(provider: &'static str, status: u16) -> Self {
        Self::AddressLookupFailed {
            provider,
            reason: format!("provider responded with HTTP {status}"),
        }
    }

    pub(crate) fn malformed(provider: &'static str, err: serde_json::Error) -> Self {
        Self::AddressLookupFailed {
            provider,
            reason: format!("unexpected response shape: {err}"),
        }
    }
}

/// A single address lookup strategy.
#[async_trait]
pub trait AddressProvider: Send + Sync {
    /// Stable identifier used in configuration and API query strings.
    fn name(&self) -> &'static str;

    /// `false` when the provider can only answer with a local denial, e.g. a
    /// missing API key. Such calls bypass the rate limiter and breaker.
    fn is_configured(&self) -> bool {
        true
    }

    async fn lookup(&self, raw: &str) -> Result<Vec<FormattedAddress>, LookupError>;
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
