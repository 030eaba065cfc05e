use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::{non_empty, AddressProvider, FormattedAddress, LookupError, UNKNOWN_TOWN};
use crate::http::HttpFetcher;

const NAME: &str = "geocoding";
const MAX_RESULTS: usize = 5;

/// Google-style geocoder used as the last resort for free-text searches.
pub struct GeocodingProvider {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl GeocodingProvider {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl AddressProvider for GeocodingProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        non_empty(self.api_key.as_deref()).is_some()
    }

    async fn lookup(&self, raw: &str) -> Result<Vec<FormattedAddress>, LookupError> {
        let Some(api_key) = non_empty(self.api_key.as_deref()) else {
            return Err(LookupError::RequestDenied {
                provider: NAME,
                reason: "geocoding API key not configured".to_string(),
            });
        };

        let term = raw.trim();
        if term.is_empty() {
            return Err(LookupError::InvalidPostcodeFormat {
                input: String::new(),
            });
        }

        let url = format!("{}/geocode/json", self.base_url.trim_end_matches('/'));
        let query = [
            ("address", format!("{term}, UK")),
            ("region", "uk".to_string()),
            ("key", api_key),
        ];

        let response = self
            .fetcher
            .get_json(&url, &query)
            .await
            .map_err(|err| LookupError::transport(NAME, err))?;
        if !response.is_success() {
            return Err(LookupError::status(NAME, response.status));
        }

        let payload: GeocodeResponse =
            serde_json::from_value(response.body).map_err(|err| LookupError::malformed(NAME, err))?;

        match payload.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => {
                return Err(LookupError::NoAddressesFound {
                    postcode: term.to_string(),
                })
            }
            "REQUEST_DENIED" => {
                return Err(LookupError::RequestDenied {
                    provider: NAME,
                    reason: payload
                        .error_message
                        .unwrap_or_else(|| "REQUEST_DENIED".to_string()),
                })
            }
            other => {
                return Err(LookupError::AddressLookupFailed {
                    provider: NAME,
                    reason: match payload.error_message {
                        Some(message) => format!("{other}: {message}"),
                        None => other.to_string(),
                    },
                })
            }
        }

        let addresses: Vec<FormattedAddress> = payload
            .results
            .iter()
            .take(MAX_RESULTS)
            .map(format_result)
            .collect();
        debug!(term, count = addresses.len(), "geocoder returned addresses");

        if addresses.is_empty() {
            return Err(LookupError::NoAddressesFound {
                postcode: term.to_string(),
            });
        }
        Ok(addresses)
    }
}

impl GeocodeResult {
    fn component(&self, kind: &str) -> Option<&str> {
        self.address_components
            .iter()
            .find(|component| component.types.iter().any(|t| t == kind))
            .map(|component| component.long_name.as_str())
    }
}

fn format_result(result: &GeocodeResult) -> FormattedAddress {
    let number = non_empty(result.component("street_number"));
    let route = non_empty(result.component("route"));
    let postcode = non_empty(result.component("postal_code"));
    let locality = non_empty(result.component("locality"));
    let postal_town = non_empty(result.component("postal_town"));
    let county = non_empty(result.component("administrative_area_level_2"));

    let street = match (number, route) {
        (Some(number), Some(route)) => format!("{number} {route}"),
        (None, Some(route)) => route,
        (Some(number), None) => number,
        (None, None) => result
            .formatted_address
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    };
    let address_line1 = match &postcode {
        Some(postcode) if !street.contains(postcode.as_str()) => format!("{street}, {postcode}"),
        _ => street,
    };

    let town = postal_town
        .clone()
        .or_else(|| locality.clone())
        .unwrap_or_else(|| UNKNOWN_TOWN.to_string());
    let address_line2 = match (&postal_town, locality) {
        (Some(town), Some(locality)) if *town != locality => Some(locality),
        _ => None,
    };

    let mut address = FormattedAddress::new(address_line1, town);
    address.address_line2 = address_line2;
    address.county = county;
    address.postcode = postcode;
    address
}
