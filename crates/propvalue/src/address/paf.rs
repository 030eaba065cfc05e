use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{AddressProvider, FormattedAddress, LookupError, UNKNOWN_TOWN};
use crate::http::HttpFetcher;
use crate::postcode::{normalize, NormalizedPostcode};

const NAME: &str = "paf";

/// Royal Mail PAF-backed finder (getAddress.io style `find` endpoint).
pub struct PafProvider {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    addresses: Vec<String>,
}

impl PafProvider {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl AddressProvider for PafProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn lookup(&self, raw: &str) -> Result<Vec<FormattedAddress>, LookupError> {
        let postcode = normalize(raw)?;
        let url = format!(
            "{}/find/{}",
            self.base_url.trim_end_matches('/'),
            postcode.compact()
        );
        // A missing key is sent as-is so the provider reports the auth failure.
        let query = [
            ("api-key", self.api_key.clone().unwrap_or_default()),
            ("sort", "true".to_string()),
        ];

        let response = self
            .fetcher
            .get_json(&url, &query)
            .await
            .map_err(|err| LookupError::transport(NAME, err))?;

        match response.status {
            401 | 403 => {
                return Err(LookupError::RequestDenied {
                    provider: NAME,
                    reason: provider_message(&response.body)
                        .unwrap_or_else(|| format!("HTTP {}", response.status)),
                })
            }
            404 => {
                return Err(LookupError::NoAddressesFound {
                    postcode: postcode.to_string(),
                })
            }
            status if !response.is_success() => return Err(LookupError::status(NAME, status)),
            _ => {}
        }

        let payload: FindResponse =
            serde_json::from_value(response.body).map_err(|err| LookupError::malformed(NAME, err))?;

        if payload.addresses.is_empty() {
            return Err(LookupError::NoAddressesFound {
                postcode: postcode.to_string(),
            });
        }

        debug!(postcode = %postcode, count = payload.addresses.len(), "paf addresses returned");

        Ok(payload
            .addresses
            .iter()
            .map(|line| parse_address(line, &postcode))
            .collect())
    }
}

fn provider_message(body: &Value) -> Option<String> {
    body.get("Message")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Map `"line1, line2, line3, line4, locality, town, county"` onto the form shape.
pub(crate) fn parse_address(raw: &str, postcode: &NormalizedPostcode) -> FormattedAddress {
    let segments: Vec<&str> = raw.split(',').map(str::trim).collect();

    let first = segments.first().copied().unwrap_or_default();
    let address_line1 = if first.is_empty() {
        postcode.to_string()
    } else {
        format!("{first}, {postcode}")
    };

    let address_line2 = segments
        .get(1)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string());

    let trailing: Vec<&str> = segments
        .iter()
        .skip(2)
        .copied()
        .filter(|segment| !segment.is_empty())
        .collect();

    let (town, county) = match trailing.as_slice() {
        [] => (UNKNOWN_TOWN.to_string(), None),
        [town] => (town.to_string(), None),
        [.., town, county] => (town.to_string(), Some(county.to_string())),
    };

    let mut address = FormattedAddress::new(address_line1, town);
    address.address_line2 = address_line2;
    address.county = county;
    address.postcode = Some(postcode.to_string());
    address
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeFetcher;
    use serde_json::json;

    const BASE: &str = "https://paf.test";

    fn provider(fetcher: FakeFetcher) -> PafProvider {
        PafProvider::new(Arc::new(fetcher), BASE, Some("secret".to_string()))
    }

    #[test]
    fn parse_address_uses_trailing_segments_for_town_and_county() {
        let postcode = normalize("nw1 8ab").unwrap();
        let address = parse_address(
            "Flat 1, 2 High Street, , , Camden, London, Greater London",
            &postcode,
        );
        assert_eq!(address.address_line1, "Flat 1, NW1 8AB");
        assert_eq!(address.address_line2.as_deref(), Some("2 High Street"));
        assert_eq!(address.town, "London");
        assert_eq!(address.county.as_deref(), Some("Greater London"));
        assert_eq!(address.country, "United Kingdom");
        assert!(!address.approximate);
    }

    #[test]
    fn parse_address_handles_sparse_rows() {
        let postcode = normalize("SW1A2AA").unwrap();
        let address = parse_address("10 Downing Street, , , , , London, ", &postcode);
        assert_eq!(address.address_line1, "10 Downing Street, SW1A 2AA");
        assert!(address.address_line2.is_none());
        assert_eq!(address.town, "London");
        assert!(address.county.is_none());

        let bare = parse_address("Somewhere", &postcode);
        assert_eq!(bare.town, "Unknown");
    }

    #[tokio::test]
    async fn lookup_maps_each_returned_line() {
        let fetcher = FakeFetcher::default().with(
            "https://paf.test/find/SW1A2AA",
            200,
            json!({ "addresses": [
                "10 Downing Street, , , , , London, ",
                "11 Downing Street, , , , , London, "
            ]}),
        );
        let provider = provider(fetcher);

        let addresses = provider.lookup("sw1a 2aa").await.expect("lookup succeeds");
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[1].address_line1, "11 Downing Street, SW1A 2AA");
    }

    #[tokio::test]
    async fn lookup_sends_key_and_sort_flag() {
        let fetcher = Arc::new(FakeFetcher::default().with(
            "https://paf.test/find/EC1A1BB",
            200,
            json!({ "addresses": ["1 Little Britain, , , , , London, "] }),
        ));
        let provider = PafProvider::new(fetcher.clone(), BASE, None);
        provider.lookup("EC1A 1BB").await.expect("lookup succeeds");

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains(&("api-key".to_string(), String::new())));
        assert!(calls[0].1.contains(&("sort".to_string(), "true".to_string())));
    }

    #[tokio::test]
    async fn lookup_rejects_malformed_postcode_without_calling_out() {
        let fetcher = Arc::new(FakeFetcher::default());
        let provider = PafProvider::new(fetcher.clone(), BASE, None);

        let error = provider.lookup("not a postcode").await.expect_err("invalid");
        assert!(matches!(error, LookupError::InvalidPostcodeFormat { .. }));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn lookup_distinguishes_empty_denied_and_failed() {
        let fetcher = FakeFetcher::default()
            .with("https://paf.test/find/EC1A1BB", 200, json!({ "addresses": [] }))
            .with(
                "https://paf.test/find/M11AE",
                401,
                json!({ "Message": "Invalid API key." }),
            )
            .with("https://paf.test/find/B338TH", 500, Value::Null);
        let provider = provider(fetcher);

        assert!(matches!(
            provider.lookup("EC1A 1BB").await,
            Err(LookupError::NoAddressesFound { .. })
        ));
        match provider.lookup("M1 1AE").await {
            Err(LookupError::RequestDenied { reason, .. }) => {
                assert_eq!(reason, "Invalid API key.")
            }
            other => panic!("expected denial, got {other:?}"),
        }
        assert!(matches!(
            provider.lookup("B33 8TH").await,
            Err(LookupError::AddressLookupFailed { .. })
        ));
        assert!(matches!(
            provider.lookup("W1A 0AX").await,
            Err(LookupError::AddressLookupFailed { .. })
        ));
    }
}
