use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{non_empty, AddressProvider, FormattedAddress, LookupError, UNKNOWN_TOWN};
use crate::http::{FetchResponse, HttpFetcher};
use crate::postcode::{compact_upper, NormalizedPostcode};

const NAME: &str = "geography";
const NEIGHBOUR_LIMIT: usize = 4;

/// Geographic record for one postcode as published by postcodes.io.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostcodeRecord {
    pub postcode: String,
    #[serde(default)]
    pub admin_district: Option<String>,
    #[serde(default)]
    pub admin_ward: Option<String>,
    #[serde(default)]
    pub parish: Option<String>,
    #[serde(default)]
    pub admin_county: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

/// Free, keyless postcode geography service.
///
/// It has no street-level data, so the addresses it returns are synthesized
/// from ward, parish, and district names and always flagged `approximate`.
pub struct GeographyProvider {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
}

impl GeographyProvider {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Full geographic record for a postcode, `None` when the service has no entry.
    pub async fn postcode_record(
        &self,
        postcode: &NormalizedPostcode,
    ) -> Result<Option<PostcodeRecord>, LookupError> {
        self.record(&postcode.compact()).await
    }

    async fn validate(&self, term: &str) -> Result<bool, LookupError> {
        let response = self.get(&format!("postcodes/{term}/validate"), &[]).await?;
        Ok(decode::<bool>(response)?.unwrap_or(false))
    }

    async fn autocomplete(&self, term: &str) -> Result<Vec<String>, LookupError> {
        let response = self
            .get(&format!("postcodes/{term}/autocomplete"), &[])
            .await?;
        Ok(decode::<Vec<String>>(response)?.unwrap_or_default())
    }

    async fn record(&self, term: &str) -> Result<Option<PostcodeRecord>, LookupError> {
        let response = self.get(&format!("postcodes/{term}"), &[]).await?;
        if response.status == 404 {
            return Ok(None);
        }
        decode(response)
    }

    async fn nearest(&self, term: &str) -> Result<Vec<PostcodeRecord>, LookupError> {
        let limit = (NEIGHBOUR_LIMIT + 1).to_string();
        let response = self
            .get(&format!("postcodes/{term}/nearest"), &[("limit", limit)])
            .await?;
        Ok(decode::<Vec<PostcodeRecord>>(response)?.unwrap_or_default())
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<FetchResponse, LookupError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .fetcher
            .get_json(&url, query)
            .await
            .map_err(|err| LookupError::transport(NAME, err))?;

        if !response.is_success() && response.status != 404 {
            return Err(LookupError::status(NAME, response.status));
        }
        Ok(response)
    }

    /// Complete a partial postcode through autocomplete when validation fails.
    async fn resolve_term(&self, term: String) -> Result<Option<String>, LookupError> {
        if self.validate(&term).await? {
            return Ok(Some(term));
        }

        let Some(suggestion) = self.autocomplete(&term).await?.into_iter().next() else {
            return Ok(None);
        };
        let completed = sanitize(&suggestion);
        debug!(partial = %term, completed = %completed, "postcode completed by autocomplete");

        if !completed.is_empty() && self.validate(&completed).await? {
            Ok(Some(completed))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl AddressProvider for GeographyProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn lookup(&self, raw: &str) -> Result<Vec<FormattedAddress>, LookupError> {
        let term = sanitize(raw);
        if term.is_empty() {
            return Err(LookupError::InvalidPostcodeFormat {
                input: raw.trim().to_string(),
            });
        }

        // Well-formed but unknown postcodes are an empty answer, not an error.
        let Some(term) = self.resolve_term(term).await? else {
            return Ok(Vec::new());
        };
        let Some(own) = self.record(&term).await? else {
            return Ok(Vec::new());
        };

        let neighbours = match self.nearest(&term).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, postcode = %own.postcode, "nearest postcode lookup failed");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        seen.insert(own.postcode.clone());
        let mut records = vec![own];
        for record in neighbours {
            if records.len() > NEIGHBOUR_LIMIT {
                break;
            }
            if seen.insert(record.postcode.clone()) {
                records.push(record);
            }
        }

        Ok(records.iter().flat_map(synthesize_addresses).collect())
    }
}

fn decode<T: DeserializeOwned>(response: FetchResponse) -> Result<Option<T>, LookupError> {
    if response.status == 404 {
        return Ok(None);
    }
    let envelope: Envelope<T> =
        serde_json::from_value(response.body).map_err(|err| LookupError::malformed(NAME, err))?;
    Ok(envelope.result)
}

fn sanitize(raw: &str) -> String {
    compact_upper(raw)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Two placeholder addresses per record, street names borrowed from the
/// ward, parish, or district the postcode sits in.
pub(crate) fn synthesize_addresses(record: &PostcodeRecord) -> Vec<FormattedAddress> {
    let mut streets: Vec<String> = Vec::new();
    for candidate in [&record.admin_ward, &record.parish, &record.admin_district] {
        let Some(name) = non_empty(candidate.as_deref()) else {
            continue;
        };
        // Parish names arrive as "Westminster, unparished area".
        let name = name
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if !name.is_empty() && !streets.contains(&name) {
            streets.push(name);
        }
    }
    if streets.is_empty() {
        streets.push(UNKNOWN_TOWN.to_string());
    }

    let town = non_empty(record.admin_district.as_deref()).unwrap_or_else(|| UNKNOWN_TOWN.to_string());
    let county = non_empty(record.admin_county.as_deref())
        .or_else(|| non_empty(record.region.as_deref()));

    (1..=2)
        .map(|house| {
            let street = &streets[(house - 1) % streets.len()];
            let mut address = FormattedAddress::new(
                format!("{house} {street}, {}", record.postcode),
                town.clone(),
            );
            address.county = county.clone();
            address.postcode = Some(record.postcode.clone());
            address.approximate = true;
            address
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeFetcher;
    use serde_json::{json, Value};

    const BASE: &str = "https://geo.test";

    fn record_json(postcode: &str, ward: &str) -> Value {
        json!({
            "postcode": postcode,
            "admin_district": "Islington",
            "admin_ward": ward,
            "parish": "Islington, unparished area",
            "admin_county": null,
            "region": "London",
            "country": "England"
        })
    }

    fn valid_fetcher() -> FakeFetcher {
        FakeFetcher::default()
            .with("https://geo.test/postcodes/N11AA/validate", 200, json!({ "result": true }))
            .with(
                "https://geo.test/postcodes/N11AA",
                200,
                json!({ "result": record_json("N1 1AA", "St Peter's") }),
            )
            .with(
                "https://geo.test/postcodes/N11AA/nearest",
                200,
                json!({ "result": [
                    record_json("N1 1AA", "St Peter's"),
                    record_json("N1 1AB", "Canonbury"),
                    record_json("N1 1AD", "Canonbury"),
                    record_json("N1 1AE", "Barnsbury"),
                    record_json("N1 1AF", "Barnsbury"),
                    record_json("N1 1AG", "Barnsbury")
                ]}),
            )
    }

    #[tokio::test]
    async fn lookup_synthesizes_two_addresses_per_record() {
        let provider = GeographyProvider::new(Arc::new(valid_fetcher()), BASE);

        let addresses = provider.lookup("n1 1aa").await.expect("lookup succeeds");

        // own record plus four neighbours, two addresses each
        assert_eq!(addresses.len(), 10);
        assert!(addresses.iter().all(|address| address.approximate));
        assert_eq!(addresses[0].address_line1, "1 St Peter's, N1 1AA");
        assert_eq!(addresses[1].address_line1, "2 Islington, N1 1AA");
        assert_eq!(addresses[0].town, "Islington");
        assert_eq!(addresses[0].county.as_deref(), Some("London"));
        assert!(addresses
            .iter()
            .all(|address| address.postcode.as_deref() != Some("N1 1AG")));
    }

    #[tokio::test]
    async fn lookup_completes_partial_postcodes() {
        let fetcher = valid_fetcher()
            .with("https://geo.test/postcodes/N11A/validate", 200, json!({ "result": false }))
            .with(
                "https://geo.test/postcodes/N11A/autocomplete",
                200,
                json!({ "result": ["N1 1AA", "N1 1AB"] }),
            );
        let provider = GeographyProvider::new(Arc::new(fetcher), BASE);

        let addresses = provider.lookup("N1 1A").await.expect("lookup succeeds");
        assert_eq!(addresses[0].postcode.as_deref(), Some("N1 1AA"));
    }

    #[tokio::test]
    async fn unresolvable_postcode_yields_empty_list() {
        let fetcher = FakeFetcher::default()
            .with("https://geo.test/postcodes/ZZ99ZZ/validate", 200, json!({ "result": false }))
            .with(
                "https://geo.test/postcodes/ZZ99ZZ/autocomplete",
                200,
                json!({ "result": null }),
            );
        let provider = GeographyProvider::new(Arc::new(fetcher), BASE);

        let addresses = provider.lookup("ZZ9 9ZZ").await.expect("no error");
        assert!(addresses.is_empty());
    }

    #[tokio::test]
    async fn nearest_failure_degrades_to_own_record() {
        let fetcher = FakeFetcher::default()
            .with("https://geo.test/postcodes/N11AA/validate", 200, json!({ "result": true }))
            .with(
                "https://geo.test/postcodes/N11AA",
                200,
                json!({ "result": record_json("N1 1AA", "St Peter's") }),
            );
        let provider = GeographyProvider::new(Arc::new(fetcher), BASE);

        let addresses = provider.lookup("N1 1AA").await.expect("lookup succeeds");
        assert_eq!(addresses.len(), 2);
    }

    #[tokio::test]
    async fn transport_errors_surface_as_lookup_failures() {
        let provider = GeographyProvider::new(Arc::new(FakeFetcher::default()), BASE);
        assert!(matches!(
            provider.lookup("N1 1AA").await,
            Err(LookupError::AddressLookupFailed { provider: "geography", .. })
        ));
    }

    #[test]
    fn synthesize_falls_back_to_unknown_names() {
        let record = PostcodeRecord {
            postcode: "AB1 2CD".to_string(),
            ..PostcodeRecord::default()
        };
        let addresses = synthesize_addresses(&record);
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].town, "Unknown");
        assert_eq!(addresses[1].address_line1, "2 Unknown, AB1 2CD");
    }
}
