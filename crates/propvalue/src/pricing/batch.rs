//! CSV-driven bulk estimates for lead lists exported from the CRM.

use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;

use super::offer::{calculate_offer, OfferCalculationResult};
use super::retriever::PriceDataRetriever;
use super::{PropertyPriceData, PropertyType};
use crate::postcode::normalize;

const DEFAULT_BEDROOMS: u8 = 3;
const MAX_BEDROOMS: u8 = 20;

#[derive(Debug)]
pub enum BatchImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for BatchImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchImportError::Io(err) => write!(f, "failed to read valuation batch: {}", err),
            BatchImportError::Csv(err) => write!(f, "invalid valuation batch CSV: {}", err),
        }
    }
}

impl std::error::Error for BatchImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchImportError::Io(err) => Some(err),
            BatchImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for BatchImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for BatchImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// One parsed input row; `line` is the 1-based CSV line for error reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    pub line: u64,
    pub postcode: String,
    pub property_type: PropertyType,
    pub bedrooms: u8,
    /// Set when a cell could not be read; the row is reported, never valued.
    pub rejection: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Postcode", default)]
    postcode: String,
    #[serde(rename = "Property Type", default, deserialize_with = "empty_string_as_none")]
    property_type: Option<String>,
    #[serde(rename = "Bedrooms", default, deserialize_with = "empty_string_as_none")]
    bedrooms: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// Outcome for one row: either an estimate with its offer or the reason it was skipped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEstimate {
    pub line: u64,
    pub postcode: String,
    pub property_type: PropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<PropertyPriceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<OfferCalculationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct BatchValuationImporter;

impl BatchValuationImporter {
    pub fn rows_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<BatchRow>, BatchImportError> {
        let file = std::fs::File::open(path)?;
        Self::rows_from_reader(file)
    }

    pub fn rows_from_reader<R: Read>(reader: R) -> Result<Vec<BatchRow>, BatchImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut record = csv::StringRecord::new();
        let mut rows = Vec::new();

        while csv_reader.read_record(&mut record)? {
            let row: CsvRow = record.deserialize(Some(&headers))?;
            if row.postcode.trim().is_empty() {
                continue;
            }
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let (bedrooms, rejection) = match parse_bedrooms(row.bedrooms.as_deref()) {
                Ok(bedrooms) => (bedrooms, None),
                Err(reason) => (DEFAULT_BEDROOMS, Some(reason)),
            };

            rows.push(BatchRow {
                line,
                postcode: row.postcode.trim().to_string(),
                property_type: row
                    .property_type
                    .as_deref()
                    .map(PropertyType::parse)
                    .unwrap_or(PropertyType::Other),
                bedrooms,
                rejection,
            });
        }

        Ok(rows)
    }

    /// Estimate every row; malformed postcodes are reported, not fatal.
    pub async fn estimate(retriever: &PriceDataRetriever, rows: Vec<BatchRow>) -> Vec<BatchEstimate> {
        let mut estimates = Vec::with_capacity(rows.len());

        for row in rows {
            let BatchRow {
                line,
                postcode,
                property_type,
                bedrooms,
                rejection,
            } = row;

            let mut estimate = BatchEstimate {
                line,
                postcode: postcode.clone(),
                property_type,
                bedrooms: None,
                price: None,
                offer: None,
                error: None,
            };

            if let Some(reason) = rejection {
                estimate.error = Some(reason);
                estimates.push(estimate);
                continue;
            }

            match normalize(&postcode) {
                Ok(normalized) => {
                    let price = retriever
                        .price_data(normalized.as_str(), property_type, bedrooms)
                        .await;
                    estimate.postcode = normalized.to_string();
                    estimate.bedrooms = Some(bedrooms);
                    estimate.offer = calculate_offer(price.average_price as i64).ok();
                    estimate.price = Some(price);
                }
                Err(err) => estimate.error = Some(err.to_string()),
            }

            estimates.push(estimate);
        }

        estimates
    }
}

/// Empty cells default to a typical three-bed; anything else must be a plausible count.
fn parse_bedrooms(raw: Option<&str>) -> Result<u8, String> {
    let Some(raw) = raw.map(str::trim).filter(|cell| !cell.is_empty()) else {
        return Ok(DEFAULT_BEDROOMS);
    };
    match raw.parse::<u8>() {
        Ok(count) if count <= MAX_BEDROOMS => Ok(count),
        _ => Err(format!(
            "bedrooms must be a whole number from 0 to {MAX_BEDROOMS}, got '{raw}'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::GeographyProvider;
    use crate::http::fake::FakeFetcher;
    use crate::http::HttpFetcher;
    use chrono::NaiveDate;
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn parses_rows_with_defaults_and_skips_blanks() {
        let csv = "Postcode,Property Type,Bedrooms\n\
sw1a1aa,Detached,4\n\
,,\n\
EC1A 1BB,,\n\
M1 1AE,bungalow,many\n";
        let rows = BatchValuationImporter::rows_from_reader(Cursor::new(csv)).expect("parse");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].property_type, PropertyType::Detached);
        assert_eq!(rows[0].bedrooms, 4);
        assert_eq!(rows[1].property_type, PropertyType::Other);
        assert_eq!(rows[1].bedrooms, 3);
        assert!(rows[1].rejection.is_none());
        assert!(rows[2]
            .rejection
            .as_deref()
            .expect("unreadable bedroom count rejected")
            .contains("'many'"));
        assert!(rows[0].line < rows[1].line);
    }

    #[test]
    fn out_of_range_bedrooms_are_rejected() {
        let csv = "Postcode,Property Type,Bedrooms\n\
N1 1AA,flat,300\n\
N1 1AB,flat,21\n\
N1 1AD,flat,20\n\
N1 1AE,flat,-2\n";
        let rows = BatchValuationImporter::rows_from_reader(Cursor::new(csv)).expect("parse");

        let rejected: Vec<bool> = rows.iter().map(|row| row.rejection.is_some()).collect();
        assert_eq!(rejected, vec![true, true, false, true]);
        assert_eq!(rows[2].bedrooms, 20);
    }

    fn offline_retriever() -> PriceDataRetriever {
        let fetcher: Arc<dyn HttpFetcher> = Arc::new(FakeFetcher::default());
        let geography = Arc::new(GeographyProvider::new(fetcher.clone(), "https://geo.test"));
        PriceDataRetriever::new(fetcher, geography, "https://hpi.test")
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"))
    }

    #[tokio::test]
    async fn estimate_reports_bad_rows_and_values_the_rest() {
        let csv = "Postcode,Property Type,Bedrooms\n\
sw1a1aa,Detached,4\n\
not-a-postcode,flat,2\n\
M1 1AE,terraced,lots\n\
EC1A 1BB,,\n";
        let rows = BatchValuationImporter::rows_from_reader(Cursor::new(csv)).expect("parse");

        let estimates = BatchValuationImporter::estimate(&offline_retriever(), rows).await;
        assert_eq!(estimates.len(), 4);

        for bad in [&estimates[1], &estimates[2]] {
            assert!(bad.error.is_some(), "line {} should be reported", bad.line);
            assert!(bad.price.is_none());
            assert!(bad.offer.is_none());
            assert!(bad.bedrooms.is_none());
        }
        assert!(estimates[1]
            .error
            .as_deref()
            .unwrap()
            .contains("not a valid UK postcode"));

        for good in [&estimates[0], &estimates[3]] {
            assert!(good.error.is_none());
            let price = good.price.as_ref().expect("priced");
            let offer = good.offer.as_ref().expect("offer quoted");
            assert_eq!(
                offer.offer_price + offer.discount_amount,
                price.average_price as i64
            );
        }
        assert_eq!(estimates[0].postcode, "SW1A 1AA");
        assert_eq!(estimates[0].bedrooms, Some(4));
        assert_eq!(estimates[3].bedrooms, Some(3));
    }

    #[test]
    fn rows_from_path_propagates_io_errors() {
        match BatchValuationImporter::rows_from_path("./does-not-exist.csv") {
            Err(BatchImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
