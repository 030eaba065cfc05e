//! Tiered house-price lookup: regional index, national index, fixed baseline.
//!
//! [`PriceDataRetriever::price_data`] never fails. Each tier that cannot
//! produce a figure logs why and hands over to the next one, so the
//! valuation form always has a number to show.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::adjustment::{adjust, adjust_segmented, price_range, variance_from, DEFAULT_VARIANCE};
use super::regions::{area_code_for_record, NATIONAL_AREA_CODE};
use super::{PriceSource, PropertyPriceData, PropertyType, ValuationError};
use crate::address::{GeographyProvider, LookupError};
use crate::http::{FetchError, HttpFetcher};
use crate::postcode::normalize;

/// UK average used when no index data can be reached at all.
pub const NATIONAL_BASELINE_PRICE: u64 = 285_000;
const DEFAULT_RECENT_SALES: u32 = 5;
const SALES_PER_RECENT_SALE: f64 = 100.0;

#[derive(Debug, thiserror::Error)]
enum TierError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error("price index responded with HTTP {0}")]
    Status(u16),
    #[error("price index payload was malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no area code for {0}")]
    UnknownArea(String),
    #[error("price index has no usable records for {0}")]
    NoRecords(String),
}

#[derive(Debug, Clone, Deserialize)]
struct IndexRecord {
    date: String,
    #[serde(default, alias = "averagePrice")]
    average_price: Option<f64>,
    #[serde(default, alias = "salesVolume")]
    sales_volume: Option<f64>,
    #[serde(default, alias = "standardError")]
    standard_error: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndexPayload {
    Bare(Vec<IndexRecord>),
    Wrapped {
        #[serde(alias = "result")]
        items: Vec<IndexRecord>,
    },
}

impl IndexPayload {
    fn into_records(self) -> Vec<IndexRecord> {
        match self {
            Self::Bare(records) | Self::Wrapped { items: records } => records,
        }
    }
}

pub struct PriceDataRetriever {
    fetcher: Arc<dyn HttpFetcher>,
    geography: Arc<GeographyProvider>,
    index_base_url: String,
    reference_date: Option<NaiveDate>,
}

impl PriceDataRetriever {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        geography: Arc<GeographyProvider>,
        index_base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            geography,
            index_base_url: index_base_url.into(),
            reference_date: None,
        }
    }

    /// Pin "today" for the index month filter and the baseline date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub async fn price_data(
        &self,
        postcode: &str,
        property_type: PropertyType,
        bedrooms: u8,
    ) -> PropertyPriceData {
        match self.regional(postcode, property_type, bedrooms).await {
            Ok(data) => return data,
            Err(err) => warn!(postcode, error = %err, "regional price data unavailable, trying national average"),
        }

        match self
            .index_estimate(NATIONAL_AREA_CODE, property_type, bedrooms, PriceSource::National)
            .await
        {
            Ok(data) => return data,
            Err(err) => warn!(postcode, error = %err, "national price data unavailable, using baseline"),
        }

        self.baseline(property_type, bedrooms)
    }

    async fn regional(
        &self,
        postcode: &str,
        property_type: PropertyType,
        bedrooms: u8,
    ) -> Result<PropertyPriceData, TierError> {
        let postcode = normalize(postcode)?;
        let record = self
            .geography
            .postcode_record(&postcode)
            .await?
            .ok_or_else(|| TierError::UnknownArea(postcode.to_string()))?;
        let area_code = area_code_for_record(&record)
            .ok_or_else(|| TierError::UnknownArea(postcode.to_string()))?;

        self.index_estimate(area_code, property_type, bedrooms, PriceSource::Regional)
            .await
    }

    async fn index_estimate(
        &self,
        area_code: &str,
        property_type: PropertyType,
        bedrooms: u8,
        source: PriceSource,
    ) -> Result<PropertyPriceData, TierError> {
        let category = property_type.index_category();
        let url = format!(
            "{}/region/{}",
            self.index_base_url.trim_end_matches('/'),
            area_code
        );
        let mut query = vec![("month", self.today().format("%Y-%m").to_string())];
        if let Some(category) = category {
            query.push(("propertyType", category.to_string()));
        }

        let response = self.fetcher.get_json(&url, &query).await?;
        if !response.is_success() {
            return Err(TierError::Status(response.status));
        }
        let payload: IndexPayload = serde_json::from_value(response.body)?;

        let (record, base_price) = payload
            .into_records()
            .into_iter()
            .filter_map(|record| {
                let price = record.average_price.filter(|p| p.is_finite() && *p > 0.0)?;
                Some((record, price))
            })
            .max_by(|(a, _), (b, _)| a.date.cmp(&b.date))
            .ok_or_else(|| TierError::NoRecords(area_code.to_string()))?;

        // Typed index series already reflect the property type.
        let average_price = match category {
            Some(_) => adjust_segmented(base_price, bedrooms)?,
            None => adjust(base_price, property_type, bedrooms)?,
        };
        let variance = variance_from(base_price, record.standard_error);
        let (min_price, max_price) = price_range(average_price, variance);

        info!(
            area_code,
            ?source,
            base_price,
            average_price,
            "price index estimate"
        );

        Ok(PropertyPriceData {
            average_price,
            recent_sales: recent_sales_from(record.sales_volume),
            min_price,
            max_price,
            last_updated: iso_date(&record.date).unwrap_or_else(|| self.today().to_string()),
            source,
        })
    }

    fn baseline(&self, property_type: PropertyType, bedrooms: u8) -> PropertyPriceData {
        let average_price = adjust(NATIONAL_BASELINE_PRICE as f64, property_type, bedrooms)
            .unwrap_or(NATIONAL_BASELINE_PRICE);
        let (min_price, max_price) = price_range(average_price, DEFAULT_VARIANCE);

        PropertyPriceData {
            average_price,
            recent_sales: DEFAULT_RECENT_SALES,
            min_price,
            max_price,
            last_updated: self.today().to_string(),
            source: PriceSource::Baseline,
        }
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

fn recent_sales_from(sales_volume: Option<f64>) -> u32 {
    match sales_volume {
        Some(volume) if volume.is_finite() && volume >= 0.0 => {
            (volume / SALES_PER_RECENT_SALE).round().clamp(1.0, 100.0) as u32
        }
        _ => DEFAULT_RECENT_SALES,
    }
}

/// Index dates arrive as `2024-06-01`, `2024-06`, or full timestamps.
fn iso_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .ok()
        .map(|date| date.to_string())
}
