//! House-price estimation and cash-offer arithmetic.

pub mod adjustment;
pub mod batch;
pub mod offer;
pub mod regions;
pub mod retriever;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use adjustment::{adjust, adjust_segmented, bedroom_multiplier, price_range, DEFAULT_VARIANCE};
pub use batch::{BatchEstimate, BatchImportError, BatchRow, BatchValuationImporter};
pub use offer::{calculate_offer, OfferCalculationResult, DISCOUNT_PERCENTAGE};
pub use regions::{area_code_for, NATIONAL_AREA_CODE};
pub use retriever::{PriceDataRetriever, NATIONAL_BASELINE_PRICE};

/// Property categories the valuation form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terraced,
    Flat,
    Other,
}

impl PropertyType {
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "detached" | "detached-house" => Self::Detached,
            "semi-detached" | "semidetached" | "semi" => Self::SemiDetached,
            "terraced" | "terrace" | "terraced-house" | "end-terrace" | "mid-terrace" => {
                Self::Terraced
            }
            "flat" | "apartment" | "maisonette" | "flat-maisonette" => Self::Flat,
            _ => Self::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::SemiDetached => "semi-detached",
            Self::Terraced => "terraced",
            Self::Flat => "flat",
            Self::Other => "other",
        }
    }

    /// Multiplier used when the price source does not segment by type.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Detached => 1.4,
            Self::SemiDetached => 1.2,
            Self::Terraced => 1.0,
            Self::Flat => 0.9,
            Self::Other => 1.1,
        }
    }

    /// House-price-index category, `None` when the index has no matching series.
    pub fn index_category(self) -> Option<&'static str> {
        match self {
            Self::Detached => Some("detached"),
            Self::SemiDetached => Some("semi-detached"),
            Self::Terraced => Some("terraced"),
            Self::Flat => Some("flat-maisonette"),
            Self::Other => None,
        }
    }
}

impl From<String> for PropertyType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which tier of the retriever produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Regional,
    National,
    Baseline,
}

/// Point estimate with a variance band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPriceData {
    pub average_price: u64,
    pub recent_sales: u32,
    pub min_price: u64,
    pub max_price: u64,
    pub last_updated: String,
    pub source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("invalid valuation input: {reason}")]
    InvalidValuationInput { reason: String },
}

impl ValuationError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidValuationInput {
            reason: reason.into(),
        }
    }
}
