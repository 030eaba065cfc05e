use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::address::FormattedAddress;
use crate::pricing::{OfferCalculationResult, PropertyPriceData, PropertyType};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuationId(pub String);

impl ValuationId {
    /// Numeric suffix of a generated id such as `valuation-000042`.
    pub fn sequence(&self) -> Option<u64> {
        self.0.rsplit_once('-').and_then(|(_, digits)| digits.parse().ok())
    }
}

impl fmt::Display for ValuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why the contact got in touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactInterest {
    #[default]
    Selling,
    Letting,
    Buying,
}

/// Contact details captured from the valuation or lettings registration forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interest: ContactInterest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    #[serde(flatten)]
    pub details: ContactDetails,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub address: FormattedAddress,
    pub postcode: String,
    pub property_type: PropertyType,
    pub bedrooms: u8,
}

/// Lifecycle of a valuation request: estimated, then sent to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationStatus {
    Pending,
    Completed,
    Sent,
}

impl ValuationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Sent => "sent",
        }
    }

    /// Only forward, single-step transitions are allowed.
    pub fn can_transition_to(self, next: ValuationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Completed, Self::Sent)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub id: ValuationId,
    pub contact_id: ContactId,
    pub property_id: PropertyId,
    pub status: ValuationStatus,
    pub estimated_value: Option<u64>,
    pub offer_value: Option<i64>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Valuation {
    /// Ordering for recency listings: latest `created_at` first, then the
    /// higher sequence number, so `valuation-1000000` sorts above `valuation-999999`.
    pub fn newest_first(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.sequence().cmp(&self.id.sequence()))
            .then_with(|| other.id.cmp(&self.id))
    }

    pub fn apply_estimate(&mut self, price: &PropertyPriceData, offer: &OfferCalculationResult) {
        self.estimated_value = Some(price.average_price);
        self.offer_value = Some(offer.offer_price);
        self.min_price = Some(price.min_price);
        self.max_price = Some(price.max_price);
    }
}

/// Payload submitted by the "get a cash offer" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSubmission {
    pub contact: ContactDetails,
    pub postcode: String,
    /// Address picked from the lookup results, or typed in manually.
    #[serde(default)]
    pub address: Option<FormattedAddress>,
    pub property_type: PropertyType,
    pub bedrooms: u8,
}

/// Valuation with the figures the form shows back to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationOutcome {
    pub valuation: Valuation,
    pub price: PropertyPriceData,
    pub offer: OfferCalculationResult,
}
