use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use super::domain::{
    Contact, ContactDetails, ContactId, Property, PropertyId, Valuation, ValuationId,
    ValuationOutcome, ValuationStatus, ValuationSubmission,
};
use super::repository::{ContactRepository, PropertyRepository, RepositoryError, ValuationRepository};
use crate::address::{FormattedAddress, LookupError, UNKNOWN_TOWN};
use crate::postcode::normalize;
use crate::pricing::{calculate_offer, PriceDataRetriever, ValuationError};

/// Service composing the price retriever, offer policy, and lead storage.
pub struct ValuationLeadService<C, P, V> {
    contacts: Arc<C>,
    properties: Arc<P>,
    valuations: Arc<V>,
    pricing: Arc<PriceDataRetriever>,
}

static CONTACT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PROPERTY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static VALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

impl<C, P, V> ValuationLeadService<C, P, V>
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    pub fn new(
        contacts: Arc<C>,
        properties: Arc<P>,
        valuations: Arc<V>,
        pricing: Arc<PriceDataRetriever>,
    ) -> Self {
        Self {
            contacts,
            properties,
            valuations,
            pricing,
        }
    }

    /// Store a contact from the lettings or general enquiry forms.
    pub fn register_contact(&self, details: ContactDetails) -> Result<Contact, LeadServiceError> {
        let contact = new_contact(details)?;
        Ok(self.contacts.insert(contact)?)
    }

    /// Record a valuation request, estimate it, and persist the completed figures.
    ///
    /// Writes are not transactional. The pending valuation is stored first, so
    /// a valuation store outage leaves no contact or property behind; a later
    /// contact or property failure leaves a pending valuation that never
    /// completes.
    pub async fn request_valuation(
        &self,
        submission: ValuationSubmission,
    ) -> Result<ValuationOutcome, LeadServiceError> {
        let ValuationSubmission {
            contact,
            postcode,
            address,
            property_type,
            bedrooms,
        } = submission;

        let postcode = normalize(&postcode)?;
        let contact = new_contact(contact)?;

        let address = address.unwrap_or_else(|| {
            let mut manual = FormattedAddress::new(postcode.to_string(), UNKNOWN_TOWN);
            manual.postcode = Some(postcode.to_string());
            manual
        });
        let property = Property {
            id: PropertyId(next_id(&PROPERTY_SEQUENCE, "property")),
            address,
            postcode: postcode.to_string(),
            property_type,
            bedrooms,
        };

        let now = Utc::now();
        let mut valuation = self.valuations.insert(Valuation {
            id: ValuationId(next_id(&VALUATION_SEQUENCE, "valuation")),
            contact_id: contact.id.clone(),
            property_id: property.id.clone(),
            status: ValuationStatus::Pending,
            estimated_value: None,
            offer_value: None,
            min_price: None,
            max_price: None,
            created_at: now,
            updated_at: now,
        })?;
        self.contacts.insert(contact)?;
        self.properties.insert(property)?;

        let price = self
            .pricing
            .price_data(postcode.as_str(), property_type, bedrooms)
            .await;
        let market_value = i64::try_from(price.average_price)
            .map_err(|_| ValuationError::invalid("estimate exceeds supported range"))?;
        let offer = calculate_offer(market_value)?;

        transition(&mut valuation, ValuationStatus::Completed)?;
        valuation.apply_estimate(&price, &offer);
        self.valuations.update(valuation.clone())?;

        info!(
            valuation_id = %valuation.id,
            postcode = %postcode,
            estimate = price.average_price,
            offer = offer.offer_price,
            source = ?price.source,
            "valuation completed"
        );

        Ok(ValuationOutcome {
            valuation,
            price,
            offer,
        })
    }

    /// Mark a completed valuation as delivered to the owner.
    pub fn mark_sent(&self, valuation_id: &ValuationId) -> Result<Valuation, LeadServiceError> {
        let mut valuation = self.get(valuation_id)?;
        transition(&mut valuation, ValuationStatus::Sent)?;
        self.valuations.update(valuation.clone())?;
        Ok(valuation)
    }

    pub fn get(&self, valuation_id: &ValuationId) -> Result<Valuation, LeadServiceError> {
        let valuation = self
            .valuations
            .fetch(valuation_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(valuation)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<Valuation>, LeadServiceError> {
        Ok(self.valuations.recent(limit)?)
    }
}

fn transition(valuation: &mut Valuation, next: ValuationStatus) -> Result<(), LeadServiceError> {
    if !valuation.status.can_transition_to(next) {
        return Err(LeadServiceError::InvalidTransition {
            id: valuation.id.clone(),
            from: valuation.status.label(),
            to: next.label(),
        });
    }
    valuation.status = next;
    valuation.updated_at = Utc::now();
    Ok(())
}

fn new_contact(details: ContactDetails) -> Result<Contact, LeadServiceError> {
    validate_contact(&details)?;
    Ok(Contact {
        id: ContactId(next_id(&CONTACT_SEQUENCE, "contact")),
        details,
        created_at: Utc::now(),
    })
}

fn validate_contact(details: &ContactDetails) -> Result<(), LeadServiceError> {
    if details.full_name.trim().is_empty() {
        return Err(LeadServiceError::InvalidContact("full name is required".to_string()));
    }
    let email = details.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(LeadServiceError::InvalidContact(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}

/// Error raised by the valuation lead service.
#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    #[error(transparent)]
    Postcode(#[from] LookupError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error("invalid contact details: {0}")]
    InvalidContact(String),
    #[error("valuation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: ValuationId,
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
