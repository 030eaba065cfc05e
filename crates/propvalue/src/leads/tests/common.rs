use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::address::GeographyProvider;
use crate::http::fake::FakeFetcher;
use crate::http::HttpFetcher;
use crate::leads::domain::{
    Contact, ContactDetails, ContactId, ContactInterest, Property, PropertyId, Valuation,
    ValuationId, ValuationSubmission,
};
use crate::leads::repository::{
    ContactRepository, PropertyRepository, RepositoryError, ValuationRepository,
};
use crate::leads::{valuation_router, ValuationLeadService};
use crate::pricing::{PriceDataRetriever, PropertyType};

pub(super) type MemoryService = ValuationLeadService<MemoryContacts, MemoryProperties, MemoryValuations>;

#[derive(Default)]
pub(super) struct MemoryContacts {
    records: Mutex<HashMap<ContactId, Contact>>,
}

impl MemoryContacts {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("contact mutex poisoned").len()
    }
}

impl ContactRepository for MemoryContacts {
    fn insert(&self, contact: Contact) -> Result<Contact, RepositoryError> {
        let mut guard = self.records.lock().expect("contact mutex poisoned");
        if guard.contains_key(&contact.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(contact.id.clone(), contact.clone());
        Ok(contact)
    }

    fn fetch(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        Ok(self.records.lock().expect("contact mutex poisoned").get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryProperties {
    records: Mutex<HashMap<PropertyId, Property>>,
}

impl MemoryProperties {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("property mutex poisoned").len()
    }
}

impl PropertyRepository for MemoryProperties {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut guard = self.records.lock().expect("property mutex poisoned");
        guard.insert(property.id.clone(), property.clone());
        Ok(property)
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.records.lock().expect("property mutex poisoned").get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryValuations {
    records: Mutex<HashMap<ValuationId, Valuation>>,
}

impl ValuationRepository for MemoryValuations {
    fn insert(&self, valuation: Valuation) -> Result<Valuation, RepositoryError> {
        let mut guard = self.records.lock().expect("valuation mutex poisoned");
        if guard.contains_key(&valuation.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(valuation.id.clone(), valuation.clone());
        Ok(valuation)
    }

    fn update(&self, valuation: Valuation) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("valuation mutex poisoned");
        match guard.get_mut(&valuation.id) {
            Some(slot) => {
                *slot = valuation;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ValuationId) -> Result<Option<Valuation>, RepositoryError> {
        Ok(self.records.lock().expect("valuation mutex poisoned").get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Valuation>, RepositoryError> {
        let guard = self.records.lock().expect("valuation mutex poisoned");
        let mut records: Vec<Valuation> = guard.values().cloned().collect();
        records.sort_by(Valuation::newest_first);
        records.truncate(limit);
        Ok(records)
    }
}

pub(super) struct UnavailableValuations;

impl ValuationRepository for UnavailableValuations {
    fn insert(&self, _valuation: Valuation) -> Result<Valuation, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _valuation: Valuation) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ValuationId) -> Result<Option<Valuation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<Valuation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Retriever whose every outbound call fails, so estimates come from the baseline tier.
pub(super) fn offline_retriever() -> Arc<PriceDataRetriever> {
    let fetcher: Arc<dyn HttpFetcher> = Arc::new(FakeFetcher::default());
    let geography = Arc::new(GeographyProvider::new(fetcher.clone(), "https://geo.test"));
    Arc::new(
        PriceDataRetriever::new(fetcher, geography, "https://hpi.test")
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date")),
    )
}

pub(super) fn build_service() -> (Arc<MemoryService>, Arc<MemoryValuations>) {
    let valuations = Arc::new(MemoryValuations::default());
    let service = ValuationLeadService::new(
        Arc::new(MemoryContacts::default()),
        Arc::new(MemoryProperties::default()),
        valuations.clone(),
        offline_retriever(),
    );
    (Arc::new(service), valuations)
}

pub(super) fn contact() -> ContactDetails {
    ContactDetails {
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.co.uk".to_string(),
        phone: Some("020 7946 0000".to_string()),
        interest: ContactInterest::Selling,
    }
}

pub(super) fn submission() -> ValuationSubmission {
    ValuationSubmission {
        contact: contact(),
        postcode: "sw1a1aa".to_string(),
        address: None,
        property_type: PropertyType::Detached,
        bedrooms: 4,
    }
}

pub(super) fn router_with_service(service: Arc<MemoryService>) -> axum::Router {
    valuation_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
