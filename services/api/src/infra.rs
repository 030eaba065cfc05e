use metrics_exporter_prometheus::PrometheusHandle;
use propvalue::leads::{
    Contact, ContactId, ContactRepository, Property, PropertyId, PropertyRepository,
    RepositoryError, Valuation, ValuationId, ValuationRepository,
};
use propvalue::pipeline::ValuationPipeline;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) pipeline: Arc<ValuationPipeline>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryContactRepository {
    records: Arc<Mutex<HashMap<ContactId, Contact>>>,
}

impl ContactRepository for InMemoryContactRepository {
    fn insert(&self, contact: Contact) -> Result<Contact, RepositoryError> {
        let mut guard = self.records.lock().expect("contact mutex poisoned");
        if guard.contains_key(&contact.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(contact.id.clone(), contact.clone());
        Ok(contact)
    }

    fn fetch(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let guard = self.records.lock().expect("contact mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPropertyRepository {
    records: Arc<Mutex<HashMap<PropertyId, Property>>>,
}

impl PropertyRepository for InMemoryPropertyRepository {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut guard = self.records.lock().expect("property mutex poisoned");
        if guard.contains_key(&property.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(property.id.clone(), property.clone());
        Ok(property)
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let guard = self.records.lock().expect("property mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryValuationRepository {
    records: Arc<Mutex<HashMap<ValuationId, Valuation>>>,
}

impl ValuationRepository for InMemoryValuationRepository {
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
        if guard.contains_key(&valuation.id) {
            guard.insert(valuation.id.clone(), valuation);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ValuationId) -> Result<Option<Valuation>, RepositoryError> {
        let guard = self.records.lock().expect("valuation mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Valuation>, RepositoryError> {
        let guard = self.records.lock().expect("valuation mutex poisoned");
        let mut records: Vec<Valuation> = guard.values().cloned().collect();
        records.sort_by(Valuation::newest_first);
        records.truncate(limit);
        Ok(records)
    }
}
