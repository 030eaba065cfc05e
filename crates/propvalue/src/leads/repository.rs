use super::domain::{Contact, ContactId, Property, PropertyId, Valuation, ValuationId};

/// Storage abstraction for contacts captured by the lead forms.
pub trait ContactRepository: Send + Sync {
    fn insert(&self, contact: Contact) -> Result<Contact, RepositoryError>;
    fn fetch(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;
}

pub trait PropertyRepository: Send + Sync {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError>;
    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
}

pub trait ValuationRepository: Send + Sync {
    fn insert(&self, valuation: Valuation) -> Result<Valuation, RepositoryError>;
    fn update(&self, valuation: Valuation) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ValuationId) -> Result<Option<Valuation>, RepositoryError>;
    /// Most recent first, at most `limit` records.
    fn recent(&self, limit: usize) -> Result<Vec<Valuation>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
